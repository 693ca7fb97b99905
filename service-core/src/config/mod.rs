use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the layered base file inside a crate's `config/` directory.
pub const BASE_FILE: &str = "base.yaml";

/// Resolve the `config/` directory of a workspace member.
///
/// Works both when the process runs from the workspace root and when it runs
/// from inside the member's own directory.
pub fn configuration_directory(base_path: &Path, crate_dir: &str) -> PathBuf {
    if base_path.ends_with(crate_dir) {
        base_path.join("config")
    } else {
        base_path.join(crate_dir).join("config")
    }
}

/// Load layered settings: optional `config/base.yaml`, then environment
/// variables with `{prefix}_` and `__` as the nesting separator
/// (`APP_API__BASE_URL` sets `api.base_url`). A `.env` file is not read
/// here; binaries load it once at startup.
pub fn load<T: DeserializeOwned>(crate_dir: &str, env_prefix: &str) -> Result<T, ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| ConfigError::Foreign(Box::new(e)))?;
    let directory = configuration_directory(&base_path, crate_dir);

    Config::builder()
        .add_source(File::from(directory.join(BASE_FILE)).required(false))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<T>()
}
