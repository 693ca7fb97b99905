//! Durable holder of the current [`Session`].
//!
//! The store is the only place session state lives. Writers replace the
//! whole session at once so readers never observe a half-updated login.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::models::Session;

pub trait CredentialStore: Send + Sync {
    /// Current snapshot. Never fails.
    fn get(&self) -> Session;

    /// Replace every field at once.
    fn set(&self, session: Session);

    fn clear(&self) {
        self.set(Session::default());
    }
}

/// Process-local store, for tests and for hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Session>,
}

impl MemoryCredentialStore {
    pub fn new(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) {
        *self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }
}

/// Store backed by a JSON key/value file that survives restarts.
///
/// The file holds `access_token`, `refresh_token`, `username` and
/// `is_admin` (`"true"`/`"false"`). It is rewritten through a temporary
/// file and a rename, so a crash leaves either the old or the new session.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    session: RwLock<Session>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any previously saved session.
    ///
    /// A missing file yields an empty session. An unreadable or corrupt file
    /// is reported and also yields an empty session; the user logs in again.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let session = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => Session::from_entries(&entries),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt session file");
                    Session::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Session::default(),
            Err(e) => return Err(e),
        };

        tracing::debug!(
            path = %path.display(),
            authenticated = session.is_authenticated(),
            "Loaded session store"
        );

        Ok(Self {
            path,
            session: RwLock::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_vec_pretty(&session.to_entries())?;
        let tmp_path = self.path.with_extension("tmp");

        let mut file = open_private(&tmp_path)?;
        file.write_all(&contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) {
        let mut current = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Persist while holding the lock so file order matches memory order.
        if let Err(e) = self.persist(&session) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist session, keeping it in memory only"
            );
        }
        *current = session;
    }
}
