//! service-core: Shared infrastructure for the pharmacy front-end crates.
pub mod config;
pub mod observability;

pub use reqwest;
pub use tracing;
