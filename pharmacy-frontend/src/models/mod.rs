pub mod auth;
pub mod pharmacy;
pub mod route;
pub mod session;

pub use route::Route;
pub use session::{Session, SessionEvent};
