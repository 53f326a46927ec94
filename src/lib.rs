pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod session;
pub mod vault;

pub use errors::{KeystashError, Result};
pub use session::SessionManager;
