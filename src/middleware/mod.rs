pub mod basic_auth;
pub mod error;

pub use basic_auth::{BasicAuth, DEFAULT_REALM};
pub use error::AuthError;
