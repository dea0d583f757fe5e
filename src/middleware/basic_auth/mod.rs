mod auth;
mod middleware;

pub use auth::{verify_password, Authenticator, SingleUserAuthenticator};
pub use middleware::{BasicAuth, DEFAULT_REALM};
