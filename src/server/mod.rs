pub mod error;
pub mod handler;
pub mod listener;
pub mod manager;

pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use handler::RequestHandler;
pub use listener::HttpListener;
pub use manager::{Gateway, Listener, ListenerInfo, RunningGateway};
