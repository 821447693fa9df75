pub mod config;
pub mod error;

pub use config::{ClientConfig, ServerConfig, SocketConfig};
pub use error::{TransportError, TransportResult};
