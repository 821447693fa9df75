//! Transport error type

use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Could not bind {0}")]
    BindFailed(String),

    #[error("Could not connect to {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Nothing arrived (receive) or the peer queue stayed full (send) in time
    #[error("Operation timed out")]
    Timeout,

    /// In-process bus dropped
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport is not running")]
    NotRunning,

    #[error("Transport is already running")]
    AlreadyRunning,

    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error("Message of {size} bytes exceeds the {max_size} byte limit")]
    MessageTooLarge { size: usize, max_size: usize },

    #[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
    #[error("ZMQ error: {0}")]
    Zmq(#[source] zmq::Error),
}

impl TransportError {
    /// Errors after which a receive loop cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::NotRunning)
    }
}

#[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        if err == zmq::Error::EAGAIN {
            Self::Timeout
        } else {
            Self::Zmq(err)
        }
    }
}

impl From<String> for TransportError {
    fn from(reason: String) -> Self {
        Self::InvalidConfig(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TransportError::MessageTooLarge {
            size: 20,
            max_size: 10,
        };
        assert_eq!(err.to_string(), "Message of 20 bytes exceeds the 10 byte limit");
        assert_eq!(TransportError::Timeout.to_string(), "Operation timed out");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(TransportError::ConnectionClosed.is_fatal());
        assert!(TransportError::NotRunning.is_fatal());
        assert!(!TransportError::Timeout.is_fatal());
        assert!(!TransportError::ReceiveFailed("x".to_string()).is_fatal());
    }

    #[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
    #[test]
    fn test_eagain_maps_to_timeout() {
        let err: TransportError = zmq::Error::EAGAIN.into();
        assert!(matches!(err, TransportError::Timeout));
    }
}
