//! Socket settings shared by every transport

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings common to bound and connected sockets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Endpoint to bind or connect, e.g. `tcp://*:1884`
    pub address: String,

    /// `None` blocks until the peer queue has room
    pub send_timeout: Option<Duration>,

    pub send_hwm: usize,
    pub recv_hwm: usize,

    /// Larger frames are rejected on send and dropped on receive
    pub max_message_size: Option<usize>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            address: "tcp://127.0.0.1:1883".to_string(),
            send_timeout: Some(Duration::from_secs(1)),
            send_hwm: 1000,
            recv_hwm: 1000,
            max_message_size: Some(64 * 1024),
        }
    }
}

impl SocketConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.address.trim().is_empty() {
            return Err("socket address is empty".to_string());
        }
        if self.max_message_size == Some(0) {
            return Err("max_message_size must be positive".to_string());
        }
        if self.send_timeout.is_some_and(|t| t.is_zero()) {
            return Err("send_timeout must be positive (use None to block)".to_string());
        }
        Ok(())
    }
}

/// Bound socket (the feedback PUB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub base: SocketConfig,

    /// Time queued feedback may still drain after stop
    pub linger: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("tcp://*:1884")
    }
}

impl ServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            base: SocketConfig::new(address),
            linger: Duration::from_millis(500),
        }
    }
}

/// Connected socket (the readings SUB)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub base: SocketConfig,

    /// Prefix filters installed when the socket starts
    pub subscriptions: Vec<String>,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            base: SocketConfig::new(address),
            subscriptions: Vec::new(),
        }
    }

    pub fn with_subscription(mut self, topic: impl Into<String>) -> Self {
        self.subscriptions.push(topic.into());
        self
    }
}
