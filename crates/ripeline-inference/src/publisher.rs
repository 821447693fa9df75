//! Feedback publishing seam
//!
//! The gateway only needs fire-and-forget `publish(topic, message)`. Any
//! [`ripeline_transports::Publisher`] can serve through
//! [`TransportFeedbackPublisher`].

use crate::error::PublishError;
use parking_lot::Mutex;
use ripeline_transports::{Publisher, TransportResult};
use tracing::debug;

/// Sends feedback text to a device topic
pub trait FeedbackPublisher: Send + Sync {
    fn publish(&self, topic: &str, message: &str) -> Result<(), PublishError>;
}

/// Adapts a transport-level publisher
pub struct TransportFeedbackPublisher<P: Publisher> {
    inner: Mutex<P>,
}

impl<P: Publisher> TransportFeedbackPublisher<P> {
    /// Wrap a publisher; it is started if it is not running yet
    pub fn new(mut publisher: P) -> TransportResult<Self> {
        if !publisher.is_running() {
            publisher.start()?;
        }
        Ok(Self {
            inner: Mutex::new(publisher),
        })
    }

    /// Stop the underlying transport
    pub fn shutdown(&self) -> TransportResult<()> {
        self.inner.lock().stop()
    }
}

impl<P: Publisher> FeedbackPublisher for TransportFeedbackPublisher<P> {
    fn publish(&self, topic: &str, message: &str) -> Result<(), PublishError> {
        let publisher = self.inner.lock();
        publisher
            .publish(topic.as_bytes(), message.as_bytes())
            .map_err(|e| PublishError::Failed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Published {:?} to {} via {}", message, topic, publisher.transport_type());
        Ok(())
    }
}
