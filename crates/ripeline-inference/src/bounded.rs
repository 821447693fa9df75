//! Time-bounded calls to external collaborators
//!
//! The call runs on a short-lived worker thread and the caller waits on a
//! channel with a deadline. On timeout the worker is left to finish on its
//! own and its result is discarded; the caller carries on.
//!
//! Threads cannot be cancelled, so a collaborator that never returns keeps
//! its worker parked for the life of the process. Each such timed-out call
//! leaks one thread and nothing caps how many accumulate. Collaborators are
//! expected to carry their own I/O timeouts; `call_timeout_ms` only bounds
//! how long the batch waits for them.

use crossbeam::channel::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Why a bounded call produced no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundedCallError {
    #[error("call did not finish within {0:?}")]
    TimedOut(Duration),

    /// The worker panicked or could not be spawned
    #[error("call aborted before producing a result")]
    Aborted,
}

/// Run `f` and wait at most `timeout` for its result
pub fn bounded_call<T, F>(timeout: Duration, f: F) -> Result<T, BoundedCallError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = channel::bounded(1);

    thread::Builder::new()
        .name("ripeline-bounded-call".to_string())
        .spawn(move || {
            // Receiver may be gone after a timeout
            let _ = sender.send(f());
        })
        .map_err(|_| BoundedCallError::Aborted)?;

    receiver.recv_timeout(timeout).map_err(|e| match e {
        RecvTimeoutError::Timeout => BoundedCallError::TimedOut(timeout),
        RecvTimeoutError::Disconnected => BoundedCallError::Aborted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_call_returns_value() {
        assert_eq!(bounded_call(Duration::from_secs(1), || 42), Ok(42));
    }

    #[test]
    fn test_slow_call_times_out() {
        let result = bounded_call(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            1
        });
        assert_eq!(result, Err(BoundedCallError::TimedOut(Duration::from_millis(20))));
    }

    #[test]
    fn test_timed_out_worker_runs_to_completion() {
        let (done_tx, done_rx) = channel::bounded(1);
        let result = bounded_call(Duration::from_millis(10), move || {
            thread::sleep(Duration::from_millis(100));
            let _ = done_tx.send(());
        });
        assert_eq!(result, Err(BoundedCallError::TimedOut(Duration::from_millis(10))));

        // The detached worker is not cancelled
        assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_panicking_call_is_contained() {
        let result: Result<(), _> =
            bounded_call(Duration::from_secs(1), || panic!("collaborator crashed"));
        assert_eq!(result, Err(BoundedCallError::Aborted));
    }
}
