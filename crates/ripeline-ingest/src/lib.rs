//! Ripeline ingestion service
//!
//! Library half of the `ripeline-ingest` binary: configuration wiring, the
//! assembled [`Pipeline`] and the topic router. Kept separate from `main.rs`
//! so the whole service can be driven over an in-process bus in tests.

pub mod pipeline;
pub mod router;
pub mod wiring;

pub use pipeline::Pipeline;
pub use router::{run_receive_loop, IngestRouter, Route};
pub use wiring::WiringError;
