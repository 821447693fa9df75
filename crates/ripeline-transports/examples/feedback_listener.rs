//! Example: feedback listener (SUB)
//!
//! Prints every feedback message `ripeline-ingest` publishes. Pass a topic
//! prefix such as `/W1/D1` to follow one device.
//!
//! ```text
//! cargo run -p ripeline-transports --example feedback_listener --features=zmq -- /W1/
//! ```

use ripeline_transports::prelude::*;
use std::env;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let prefix = args.get(1).cloned().unwrap_or_else(|| "/".to_string());

    let context = Arc::new(zmq::Context::new());
    let config = ClientConfig::new("tcp://localhost:1884").with_subscription(prefix.clone());
    let mut subscriber = ZmqSub::new(context, config)?;
    subscriber.start()?;
    println!("Listening for feedback under '{}'", prefix);

    loop {
        match subscriber.receive_timeout(1000) {
            Ok((topic, data)) => println!(
                "{} <- {}",
                String::from_utf8_lossy(&topic),
                String::from_utf8_lossy(&data)
            ),
            Err(TransportError::Timeout) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
