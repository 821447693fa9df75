//! Example: simulated ripeness sensor (PUB)
//!
//! Binds where `ripeline-ingest` subscribes by default and publishes one
//! reading per second for a single device.
//!
//! ```text
//! cargo run -p ripeline-transports --example sensor_simulator --features=zmq -- W1 D1
//! ```

use ripeline_transports::prelude::*;
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let warehouse = args.get(1).map(|s| s.as_str()).unwrap_or("W1");
    let device = args.get(2).map(|s| s.as_str()).unwrap_or("D1");

    let context = Arc::new(zmq::Context::new());
    let mut publisher = ZmqPub::new(context, ServerConfig::new("tcp://*:1883"))?;
    publisher.start()?;
    println!("Sensor {}/{} publishing on tcp://*:1883 topic /proto/out", warehouse, device);

    let mut tick: u64 = 0;
    loop {
        // four gas channels, then temperature and humidity
        let drift = (tick % 10) as f64 * 0.01;
        let reading = format!(
            "{:.3},{:.3},{:.3},{:.3},{:.2},{:.2},{},{}",
            0.41 + drift,
            0.38 + drift,
            0.52 - drift,
            0.47,
            24.0 + drift,
            61.0 - drift,
            warehouse,
            device
        );
        publisher.publish(b"/proto/out", reading.as_bytes())?;
        println!("-> {}", reading);

        tick += 1;
        thread::sleep(Duration::from_secs(1));
    }
}
