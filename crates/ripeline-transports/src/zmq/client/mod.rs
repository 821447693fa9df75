//! SUB side

pub mod sub;

pub use sub::ZmqSub;
