#![warn(rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod shutdown;
pub mod sink;
pub mod telemetry;

// Re-export main types for easy access
pub use config::{ConfigError, SinkConfig};
pub use sink::coordinator::{InitError, KinesisSink};
pub use sink::{Event, Sink};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
