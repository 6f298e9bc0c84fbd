//! Logstash-style event emitter
//!
//! Formats log lines, HTTP access records, exceptions and stats into one
//! JSON envelope shape and fans each envelope out to the configured sinks:
//! - Redis - PUBLISH to a channel or RPUSH onto a list
//! - UDP - one datagram per event
//! - File - newline-delimited JSON, append-only

pub mod config;
pub mod emitter;
pub mod envelope;
pub mod error;
pub mod record;
pub mod retry;
pub mod shaper;
pub mod transport;

pub use config::{BrokerConfig, BrokerMode, DatagramConfig, EmitterConfig};
pub use emitter::{Emitter, EmitterBuilder};
pub use envelope::Envelope;
pub use error::{EmitterError, Result};
pub use record::{AccessRecord, StackTrace};
