//! Error types for emitter construction and delivery

use std::io;
use std::path::PathBuf;

/// Errors surfaced by the emitter
///
/// Broker failures never show up here once the emitter is built; they are
/// absorbed by the broker transport and handed to its reconnect policy.
#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    /// Broker transport requested but no broker capability is available
    #[error("broker transport requested but no broker client is available (build with the `redis` feature or inject a connector)")]
    BrokerUnavailable,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failed to bind or send on the datagram socket
    #[error("datagram transport error: {0}")]
    Datagram(#[source] io::Error),

    /// Failed to prepare or append to the output file
    #[error("file transport error ({}): {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Envelope could not be serialized
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EmitterError>;
