//! Sinks and the fan-out sender
//!
//! - Broker (Redis) - PUBLISH or RPUSH, failures absorbed
//! - Datagram (UDP) - one packet per event
//! - File - newline-delimited JSON, append-only

pub mod broker;
pub mod datagram;
pub mod file;

pub use broker::{BrokerConnection, BrokerConnector, BrokerTransport};
pub use datagram::DatagramTransport;
pub use file::FileTransport;

use crate::error::{EmitterError, Result};

/// The enabled sinks of one emitter
#[derive(Default)]
pub struct Transports {
    pub broker: Option<BrokerTransport>,
    pub datagram: Option<DatagramTransport>,
    pub file: Option<FileTransport>,
}

impl Transports {
    pub fn is_empty(&self) -> bool {
        self.broker.is_none() && self.datagram.is_none() && self.file.is_none()
    }

    /// Write one serialized envelope to every enabled sink
    ///
    /// Order is broker, datagram, file. The broker never fails the call; a
    /// datagram error is returned before the file is written.
    pub fn dispatch(&mut self, payload: &str) -> Result<()> {
        if let Some(broker) = self.broker.as_mut() {
            broker.send(payload);
        }

        if let Some(datagram) = self.datagram.as_ref() {
            datagram.send(payload).map_err(EmitterError::Datagram)?;
        }

        if let Some(file) = self.file.as_mut() {
            file.send(payload).map_err(|source| EmitterError::File {
                path: file.path().to_path_buf(),
                source,
            })?;
        }

        Ok(())
    }
}
