//! Event emitter with multiple sink support

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

use crate::config::EmitterConfig;
use crate::envelope::Envelope;
use crate::error::{EmitterError, Result};
use crate::record::{AccessRecord, StackTrace};
use crate::retry::{CappedBackoff, Clock, Reconnect, ReconnectPolicy, SystemClock};
use crate::shaper::{self, Identity};
use crate::transport::broker::{self, BrokerConnector, BrokerTransport};
use crate::transport::{DatagramTransport, FileTransport, Transports};

/// Shapes records into envelopes and fans them out to the configured sinks
pub struct Emitter {
    identity: Identity,
    transports: Transports,
}

impl Emitter {
    /// Build with the broker client compiled into this crate
    pub fn new(config: EmitterConfig) -> Result<Self> {
        EmitterBuilder::new(config).build()
    }

    pub fn builder(config: EmitterConfig) -> EmitterBuilder {
        EmitterBuilder::new(config)
    }

    pub fn transports(&self) -> &Transports {
        &self.transports
    }

    pub fn log(
        &mut self,
        time: DateTime<Utc>,
        level: &str,
        module: Option<&str>,
        data: impl Into<Value>,
        tags: &[&str],
    ) -> Result<()> {
        let envelope = shaper::log(&self.identity, time, level, module, data.into(), tags);
        self.send(&envelope)
    }

    pub fn access(&mut self, module: Option<&str>, record: &AccessRecord, tags: &[&str]) -> Result<()> {
        let envelope = shaper::access(&self.identity, module, record, tags);
        self.send(&envelope)
    }

    pub fn exception<E: StackTrace + ?Sized>(
        &mut self,
        time: DateTime<Utc>,
        module: Option<&str>,
        err: &E,
        tags: &[&str],
    ) -> Result<()> {
        let envelope = shaper::exception(&self.identity, time, module, err, tags);
        self.send(&envelope)
    }

    /// `type` ends up as `stat_type`, not the routing key; an empty
    /// `stat_type` is sent as an empty `type`
    pub fn stat(
        &mut self,
        time: DateTime<Utc>,
        module: Option<&str>,
        stat_name: &str,
        stat_type: &str,
        value: impl Into<Value>,
        tags: &[&str],
    ) -> Result<()> {
        let envelope = shaper::stat(&self.identity, time, module, stat_name, stat_type, value.into(), tags);
        self.send(&envelope)
    }

    /// Serialize once and write to every enabled sink
    pub fn send(&mut self, envelope: &Envelope) -> Result<()> {
        let payload = envelope.to_json()?;
        log::trace!("Emitting {} bytes", payload.len());
        self.transports.dispatch(&payload)
    }
}

/// Construction with injectable broker capability, reconnect policy and clock
pub struct EmitterBuilder {
    config: EmitterConfig,
    connector: Option<Box<dyn BrokerConnector>>,
    policy: Option<Box<dyn ReconnectPolicy>>,
    clock: Option<Box<dyn Clock>>,
    fallback: fn() -> Option<Box<dyn BrokerConnector>>,
}

impl EmitterBuilder {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            config,
            connector: None,
            policy: None,
            clock: None,
            fallback: broker::default_connector,
        }
    }

    pub fn connector(mut self, connector: Box<dyn BrokerConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Where the connector comes from when none was injected
    pub fn fallback_connector(mut self, fallback: fn() -> Option<Box<dyn BrokerConnector>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn reconnect_policy(mut self, policy: Box<dyn ReconnectPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Emitter> {
        let config = self.config;
        config.validate()?;

        let broker = match config.redis {
            Some(ref redis) => {
                let connector = self
                    .connector
                    .or_else(self.fallback)
                    .ok_or(EmitterError::BrokerUnavailable)?;
                let policy = self.policy.unwrap_or_else(|| {
                    Box::new(CappedBackoff::new(Duration::from_millis(redis.retry_max_delay_ms)))
                });
                let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
                Some(BrokerTransport::open(
                    &config.host,
                    redis,
                    &config.key,
                    connector,
                    Reconnect::new(policy, clock),
                ))
            }
            None => None,
        };

        let datagram = match config.udp {
            Some(ref udp) => Some(DatagramTransport::open(&config.host, udp.port).map_err(EmitterError::Datagram)?),
            None => None,
        };

        let file = match config.file {
            Some(ref path) => Some(FileTransport::open(path)?),
            None => None,
        };

        let transports = Transports { broker, datagram, file };
        if transports.is_empty() {
            log::debug!("Emitter '{}' built without transports", config.name);
        }

        Ok(Emitter {
            identity: Identity::from(&config),
            transports,
        })
    }
}
