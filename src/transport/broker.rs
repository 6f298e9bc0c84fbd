//! Redis broker sink: PUBLISH or RPUSH, errors absorbed

use eyre::Result;
use std::time::Duration;

use crate::config::{BrokerConfig, BrokerMode};
use crate::retry::Reconnect;

/// An open broker session
pub trait BrokerConnection: Send {
    fn publish(&mut self, channel: &str, payload: &str) -> Result<()>;
    fn rpush(&mut self, list: &str, payload: &str) -> Result<()>;
}

/// Broker client capability, resolved when the emitter is built
pub trait BrokerConnector: Send {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn BrokerConnection>>;
}

/// Connector compiled into this build, if any
pub fn default_connector() -> Option<Box<dyn BrokerConnector>> {
    #[cfg(feature = "redis")]
    {
        Some(Box::new(redis_client::RedisConnector::default()))
    }
    #[cfg(not(feature = "redis"))]
    {
        None
    }
}

#[cfg(feature = "redis")]
pub use redis_client::RedisConnector;

#[cfg(feature = "redis")]
mod redis_client {
    use super::{BrokerConnection, BrokerConnector};
    use eyre::{Context, Result};
    use redis::Commands;
    use std::time::Duration;

    pub struct RedisConnector {
        pub connect_timeout: Duration,
    }

    impl Default for RedisConnector {
        fn default() -> Self {
            Self {
                connect_timeout: Duration::from_secs(1),
            }
        }
    }

    impl BrokerConnector for RedisConnector {
        fn connect(&self, host: &str, port: u16) -> Result<Box<dyn BrokerConnection>> {
            let info = redis::ConnectionInfo {
                addr: redis::ConnectionAddr::Tcp(host.to_string(), port),
                redis: redis::RedisConnectionInfo::default(),
            };
            let client = redis::Client::open(info).context("Failed to create Redis client")?;
            let conn = client
                .get_connection_with_timeout(self.connect_timeout)
                .with_context(|| format!("Failed to connect to Redis at {}:{}", host, port))?;
            Ok(Box::new(RedisConnection { conn }))
        }
    }

    struct RedisConnection {
        conn: redis::Connection,
    }

    impl BrokerConnection for RedisConnection {
        fn publish(&mut self, channel: &str, payload: &str) -> Result<()> {
            let _receivers: i64 = self.conn.publish(channel, payload)?;
            Ok(())
        }

        fn rpush(&mut self, list: &str, payload: &str) -> Result<()> {
            let _len: i64 = self.conn.rpush(list, payload)?;
            Ok(())
        }
    }
}

/// Broker sink with reconnect bookkeeping
///
/// While disconnected, sends are dropped until the reconnect policy allows
/// the next connect attempt.
pub struct BrokerTransport {
    host: String,
    port: u16,
    key: String,
    mode: BrokerMode,
    connector: Box<dyn BrokerConnector>,
    connection: Option<Box<dyn BrokerConnection>>,
    reconnect: Reconnect,
}

impl BrokerTransport {
    /// Attempt the first connection immediately; failure is not an error
    pub fn open(
        host: &str,
        config: &BrokerConfig,
        key: &str,
        connector: Box<dyn BrokerConnector>,
        reconnect: Reconnect,
    ) -> Self {
        let mut transport = Self {
            host: host.to_string(),
            port: config.port,
            key: key.to_string(),
            mode: config.mode,
            connector,
            connection: None,
            reconnect,
        };
        transport.connect();
        transport
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connect(&mut self) -> bool {
        match self.connector.connect(&self.host, self.port) {
            Ok(conn) => {
                log::info!("Connected to broker at {}:{} ({:?} mode)", self.host, self.port, self.mode);
                self.connection = Some(conn);
                self.reconnect.record_success();
                true
            }
            Err(e) => {
                self.note_failure("connect", &e);
                false
            }
        }
    }

    fn note_failure(&mut self, what: &str, err: &eyre::Report) {
        if self.reconnect.failures() == 0 {
            log::warn!("Broker {} failed ({}:{}): {:#}", what, self.host, self.port, err);
        } else {
            log::debug!("Broker {} failed again ({}:{}): {:#}", what, self.host, self.port, err);
        }
        let delay: Duration = self.reconnect.record_failure();
        log::debug!("Next broker connect attempt in {:?}", delay);
    }

    /// Hand one payload to the broker; failures are logged and swallowed
    pub fn send(&mut self, payload: &str) {
        if self.connection.is_none() {
            if !self.reconnect.ready() {
                log::debug!("Broker unavailable, dropping event for key {}", self.key);
                return;
            }
            if !self.connect() {
                return;
            }
        }

        let Some(conn) = self.connection.as_mut() else {
            return;
        };
        let result = match self.mode {
            BrokerMode::Channel => conn.publish(&self.key, payload),
            BrokerMode::List => conn.rpush(&self.key, payload),
        };

        if let Err(e) = result {
            self.connection = None;
            self.note_failure("send", &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{CappedBackoff, ManualClock};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Script {
        commands: Arc<Mutex<Vec<String>>>,
        connects: Arc<Mutex<u32>>,
        refuse_connect: Arc<Mutex<bool>>,
        fail_commands: Arc<Mutex<bool>>,
    }

    struct ScriptedConnector(Script);
    struct ScriptedConnection(Script);

    impl BrokerConnector for ScriptedConnector {
        fn connect(&self, _host: &str, _port: u16) -> Result<Box<dyn BrokerConnection>> {
            *self.0.connects.lock().unwrap() += 1;
            if *self.0.refuse_connect.lock().unwrap() {
                eyre::bail!("connection refused");
            }
            Ok(Box::new(ScriptedConnection(self.0.clone())))
        }
    }

    impl BrokerConnection for ScriptedConnection {
        fn publish(&mut self, channel: &str, payload: &str) -> Result<()> {
            if *self.0.fail_commands.lock().unwrap() {
                eyre::bail!("broken pipe");
            }
            self.0.commands.lock().unwrap().push(format!("PUBLISH {} {}", channel, payload));
            Ok(())
        }

        fn rpush(&mut self, list: &str, payload: &str) -> Result<()> {
            if *self.0.fail_commands.lock().unwrap() {
                eyre::bail!("broken pipe");
            }
            self.0.commands.lock().unwrap().push(format!("RPUSH {} {}", list, payload));
            Ok(())
        }
    }

    fn transport(script: &Script, mode: BrokerMode, clock: &ManualClock) -> BrokerTransport {
        let config = BrokerConfig {
            mode,
            ..BrokerConfig::default()
        };
        let reconnect = Reconnect::new(Box::new(CappedBackoff::default()), Box::new(clock.clone()));
        BrokerTransport::open("127.0.0.1", &config, "bucker", Box::new(ScriptedConnector(script.clone())), reconnect)
    }

    #[test]
    fn test_channel_mode_publishes() {
        let script = Script::default();
        let mut broker = transport(&script, BrokerMode::Channel, &ManualClock::new());
        broker.send("{}");
        assert_eq!(*script.commands.lock().unwrap(), vec!["PUBLISH bucker {}".to_string()]);
    }

    #[test]
    fn test_list_mode_pushes() {
        let script = Script::default();
        let mut broker = transport(&script, BrokerMode::List, &ManualClock::new());
        broker.send("{}");
        assert_eq!(*script.commands.lock().unwrap(), vec!["RPUSH bucker {}".to_string()]);
    }

    #[test]
    fn test_refused_connect_is_swallowed_and_backed_off() {
        let script = Script::default();
        *script.refuse_connect.lock().unwrap() = true;
        let clock = ManualClock::new();

        let mut broker = transport(&script, BrokerMode::Channel, &clock);
        assert!(!broker.is_connected());
        assert_eq!(*script.connects.lock().unwrap(), 1);

        // inside the backoff window: no new connect attempt
        broker.send("{\"n\":1}");
        assert_eq!(*script.connects.lock().unwrap(), 1);

        *script.refuse_connect.lock().unwrap() = false;
        clock.advance(Duration::from_millis(150));
        broker.send("{\"n\":2}");
        assert_eq!(*script.connects.lock().unwrap(), 2);
        assert!(broker.is_connected());
        assert_eq!(*script.commands.lock().unwrap(), vec!["PUBLISH bucker {\"n\":2}".to_string()]);
    }

    #[test]
    fn test_command_failure_drops_connection() {
        let script = Script::default();
        let clock = ManualClock::new();
        let mut broker = transport(&script, BrokerMode::List, &clock);
        assert!(broker.is_connected());

        *script.fail_commands.lock().unwrap() = true;
        broker.send("{}");
        assert!(!broker.is_connected());

        *script.fail_commands.lock().unwrap() = false;
        broker.send("{}");
        assert_eq!(*script.connects.lock().unwrap(), 1);

        clock.advance(Duration::from_secs(1));
        broker.send("{}");
        assert_eq!(*script.connects.lock().unwrap(), 2);
        assert_eq!(script.commands.lock().unwrap().len(), 1);
    }
}
