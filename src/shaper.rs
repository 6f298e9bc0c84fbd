//! Record shapers: map each record kind onto envelope fields
//!
//! These are pure functions of the emitter identity and the record, so the
//! field mapping can be checked without any transport.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::config::{DEFAULT_VERSION, EmitterConfig};
use crate::envelope::Envelope;
use crate::record::{AccessRecord, StackTrace, render_value, tags_value};

/// The parts of the configuration that end up inside envelopes
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub source: Option<String>,
    pub source_host: Option<String>,
    pub version: u32,
    pub default_packet: IndexMap<String, Value>,
    pub key: String,
}

impl From<&EmitterConfig> for Identity {
    fn from(config: &EmitterConfig) -> Self {
        Self {
            name: config.name.clone(),
            source: config.source.clone(),
            source_host: config.source_host.clone(),
            version: if config.version == 0 { DEFAULT_VERSION } else { config.version },
            default_packet: config.default_packet.clone(),
            key: config.key.clone(),
        }
    }
}

impl Identity {
    /// Module argument, else the endpoint name
    pub fn module_name<'a>(&'a self, module: Option<&'a str>) -> &'a str {
        module.unwrap_or(&self.name)
    }

    /// Configured source, else the resolved module name
    pub fn source_for<'a>(&'a self, module: Option<&'a str>) -> &'a str {
        self.source.as_deref().unwrap_or_else(|| self.module_name(module))
    }

    fn base(&self, time: DateTime<Utc>) -> Envelope {
        Envelope::base(time, self.version, &self.default_packet)
    }

    /// `tags`, `type`, `source` and optional `source_host`
    fn stamp(&self, envelope: &mut Envelope, module: Option<&str>, kind: String, tags: &[&str]) {
        envelope.insert("tags", tags_value(tags));
        envelope.insert("type", kind);
        envelope.insert("source", self.source_for(module));
        if let Some(ref host) = self.source_host {
            envelope.insert("source_host", host.as_str());
        }
    }
}

pub fn log(
    identity: &Identity,
    time: DateTime<Utc>,
    level: &str,
    module: Option<&str>,
    data: Value,
    tags: &[&str],
) -> Envelope {
    let mut envelope = identity.base(time);
    identity.stamp(&mut envelope, module, identity.key.clone(), tags);
    envelope.insert("module", identity.module_name(module));
    envelope.insert("level", level.to_uppercase());
    envelope.insert("message", data);
    envelope
}

pub fn access(identity: &Identity, module: Option<&str>, record: &AccessRecord, tags: &[&str]) -> Envelope {
    let mut envelope = identity.base(record.time);
    identity.stamp(&mut envelope, module, format!("{}_access", identity.key), tags);
    envelope.insert("url", record.url.as_str());
    if let Some(ref ip) = record.remote_ip {
        envelope.insert("client", ip.as_str());
    }
    if let Some(length) = record.length {
        envelope.insert("size", length);
    }
    if let Some(response_time) = record.response_time {
        envelope.insert("responsetime", response_time);
    }
    envelope.insert("status", record.status);
    envelope.insert("method", record.method.as_str());
    if let Some(ref referer) = record.referer {
        envelope.insert("http_referrer", referer.as_str());
    }
    if let Some(ref agent) = record.agent {
        envelope.insert("http_user_agent", agent.as_str());
    }
    if let Some(ref version) = record.http_ver {
        envelope.insert("http_version", version.as_str());
    }
    envelope.insert("message", record.summary());
    envelope
}

pub fn exception<E: StackTrace + ?Sized>(
    identity: &Identity,
    time: DateTime<Utc>,
    module: Option<&str>,
    err: &E,
    tags: &[&str],
) -> Envelope {
    let stack = err.stack_trace();
    let lines: Vec<Value> = stack.split('\n').map(|line| Value::String(line.to_string())).collect();

    let mut envelope = identity.base(time);
    identity.stamp(&mut envelope, module, identity.key.clone(), tags);
    envelope.insert("module", identity.module_name(module));
    envelope.insert("level", "EXCEPTION");
    envelope.insert("stack", lines);
    envelope.insert("message", stack);
    envelope
}

/// The metric type overwrites the routing key in `type`; consumers rely on
/// `type` naming the metric kind for stat events.
///
/// `stat_type` is written as given, so an empty label yields an empty
/// `type`. Callers that need a routable `type` must pass a non-empty label.
pub fn stat(
    identity: &Identity,
    time: DateTime<Utc>,
    module: Option<&str>,
    stat_name: &str,
    stat_type: &str,
    value: Value,
    tags: &[&str],
) -> Envelope {
    let message = format!("{}({}): {}", stat_name, stat_type, render_value(&value));

    let mut envelope = identity.base(time);
    identity.stamp(&mut envelope, module, identity.key.clone(), tags);
    envelope.insert("module", identity.module_name(module));
    envelope.insert("level", "STAT");
    envelope.insert("name", stat_name);
    envelope.insert("type", stat_type);
    envelope.insert("value", value);
    envelope.insert("message", message);
    envelope
}
