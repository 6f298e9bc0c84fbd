//! Inputs for the record shapers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One served HTTP request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessRecord {
    pub time: DateTime<Utc>,
    pub url: String,
    pub method: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    /// Response size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// Response time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_ver: Option<String>,
}

impl AccessRecord {
    pub fn new(time: DateTime<Utc>, method: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self {
            time,
            url: url.into(),
            method: method.into(),
            status,
            remote_ip: None,
            length: None,
            response_time: None,
            referer: None,
            agent: None,
            http_ver: None,
        }
    }

    /// `"<method> <url> <status>"`
    pub fn summary(&self) -> String {
        format!("{} {} {}", self.method, self.url, self.status)
    }
}

/// Anything that can be rendered as a multi-line stack trace
pub trait StackTrace {
    fn stack_trace(&self) -> String;
}

impl StackTrace for str {
    fn stack_trace(&self) -> String {
        self.to_string()
    }
}

impl StackTrace for String {
    fn stack_trace(&self) -> String {
        self.clone()
    }
}

/// Debug rendering: message, cause chain and location/backtrace when captured
impl StackTrace for eyre::Report {
    fn stack_trace(&self) -> String {
        format!("{:?}", self)
    }
}

/// The error message followed by one `Caused by:` line per source
impl StackTrace for dyn std::error::Error + '_ {
    fn stack_trace(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = self.source();
        while let Some(err) = source {
            lines.push(format!("Caused by: {}", err));
            source = err.source();
        }
        lines.join("\n")
    }
}

impl StackTrace for std::backtrace::Backtrace {
    fn stack_trace(&self) -> String {
        self.to_string()
    }
}

/// Text form of an atomic value as it appears inside a message
///
/// Strings are written without quotes and integral floats without a
/// fractional part.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Owned tag list from borrowed tags
pub fn tags_value(tags: &[&str]) -> Value {
    Value::Array(tags.iter().map(|t| Value::String((*t).to_string())).collect())
}
