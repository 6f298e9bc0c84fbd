//! Event envelope and base-envelope construction

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

pub const VERSION_FIELD: &str = "@version";
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// An ordered JSON object sent to every sink
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Fresh envelope with `@version`, `@timestamp` and the default fields
    pub fn base(time: DateTime<Utc>, version: u32, defaults: &IndexMap<String, Value>) -> Self {
        let mut envelope = Self::default();
        envelope.insert(VERSION_FIELD, version);
        envelope.insert(TIMESTAMP_FIELD, format_timestamp(time));
        for (key, value) in defaults {
            envelope.insert(key.as_str(), value.clone());
        }
        envelope
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a field, if it holds one
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Compact JSON text, serialized once per send
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

/// ISO-8601, millisecond precision, `Z` designator
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn test_base_has_version_and_timestamp() {
        let envelope = Envelope::base(sample_time(), 3, &IndexMap::new());
        assert_eq!(envelope.get(VERSION_FIELD), Some(&json!(3)));
        assert_eq!(envelope.get_str(TIMESTAMP_FIELD), Some("2026-01-03T12:00:00.042Z"));
        assert_eq!(envelope.len(), 2);
    }

    #[test]
    fn test_timestamp_parses_back() {
        let time = sample_time();
        let text = format_timestamp(time);
        let parsed = DateTime::parse_from_rfc3339(&text).expect("valid rfc3339");
        assert_eq!(parsed.with_timezone(&Utc), time);
    }

    #[test]
    fn test_defaults_are_merged() {
        let mut defaults = IndexMap::new();
        defaults.insert("env".to_string(), json!("prod"));
        defaults.insert("shard".to_string(), json!(7));

        let envelope = Envelope::base(sample_time(), 1, &defaults);
        assert_eq!(envelope.get_str("env"), Some("prod"));
        assert_eq!(envelope.get("shard"), Some(&json!(7)));
    }

    #[test]
    fn test_later_insert_overwrites() {
        let mut defaults = IndexMap::new();
        defaults.insert("type".to_string(), json!("default"));

        let mut envelope = Envelope::base(sample_time(), 1, &defaults);
        envelope.insert("type", "specific");
        assert_eq!(envelope.get_str("type"), Some("specific"));
        assert_eq!(envelope.keys().filter(|k| *k == "type").count(), 1);
    }

    #[test]
    fn test_to_json_is_single_line_object() {
        let envelope = Envelope::base(sample_time(), 1, &IndexMap::new());
        let text = envelope.to_json().expect("serialize");
        assert!(!text.contains('\n'));
        assert_eq!(
            text,
            r#"{"@version":1,"@timestamp":"2026-01-03T12:00:00.042Z"}"#
        );
    }
}
