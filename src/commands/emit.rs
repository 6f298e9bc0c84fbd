//! Record commands: shape one event and send it (or print it)

use bucker_logstash::config::Config;
use bucker_logstash::shaper::{self, Identity};
use bucker_logstash::{AccessRecord, Emitter, Envelope};
use chrono::Utc;
use eyre::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Access-log fields as given on the command line
pub struct AccessArgs {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub remote_ip: Option<String>,
    pub length: Option<u64>,
    pub response_time: Option<u64>,
    pub referer: Option<String>,
    pub agent: Option<String>,
    pub http_version: Option<String>,
}

impl AccessArgs {
    fn into_record(self) -> AccessRecord {
        let mut record = AccessRecord::new(Utc::now(), self.method, self.url, self.status);
        record.remote_ip = self.remote_ip;
        record.length = self.length;
        record.response_time = self.response_time;
        record.referer = self.referer;
        record.agent = self.agent;
        record.http_ver = self.http_version;
        record
    }
}

pub fn log(message: &str, level: &str, module: Option<&str>, tags: &[String], config: &Config, dry_run: bool) -> Result<()> {
    let identity = Identity::from(&config.emitter);
    let envelope = shaper::log(&identity, Utc::now(), level, module, Value::String(message.to_string()), &tag_refs(tags));
    dispatch(&envelope, config, dry_run)
}

pub fn access(args: AccessArgs, module: Option<&str>, tags: &[String], config: &Config, dry_run: bool) -> Result<()> {
    let identity = Identity::from(&config.emitter);
    let record = args.into_record();
    let envelope = shaper::access(&identity, module, &record, &tag_refs(tags));
    dispatch(&envelope, config, dry_run)
}

pub fn exception(
    stack_file: Option<&PathBuf>,
    module: Option<&str>,
    tags: &[String],
    config: &Config,
    dry_run: bool,
) -> Result<()> {
    let stack = read_stack(stack_file)?;
    let identity = Identity::from(&config.emitter);
    let envelope = shaper::exception(&identity, Utc::now(), module, stack.as_str(), &tag_refs(tags));
    dispatch(&envelope, config, dry_run)
}

pub fn stat(
    name: &str,
    stat_type: &str,
    value: &str,
    module: Option<&str>,
    tags: &[String],
    config: &Config,
    dry_run: bool,
) -> Result<()> {
    let identity = Identity::from(&config.emitter);
    let envelope = shaper::stat(&identity, Utc::now(), module, name, stat_type, parse_value(value), &tag_refs(tags));
    dispatch(&envelope, config, dry_run)
}

fn dispatch(envelope: &Envelope, config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("{}", envelope.to_json().context("Failed to serialize envelope")?);
        return Ok(());
    }

    let transports = config.emitter.transport_names();
    if transports.is_empty() {
        log::warn!("No transports configured; event not sent");
    }

    let mut emitter = Emitter::new(config.emitter.clone()).context("Failed to build emitter")?;
    emitter.send(envelope).context("Failed to send event")?;
    log::info!("Sent event to: {}", transports.join(", "));
    Ok(())
}

fn read_stack(stack_file: Option<&PathBuf>) -> Result<String> {
    let text = match stack_file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stack trace from stdin")?;
            buf
        }
    };
    Ok(text.trim_end_matches('\n').to_string())
}

/// JSON when it parses, otherwise the raw text
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn tag_refs(tags: &[String]) -> Vec<&str> {
    tags.iter().map(String::as_str).collect()
}
