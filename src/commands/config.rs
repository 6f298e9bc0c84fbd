use bucker_logstash::BrokerMode;
use bucker_logstash::config::Config;
use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            let emitter = &config.emitter;
            println!("{}", "Emitter Configuration".bold());
            println!();

            println!("{}:", "identity".cyan());
            println!("  name: {}", emitter.name);
            println!("  key: {}", emitter.key);
            println!("  version: {}", emitter.version);
            println!("  source: {}", emitter.source.as_deref().unwrap_or("-"));
            println!("  source_host: {}", emitter.source_host.as_deref().unwrap_or("-"));
            if !emitter.default_packet.is_empty() {
                println!("  default_packet:");
                for (key, value) in &emitter.default_packet {
                    println!("    {}: {}", key, value);
                }
            }
            println!();

            println!("{}:", "transports".cyan());
            if let Some(ref redis) = emitter.redis {
                let mode = match redis.mode {
                    BrokerMode::Channel => "publish",
                    BrokerMode::List => "rpush",
                };
                println!("  redis: {}:{} ({} {})", emitter.host, redis.port, mode, emitter.key);
            }
            if let Some(ref udp) = emitter.udp {
                println!("  udp: {}:{}", emitter.host, udp.port);
            }
            if let Some(ref file) = emitter.file {
                println!("  file: {}", file.display());
            }
            if emitter.transport_names().is_empty() {
                println!("  {}", "none".dimmed());
            }
        }
    }

    Ok(())
}
