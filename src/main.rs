use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;

use bucker_logstash::config::{Config, LogLevel};
use cli::{Cli, Commands};
use commands::emit::AccessArgs;

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bucker-logstash")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("bucker-logstash.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.to_level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let dry_run = cli.dry_run;
    match cli.command {
        Commands::Log {
            message,
            level,
            module,
            tags,
        } => commands::emit::log(&message, &level, module.as_deref(), &tags, &config, dry_run),
        Commands::Access {
            method,
            url,
            status,
            remote_ip,
            length,
            response_time,
            referer,
            agent,
            http_version,
            module,
            tags,
        } => {
            let args = AccessArgs {
                method,
                url,
                status,
                remote_ip,
                length,
                response_time,
                referer,
                agent,
                http_version,
            };
            commands::emit::access(args, module.as_deref(), &tags, &config, dry_run)
        }
        Commands::Exception {
            stack_file,
            module,
            tags,
        } => commands::emit::exception(stack_file.as_ref(), module.as_deref(), &tags, &config, dry_run),
        Commands::Stat {
            name,
            stat_type,
            value,
            module,
            tags,
        } => commands::emit::stat(&name, &stat_type, &value, module.as_deref(), &tags, &config, dry_run),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level).context("Failed to setup logging")?;

    info!("Starting bucker-logstash with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
