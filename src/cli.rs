use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "bucker-logstash",
    about = "Send log, access, exception and stat events to Redis, UDP and file sinks",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/bucker-logstash/logs/bucker-logstash.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to logstash.yaml config file")]
    pub config: Option<PathBuf>,

    /// Print the envelope instead of sending it
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit a log line
    Log {
        /// Message text
        message: String,

        /// Severity (uppercased in the event)
        #[arg(long, short, default_value = "info")]
        level: String,

        /// Module name (defaults to the configured endpoint name)
        #[arg(long, short)]
        module: Option<String>,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },

    /// Emit an HTTP access record
    Access {
        #[arg(long)]
        method: String,

        #[arg(long)]
        url: String,

        #[arg(long)]
        status: u16,

        #[arg(long)]
        remote_ip: Option<String>,

        /// Response size in bytes
        #[arg(long)]
        length: Option<u64>,

        /// Response time in milliseconds
        #[arg(long)]
        response_time: Option<u64>,

        #[arg(long)]
        referer: Option<String>,

        #[arg(long)]
        agent: Option<String>,

        #[arg(long)]
        http_version: Option<String>,

        #[arg(long, short)]
        module: Option<String>,

        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },

    /// Emit an exception; the stack trace is read from a file or stdin
    Exception {
        #[arg(long)]
        stack_file: Option<PathBuf>,

        #[arg(long, short)]
        module: Option<String>,

        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },

    /// Emit a stat
    Stat {
        /// Metric name
        name: String,

        /// Metric type label (counter, gauge, ms, ...)
        stat_type: String,

        /// Value, parsed as JSON when possible
        value: String,

        #[arg(long, short)]
        module: Option<String>,

        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}
