//! Clap derive structures for the `unifly-watch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// unifly-watch -- new-device notifications for UniFi networks
#[derive(Debug, Parser)]
#[command(
    name = "unifly-watch",
    version,
    about = "Watch a UniFi network and get notified when new devices connect",
    long_about = "Polls a UniFi controller for connected clients, remembers every device\n\
        it has seen and sends a Telegram or ntfy notification when an unknown\n\
        device joins the network.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "UNIFLY_WATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Device database (overrides `watch.database`)
    #[arg(long, short = 'd', env = "UNIFLY_WATCH_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Log format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the network (runs until interrupted)
    Run(RunArgs),

    /// List remembered devices
    #[command(alias = "dev")]
    Devices,

    /// Show the device event log, newest first
    Events(EventsArgs),

    /// Inspect configuration and store credentials
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run a single cycle and exit (for cron or systemd timers)
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Maximum number of events to show (0 = all)
    #[arg(long, short = 'l', default_value = "50")]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display the resolved configuration (secrets redacted)
    Show,

    /// Store the controller password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
