//! CLI error types with miette diagnostics.
//!
//! Maps `WatchError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use unifly_watch_config::ConfigError;
use unifly_watch_core::WatchError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const STORAGE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(unifly_watch::connection_failed),
        help(
            "Check that the controller is running and the credentials are correct.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("{source}")]
    #[diagnostic(
        code(unifly_watch::config),
        help("Run: unifly-watch config show\nConfig file: {path}")
    )]
    Config {
        #[source]
        source: ConfigError,
        path: String,
    },

    // ── Storage ──────────────────────────────────────────────────────
    #[error("Device database not found at {path}")]
    #[diagnostic(
        code(unifly_watch::no_database),
        help("The database is created by the first `unifly-watch run`.\nUse --database to point at another file.")
    )]
    NoDatabase { path: String },

    #[error("Device store error: {message}")]
    #[diagnostic(code(unifly_watch::storage))]
    Storage { message: String },

    // ── Watch loop ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(unifly_watch::watch))]
    Watch { message: String },

    #[error("{reason}")]
    #[diagnostic(
        code(unifly_watch::fatal),
        help("The watcher stops on errors because `watch.exit_on_error` is enabled.")
    )]
    Fatal { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(unifly_watch::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(unifly_watch::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(unifly_watch::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Config { .. } => exit_code::CONFIG,
            Self::NoDatabase { .. } | Self::Storage { .. } => exit_code::STORAGE,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn config(source: ConfigError, path: &std::path::Path) -> Self {
        Self::Config {
            source,
            path: path.display().to_string(),
        }
    }
}

// ── WatchError → CliError mapping ────────────────────────────────────

impl From<WatchError> for CliError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::Connection { url, reason } => Self::ConnectionFailed { url, reason },
            WatchError::Storage(e) => Self::Storage {
                message: e.to_string(),
            },
            WatchError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
            },
            WatchError::Fatal { reason } => Self::Fatal { reason },
            other @ (WatchError::Request { .. } | WatchError::Delivery { .. }) => Self::Watch {
                message: other.to_string(),
            },
        }
    }
}
