// ── Watcher error types ──
//
// One error enum for the whole core. The `From<unifly_api::Error>` impl
// translates controller transport failures into these kinds so the loop
// can route them without looking at HTTP details.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// Session establishment with the controller failed.
    #[error("Cannot connect to controller at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// Client listing failed or returned unusable data.
    #[error("Client listing failed: {message}")]
    Request { message: String },

    /// A device store operation failed.
    #[error("Device store error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A notification could not be delivered.
    #[error("Notification via {channel} failed: {reason}")]
    Delivery { channel: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The loop stopped because `exit_on_error` is set.
    #[error("Watcher stopped: {reason}")]
    Fatal { reason: String },
}

impl WatchError {
    pub fn not_connected() -> Self {
        Self::Connection {
            url: "<controller>".into(),
            reason: "no active session".into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

impl From<unifly_api::Error> for WatchError {
    fn from(err: unifly_api::Error) -> Self {
        match err {
            unifly_api::Error::Authentication { message } => WatchError::Connection {
                url: "<controller>".into(),
                reason: format!("authentication failed: {message}"),
            },
            unifly_api::Error::Transport(e) => WatchError::Connection {
                url: e
                    .url()
                    .map_or_else(|| "<controller>".into(), |u| u.origin().ascii_serialization()),
                reason: e.to_string(),
            },
            unifly_api::Error::Tls(reason) => WatchError::Connection {
                url: "<controller>".into(),
                reason: format!("TLS error: {reason}"),
            },
            unifly_api::Error::InvalidUrl(e) => WatchError::Config {
                message: format!("invalid controller URL: {e}"),
            },
            unifly_api::Error::LegacyApi { message } => WatchError::Request { message },
            unifly_api::Error::Deserialization { message, body: _ } => WatchError::Request {
                message: format!("unexpected response: {message}"),
            },
        }
    }
}
