// ── Runtime configuration ──
//
// Plain values consumed by the watcher and its adapters. Nothing here
// touches disk or the environment; `unifly-watch-config` builds these
// from TOML + env and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// Which notification channel a message is delivered through.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum NotificationService {
    #[default]
    Telegram,
    Ntfy,
}

/// Which client field identifies a device.
///
/// `Mac` is the normal mode. `ControllerId` is the alternate-source mode
/// and keys devices on the controller-assigned `_id`, which also covers
/// Teleport clients that have no MAC.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    #[default]
    Mac,
    ControllerId,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

/// Connection settings for the UniFi controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller URL (e.g., `https://192.168.1.1`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Site to watch (defaults to "default").
    pub site: String,
    pub tls: TlsVerification,
    /// Request timeout, enforced by the HTTP client.
    pub timeout: Duration,
}

/// Telegram bot credentials.
#[derive(Debug, Clone)]
pub struct TelegramTarget {
    pub bot_token: SecretString,
    pub chat_id: String,
}

/// Delivery targets for [`HttpNotifier`](crate::HttpNotifier).
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub telegram: Option<TelegramTarget>,
    /// Full topic URL, e.g. `https://ntfy.sh/my-network`.
    pub ntfy_url: Option<Url>,
    /// Bot API root; only overridden in tests.
    pub telegram_api: Url,
    pub timeout: Duration,
}

impl NotifyConfig {
    pub const TELEGRAM_API: &'static str = "https://api.telegram.org";
}

/// Behaviour of the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Sleep between cycles.
    pub poll_interval: Duration,
    /// Fixed pause after a failed or malformed client listing, before reconnecting.
    pub recovery_delay: Duration,
    pub notification_service: NotificationService,
    /// Notify for every connected client, not only new ones.
    pub always_notify: bool,
    pub remember_new_devices: bool,
    /// Enable the absence sweep and eviction of devices no longer seen.
    pub remove_old_devices: bool,
    /// Minimum absence before a marked device is deleted.
    pub removal_grace: Duration,
    pub notify_on_error: bool,
    pub exit_on_error: bool,
    pub notify_on_removal: bool,
    pub id_source: IdSource,
    /// Identifiers that are always treated as known.
    pub known_ids: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            recovery_delay: Duration::from_secs(10),
            notification_service: NotificationService::Telegram,
            always_notify: false,
            remember_new_devices: true,
            remove_old_devices: false,
            removal_grace: Duration::from_secs(86_400),
            notify_on_error: false,
            exit_on_error: false,
            notify_on_removal: false,
            id_source: IdSource::Mac,
            known_ids: Vec::new(),
        }
    }
}
