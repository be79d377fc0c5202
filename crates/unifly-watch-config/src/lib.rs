//! Configuration for unifly-watch.
//!
//! One TOML file with `[controller]`, `[notify]` and `[watch]` sections,
//! layered under `UNIFLY_WATCH_*` environment variables, plus password
//! resolution (env var, plaintext, keyring). The loaded [`Config`] is
//! translated into the plain runtime types of `unifly_watch_core`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use unifly_watch_core::{
    ControllerConfig, IdSource, NotificationService, NotifyConfig, TelegramTarget,
    TlsVerification, WatchConfig,
};

/// Service name for keyring entries; the account is the controller username.
pub const KEYRING_SERVICE: &str = "unifly-watch";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required setting '{field}'")]
    Missing { field: String },

    #[error("no password configured for controller user '{username}'")]
    NoCredentials { username: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerSection,

    #[serde(default)]
    pub notify: NotifySection,

    #[serde(default)]
    pub watch: WatchSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerSection {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub url: Option<String>,

    #[serde(default = "default_site")]
    pub site: String,

    pub username: Option<String>,

    /// Plaintext password (prefer `password_env` or the keyring).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Accept self-signed certificates.
    #[serde(default = "default_true")]
    pub insecure: bool,

    /// Path to custom CA certificate. Takes precedence over `insecure`.
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// "mac" or "controller_id".
    #[serde(default = "default_id_source")]
    pub id_source: String,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            url: None,
            site: default_site(),
            username: None,
            password: None,
            password_env: None,
            insecure: true,
            ca_cert: None,
            timeout: default_timeout(),
            id_source: default_id_source(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifySection {
    /// "telegram" or "ntfy".
    #[serde(default = "default_service")]
    pub service: String,

    pub telegram_bot_token: Option<String>,

    /// Chat id; numeric ids may be written as TOML integers.
    #[serde(default, deserialize_with = "string_or_number")]
    pub telegram_chat_id: Option<String>,

    /// Full ntfy topic URL.
    pub ntfy_url: Option<String>,

    /// Delivery timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            service: default_service(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            ntfy_url: None,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchSection {
    /// Seconds between cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Seconds to wait after a failed listing before reconnecting.
    #[serde(default = "default_recovery_delay")]
    pub recovery_delay: u64,

    #[serde(default)]
    pub always_notify: bool,

    #[serde(default = "default_true")]
    pub remember_new_devices: bool,

    #[serde(default)]
    pub remove_old_devices: bool,

    /// Seconds a device must stay absent before it is removed.
    #[serde(default = "default_remove_delay")]
    pub remove_delay: u64,

    #[serde(default)]
    pub notify_on_error: bool,

    #[serde(default)]
    pub exit_on_error: bool,

    #[serde(default)]
    pub notify_on_removal: bool,

    /// Always-known ids: a TOML array or a comma-separated string.
    #[serde(default, deserialize_with = "id_list")]
    pub known_macs: Vec<String>,

    /// SQLite database path. Defaults to the platform data directory.
    pub database: Option<PathBuf>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            recovery_delay: default_recovery_delay(),
            always_notify: false,
            remember_new_devices: true,
            remove_old_devices: false,
            remove_delay: default_remove_delay(),
            notify_on_error: false,
            exit_on_error: false,
            notify_on_removal: false,
            known_macs: Vec::new(),
            database: None,
        }
    }
}

fn default_site() -> String {
    "default".into()
}
fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_id_source() -> String {
    "mac".into()
}
fn default_service() -> String {
    "telegram".into()
}
fn default_check_interval() -> u64 {
    60
}
fn default_recovery_delay() -> u64 {
    10
}
fn default_remove_delay() -> u64 {
    86_400
}

/// Accept `["aa", "bb"]` or `"aa, bb"`. Entries are trimmed; blanks dropped.
fn id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Csv(s) => s.split(',').map(str::to_owned).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect())
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "unifly", "unifly-watch")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unifly-watch");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the device database.
pub fn default_database_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("devices.db"),
        |dirs| dirs.data_dir().join("devices.db"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Provider chain: defaults, then the TOML file, then `UNIFLY_WATCH_*`.
///
/// Nested keys use a double underscore, e.g.
/// `UNIFLY_WATCH_WATCH__CHECK_INTERVAL=30`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNIFLY_WATCH_").split("__"))
}

/// Load the config from `path` (or the default location) plus environment.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");
    Ok(figment(&path).extract()?)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Copy with plaintext secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_owned());
        let mut out = self.clone();
        out.controller.password = mask(&self.controller.password);
        out.notify.telegram_bot_token = mask(&self.notify.telegram_bot_token);
        out
    }

    pub fn database_path(&self) -> PathBuf {
        self.watch
            .database
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Build the watch loop settings.
    pub fn watch_config(&self) -> Result<WatchConfig, ConfigError> {
        let w = &self.watch;
        if w.check_interval == 0 {
            return Err(invalid("watch.check_interval", "must be at least 1 second"));
        }
        Ok(WatchConfig {
            poll_interval: Duration::from_secs(w.check_interval),
            recovery_delay: Duration::from_secs(w.recovery_delay),
            notification_service: self.notification_service()?,
            always_notify: w.always_notify,
            remember_new_devices: w.remember_new_devices,
            remove_old_devices: w.remove_old_devices,
            removal_grace: Duration::from_secs(w.remove_delay),
            notify_on_error: w.notify_on_error,
            exit_on_error: w.exit_on_error,
            notify_on_removal: w.notify_on_removal,
            id_source: self.id_source()?,
            known_ids: w.known_macs.clone(),
        })
    }

    /// Build the notifier settings. The selected service must be fully configured.
    pub fn notify_config(&self) -> Result<NotifyConfig, ConfigError> {
        let n = &self.notify;
        let telegram = match (&n.telegram_bot_token, &n.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(TelegramTarget {
                bot_token: SecretString::from(token.clone()),
                chat_id: chat_id.clone(),
            }),
            _ => None,
        };
        let ntfy_url = n
            .ntfy_url
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|e| invalid("notify.ntfy_url", e.to_string())))
            .transpose()?;

        match self.notification_service()? {
            NotificationService::Telegram if telegram.is_none() => {
                return Err(ConfigError::Missing {
                    field: "notify.telegram_bot_token / notify.telegram_chat_id".into(),
                });
            }
            NotificationService::Ntfy if ntfy_url.is_none() => {
                return Err(ConfigError::Missing {
                    field: "notify.ntfy_url".into(),
                });
            }
            _ => {}
        }

        let telegram_api = Url::parse(NotifyConfig::TELEGRAM_API)
            .map_err(|e| invalid("telegram api url", e.to_string()))?;
        Ok(NotifyConfig {
            telegram,
            ntfy_url,
            telegram_api,
            timeout: Duration::from_secs(n.timeout),
        })
    }

    /// Build the controller connection settings, resolving the password.
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let c = &self.controller;
        let raw_url = c.url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "controller.url".into(),
        })?;
        let url = Url::parse(raw_url)
            .map_err(|_| invalid("controller.url", format!("invalid URL: {raw_url}")))?;
        let username = c.username.clone().ok_or_else(|| ConfigError::Missing {
            field: "controller.username".into(),
        })?;
        let password = resolve_password(c, &username)?;

        let tls = if let Some(ref ca_path) = c.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else if c.insecure {
            TlsVerification::DangerAcceptInvalid
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(ControllerConfig {
            url,
            username,
            password,
            site: c.site.clone(),
            tls,
            timeout: Duration::from_secs(c.timeout),
        })
    }

    fn notification_service(&self) -> Result<NotificationService, ConfigError> {
        self.notify.service.parse().map_err(|_| {
            invalid(
                "notify.service",
                format!("expected 'telegram' or 'ntfy', got '{}'", self.notify.service),
            )
        })
    }

    fn id_source(&self) -> Result<IdSource, ConfigError> {
        self.controller.id_source.parse().map_err(|_| {
            invalid(
                "controller.id_source",
                format!(
                    "expected 'mac' or 'controller_id', got '{}'",
                    self.controller.id_source
                ),
            )
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the controller password: `password_env`, then plaintext, then keyring.
pub fn resolve_password(
    controller: &ControllerSection,
    username: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(ref env_name) = controller.password_env {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(SecretString::from(pw));
        }
        debug!(env = %env_name, "password env var not set");
    }

    // 2. Plaintext in config
    if let Some(ref pw) = controller.password {
        return Ok(SecretString::from(pw.clone()));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, username) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    Err(ConfigError::NoCredentials {
        username: username.into(),
    })
}

/// Save a controller password in the system keyring.
pub fn store_password(username: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, username)?;
    entry.set_password(password.expose_secret())?;
    debug!(username, "stored controller password in keyring");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(toml: &str) -> Config {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let watch = parse("").watch_config().unwrap();
        assert_eq!(watch, WatchConfig::default());
    }

    #[test]
    fn known_macs_accepts_array_or_comma_list() {
        let from_array = parse(r#"
            [watch]
            known_macs = ["aa:bb:cc:00:00:01", " aa:bb:cc:00:00:02 "]
        "#);
        let from_csv = parse(r#"
            [watch]
            known_macs = "aa:bb:cc:00:00:01, aa:bb:cc:00:00:02,,"
        "#);
        let expected = vec!["aa:bb:cc:00:00:01", "aa:bb:cc:00:00:02"];
        assert_eq!(from_array.watch.known_macs, expected);
        assert_eq!(from_csv.watch.known_macs, expected);
    }

    #[test]
    fn watch_section_maps_to_runtime_settings() {
        let watch = parse(r#"
            [controller]
            id_source = "controller_id"

            [notify]
            service = "Ntfy"

            [watch]
            check_interval = 30
            remove_old_devices = true
            remove_delay = 120
            exit_on_error = true
        "#)
        .watch_config()
        .unwrap();
        assert_eq!(watch.poll_interval, Duration::from_secs(30));
        assert_eq!(watch.removal_grace, Duration::from_secs(120));
        assert_eq!(watch.notification_service, NotificationService::Ntfy);
        assert_eq!(watch.id_source, IdSource::ControllerId);
        assert!(watch.remove_old_devices);
        assert!(watch.exit_on_error);
        assert!(watch.remember_new_devices);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = parse("[watch]\ncheck_interval = 0").watch_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "watch.check_interval"));
    }

    #[test]
    fn unknown_service_is_rejected() {
        let err = parse("[notify]\nservice = \"pager\"").watch_config().unwrap_err();
        assert!(err.to_string().contains("pager"));
    }

    #[test]
    fn selected_service_must_be_configured() {
        let err = parse("").notify_config().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));

        let ok = parse(r#"
            [notify]
            service = "ntfy"
            ntfy_url = "https://ntfy.sh/home"
        "#)
        .notify_config()
        .unwrap();
        assert_eq!(ok.ntfy_url.unwrap().as_str(), "https://ntfy.sh/home");
        assert!(ok.telegram.is_none());
    }

    #[test]
    fn telegram_target_needs_token_and_chat() {
        let notify = parse(r#"
            [notify]
            telegram_bot_token = "123:abc"
            telegram_chat_id = "42"
        "#)
        .notify_config()
        .unwrap();
        let target = notify.telegram.unwrap();
        assert_eq!(target.bot_token.expose_secret(), "123:abc");
        assert_eq!(target.chat_id, "42");
        assert_eq!(notify.telegram_api.as_str(), "https://api.telegram.org/");
    }

    #[test]
    fn numeric_chat_id_is_accepted() {
        let config = parse("[notify]\ntelegram_bot_token = \"t\"\ntelegram_chat_id = -10042");
        assert_eq!(config.notify.telegram_chat_id.as_deref(), Some("-10042"));
    }

    #[test]
    fn controller_section_with_plaintext_password() {
        let controller = parse(r#"
            [controller]
            url = "https://192.168.1.1"
            username = "watcher"
            password = "hunter2"
            site = "home"
            insecure = false
        "#)
        .controller_config()
        .unwrap();
        assert_eq!(controller.url.as_str(), "https://192.168.1.1/");
        assert_eq!(controller.site, "home");
        assert_eq!(controller.password.expose_secret(), "hunter2");
        assert_eq!(controller.tls, TlsVerification::SystemDefaults);
        assert_eq!(controller.timeout, Duration::from_secs(30));
    }

    #[test]
    fn ca_cert_wins_over_insecure() {
        let controller = parse(r#"
            [controller]
            url = "https://unifi.local"
            username = "watcher"
            password = "x"
            ca_cert = "/etc/unifi/ca.pem"
        "#)
        .controller_config()
        .unwrap();
        assert_eq!(
            controller.tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/unifi/ca.pem"))
        );
    }

    #[test]
    fn controller_url_and_username_are_required() {
        let err = parse("").controller_config().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref field } if field == "controller.url"));

        let err = parse("[controller]\nurl = \"https://unifi.local\"")
            .controller_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref field } if field == "controller.username"));
    }

    #[test]
    fn redacted_masks_secrets_only() {
        let config = parse(r#"
            [controller]
            username = "watcher"
            password = "hunter2"

            [notify]
            telegram_bot_token = "123:abc"
        "#)
        .redacted();
        assert_eq!(config.controller.password.as_deref(), Some("********"));
        assert_eq!(config.notify.telegram_bot_token.as_deref(), Some("********"));
        assert_eq!(config.controller.username.as_deref(), Some("watcher"));
        assert!(config.controller.password_env.is_none());
    }

    #[test]
    fn database_path_override() {
        let config = parse("[watch]\ndatabase = \"/var/lib/unifly-watch/devices.db\"");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/unifly-watch/devices.db")
        );
        assert!(parse("").database_path().ends_with("devices.db"));
    }
}
