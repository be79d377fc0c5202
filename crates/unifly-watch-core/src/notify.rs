// ── Notifiers ──
//
// `Notifier` is the delivery seam. `HttpNotifier` posts to the Telegram
// Bot API or to an ntfy topic, chosen per message by `NotificationService`.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::{NotificationService, NotifyConfig, TelegramTarget};
use crate::error::WatchError;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, channel: NotificationService) -> Result<(), WatchError>;
}

/// Telegram + ntfy over HTTPS.
pub struct HttpNotifier {
    http: reqwest::Client,
    telegram: Option<TelegramTarget>,
    telegram_api: Url,
    ntfy_url: Option<Url>,
}

impl HttpNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, WatchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("unifly-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::Config {
                message: format!("failed to build notification HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            telegram: config.telegram.clone(),
            telegram_api: config.telegram_api.clone(),
            ntfy_url: config.ntfy_url.clone(),
        })
    }

    async fn send_telegram(&self, message: &str) -> Result<(), WatchError> {
        let target = self
            .telegram
            .as_ref()
            .ok_or_else(|| not_configured(NotificationService::Telegram))?;
        let url = format!(
            "{}/bot{}/sendMessage",
            self.telegram_api.as_str().trim_end_matches('/'),
            target.bot_token.expose_secret()
        );
        debug!(chat_id = %target.chat_id, "sending Telegram notification");
        let resp = self
            .http
            .post(url)
            .json(&json!({
                "chat_id": target.chat_id,
                "text": message,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(|e| delivery(NotificationService::Telegram, e))?;
        check_status(NotificationService::Telegram, resp).await
    }

    async fn send_ntfy(&self, message: &str) -> Result<(), WatchError> {
        let url = self
            .ntfy_url
            .clone()
            .ok_or_else(|| not_configured(NotificationService::Ntfy))?;
        debug!(topic = %url, "sending ntfy notification");
        let resp = self
            .http
            .post(url)
            .body(message.to_owned())
            .send()
            .await
            .map_err(|e| delivery(NotificationService::Ntfy, e))?;
        check_status(NotificationService::Ntfy, resp).await
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &str, channel: NotificationService) -> Result<(), WatchError> {
        match channel {
            NotificationService::Telegram => self.send_telegram(message).await,
            NotificationService::Ntfy => self.send_ntfy(message).await,
        }
    }
}

fn not_configured(channel: NotificationService) -> WatchError {
    WatchError::Delivery {
        channel: channel.to_string(),
        reason: "channel is not configured".into(),
    }
}

/// Transport failure; the URL is stripped because it carries the bot token.
fn delivery(channel: NotificationService, err: reqwest::Error) -> WatchError {
    WatchError::Delivery {
        channel: channel.to_string(),
        reason: err.without_url().to_string(),
    }
}

async fn check_status(
    channel: NotificationService,
    resp: reqwest::Response,
) -> Result<(), WatchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    let preview: String = body.chars().take(200).collect();
    Err(WatchError::Delivery {
        channel: channel.to_string(),
        reason: format!("HTTP {status}: {preview}"),
    })
}
