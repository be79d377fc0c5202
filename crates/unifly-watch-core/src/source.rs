// ── Client sources ──
//
// `ClientSource` is the seam between the watch loop and the controller.
// Every listing result is folded into one `SnapshotOutcome` so the loop
// handles it with a single match.

use async_trait::async_trait;
use tracing::{debug, warn};
use unifly_api::transport::{TlsMode, TransportConfig};
use unifly_api::{LegacyClient, LegacyClientEntry};

use crate::config::{ControllerConfig, TlsVerification};
use crate::error::WatchError;
use crate::model::{ClientRecord, RecordType};

/// What one client listing produced.
#[derive(Debug)]
pub enum SnapshotOutcome {
    /// At least one connected client.
    Clients(Vec<ClientRecord>),
    /// The controller reported no connected clients.
    Empty,
    /// The response was not a well-formed client list.
    Malformed { reason: String },
    /// The controller refused or failed the request.
    RequestFailed(WatchError),
}

impl SnapshotOutcome {
    pub fn from_records(records: Vec<ClientRecord>) -> Self {
        if records.is_empty() {
            Self::Empty
        } else {
            Self::Clients(records)
        }
    }
}

/// Something that can report the clients currently on the network.
#[async_trait]
pub trait ClientSource: Send + Sync {
    type Session: Send + Sync;

    /// Establish an authenticated session.
    async fn connect(&self) -> Result<Self::Session, WatchError>;

    /// Fetch the current snapshot.
    async fn list_clients(&self, session: &Self::Session) -> SnapshotOutcome;

    /// Tear down a session. Failures are logged, not returned.
    async fn disconnect(&self, session: Self::Session);
}

// ── UniFi legacy API ────────────────────────────────────────────────

/// [`ClientSource`] backed by the controller's legacy `stat/sta` endpoint.
pub struct UnifiSource {
    config: ControllerConfig,
}

impl UnifiSource {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> TransportConfig {
        let tls = match &self.config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.config.timeout,
            cookie_jar: None,
        }
    }

    fn connection_error(&self, err: unifly_api::Error) -> WatchError {
        match WatchError::from(err) {
            WatchError::Connection { reason, .. } => WatchError::Connection {
                url: self.config.url.to_string(),
                reason,
            },
            other => other,
        }
    }
}

#[async_trait]
impl ClientSource for UnifiSource {
    type Session = LegacyClient;

    async fn connect(&self) -> Result<LegacyClient, WatchError> {
        let transport = self.transport();
        let platform = LegacyClient::detect_platform(&self.config.url, &transport)
            .await
            .map_err(|e| self.connection_error(e))?;
        debug!(?platform, "detected controller platform");

        let client = LegacyClient::new(
            self.config.url.clone(),
            self.config.site.clone(),
            platform,
            &transport,
        )
        .map_err(|e| self.connection_error(e))?;
        client
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|e| self.connection_error(e))?;
        debug!(site = %client.site(), "session authentication successful");
        Ok(client)
    }

    async fn list_clients(&self, session: &LegacyClient) -> SnapshotOutcome {
        match session.list_clients().await {
            Ok(entries) => {
                SnapshotOutcome::from_records(entries.into_iter().map(ClientRecord::from).collect())
            }
            Err(unifly_api::Error::Deserialization { message, .. }) => {
                SnapshotOutcome::Malformed { reason: message }
            }
            Err(err) => {
                if err.is_auth_expired() {
                    debug!("controller rejected the session");
                }
                SnapshotOutcome::RequestFailed(err.into())
            }
        }
    }

    async fn disconnect(&self, session: LegacyClient) {
        if let Err(e) = session.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
    }
}

impl From<LegacyClientEntry> for ClientRecord {
    fn from(entry: LegacyClientEntry) -> Self {
        let record_type = if entry.is_teleport() {
            RecordType::Teleport
        } else {
            RecordType::Station
        };
        let id = if entry.mac.is_empty() {
            entry.id.clone()
        } else {
            entry.mac
        };
        Self {
            id,
            alt_id: Some(entry.id),
            display_name: entry.name.filter(|s| !s.is_empty()),
            ip: entry.ip.filter(|s| !s.is_empty()),
            host_name: entry.hostname.filter(|s| !s.is_empty()),
            is_wired: entry.is_wired.unwrap_or(false),
            network: entry.network.or(entry.essid),
            record_type,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> LegacyClientEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn station_entry_maps_fields() {
        let record = ClientRecord::from(entry(json!({
            "_id": "60d0", "mac": "aa:bb", "name": "Phone", "hostname": "pixel",
            "ip": "10.0.0.2", "is_wired": true, "network": "LAN"
        })));
        assert_eq!(record.id, "aa:bb");
        assert_eq!(record.alt_id.as_deref(), Some("60d0"));
        assert_eq!(record.display_name(), "Phone");
        assert_eq!(record.connection_label(), "Wired");
        assert_eq!(record.network(), "LAN");
    }

    #[test]
    fn blank_names_use_fallbacks() {
        let record = ClientRecord::from(entry(json!({ "_id": "1", "mac": "aa", "name": "" })));
        assert_eq!(record.display_name(), "Unknown");
        assert_eq!(record.host_name(), "N/A");
    }

    #[test]
    fn teleport_entry_without_mac_uses_controller_id() {
        let record = ClientRecord::from(entry(json!({ "_id": "tp-7", "type": "TELEPORT" })));
        assert_eq!(record.id, "tp-7");
        assert_eq!(record.record_type, RecordType::Teleport);
    }

    #[test]
    fn wireless_network_falls_back_to_essid() {
        let record = ClientRecord::from(entry(json!({ "_id": "1", "mac": "aa", "essid": "Home" })));
        assert_eq!(record.network(), "Home");
    }
}
