// Legacy API response types
//
// All responses are wrapped in the `LegacyResponse<T>` envelope. Fields use
// `#[serde(default)]` liberally because the API is inconsistent about field
// presence across firmware versions.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard UniFi legacy API response envelope.
///
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Deserialize)]
pub struct LegacyResponse<T> {
    pub meta: Meta,
    pub data: Vec<T>,
}

/// Metadata from the legacy envelope. `rc` == `"ok"` means success.
#[derive(Debug, Deserialize)]
pub struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
}

// ── Client (Station) ─────────────────────────────────────────────────

/// Connected client from `stat/sta`.
///
/// Teleport clients may arrive without a MAC, so `mac` defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyClientEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_guest: Option<bool>,
    #[serde(default)]
    pub is_wired: Option<bool>,
    /// Connection type reported by newer firmware (`WIRED`, `WIRELESS`, `TELEPORT`, ...).
    #[serde(default, rename = "type")]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub first_seen: Option<i64>,
    #[serde(default)]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub essid: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub network_id: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LegacyClientEntry {
    /// Whether the controller reports this entry as a Teleport (VPN) client.
    pub fn is_teleport(&self) -> bool {
        self.connection_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("teleport"))
            || self
                .extra
                .get("is_teleport")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
    }
}
