// ── Domain types ──
//
// Client snapshots, persisted devices, the event log and the in-memory
// known-id cache. Optional client fields resolve to their display
// fallbacks here and nowhere else.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::config::{IdSource, NotificationService};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";
pub const UNASSIGNED_IP: &str = "Unassigned";

/// Kind of client record reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// Regular wired or wireless station.
    #[default]
    Station,
    /// Teleport (VPN) client: no MAC, no LAN network.
    Teleport,
}

/// One connected client from a snapshot. Lives for a single poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Native identifier (MAC address).
    pub id: String,
    /// Controller-assigned identifier, used in [`IdSource::ControllerId`] mode.
    pub alt_id: Option<String>,
    pub display_name: Option<String>,
    pub ip: Option<String>,
    pub host_name: Option<String>,
    pub is_wired: bool,
    pub network: Option<String>,
    pub record_type: RecordType,
}

impl ClientRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// The identifier this record is tracked under.
    pub fn canonical_id(&self, source: IdSource) -> &str {
        match source {
            IdSource::Mac => &self.id,
            IdSource::ControllerId => self.alt_id.as_deref().unwrap_or(&self.id),
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    pub fn host_name(&self) -> &str {
        self.host_name.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn ip(&self) -> &str {
        self.ip.as_deref().unwrap_or(UNASSIGNED_IP)
    }

    pub fn network(&self) -> &str {
        match (self.network.as_deref(), self.record_type) {
            (Some(network), _) => network,
            (None, RecordType::Teleport) => "Teleport",
            (None, RecordType::Station) => NOT_AVAILABLE,
        }
    }

    pub fn connection_label(&self) -> &'static str {
        match self.record_type {
            RecordType::Teleport => "Teleport",
            RecordType::Station if self.is_wired => "Wired",
            RecordType::Station => "Wireless",
        }
    }
}

/// A device persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownDevice {
    pub id: String,
    pub display_name: String,
    pub host_name: String,
    /// `None` while present; otherwise when the device was first seen missing.
    pub last_seen_absent: Option<DateTime<Utc>>,
}

impl KnownDevice {
    /// Build the row remembered for a newly seen client.
    pub fn from_client(record: &ClientRecord, source: IdSource) -> Self {
        Self {
            id: record.canonical_id(source).to_owned(),
            display_name: record.display_name().to_owned(),
            host_name: record.host_name().to_owned(),
            last_seen_absent: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Added,
    Removed,
}

/// Entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub occurred_at: DateTime<Utc>,
    pub kind: EventKind,
    pub device_id: String,
    pub display_name: String,
    pub host_name: String,
}

/// A message the loop should hand to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub message: String,
    pub channel: NotificationService,
}

/// Seed identifiers plus every persisted device id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIds(HashSet<String>);

impl KnownIds {
    /// Build from seed identifiers, trimming whitespace and dropping blanks.
    pub fn from_seed<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = Self::default();
        for id in seed {
            ids.insert(id.as_ref());
        }
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Returns `true` if the id was not known before.
    pub fn insert(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        self.0.insert(id.to_owned())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id.trim())
    }
}
