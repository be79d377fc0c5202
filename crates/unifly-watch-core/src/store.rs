//! SQLite-backed device store.
//!
//! Two tables: `known_devices` (one row per remembered device, keyed by a
//! unique `device_id`) and `device_events`, an append-only log of
//! `added` / `removed` transitions. Every error surfaces as
//! [`WatchError::Storage`]; nothing is retried here.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::WatchError;
use crate::model::{DeviceEvent, EventKind, KnownDevice, KnownIds};

/// Result of one absence sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Devices that were marked absent and are present again.
    pub returned: Vec<String>,
    /// Devices seen missing for the first time; deleted on a later sweep.
    pub pending_removal: Vec<KnownDevice>,
    /// Devices deleted because their grace period ran out.
    pub removed: Vec<KnownDevice>,
}

impl SweepReport {
    pub fn is_quiet(&self) -> bool {
        self.returned.is_empty() && self.pending_removal.is_empty() && self.removed.is_empty()
    }
}

/// Persistent table of known devices plus the event log.
pub struct DeviceStore {
    conn: Connection,
}

impl DeviceStore {
    /// Open (creating if needed) the store at `path` and migrate the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening device store");
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, WatchError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS known_devices (
                id               INTEGER PRIMARY KEY,
                device_id        TEXT NOT NULL UNIQUE,
                display_name     TEXT NOT NULL,
                host_name        TEXT NOT NULL,
                last_seen_absent INTEGER
            );

            CREATE TABLE IF NOT EXISTS device_events (
                id           INTEGER PRIMARY KEY,
                occurred_at  TEXT NOT NULL,
                kind         TEXT NOT NULL,
                device_id    TEXT NOT NULL,
                display_name TEXT NOT NULL,
                host_name    TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_device_events_device ON device_events(device_id);",
        )
    }

    /// Union of `seed` and every persisted device id.
    pub fn load_known_ids<S: AsRef<str>>(&self, seed: &[S]) -> Result<KnownIds, WatchError> {
        let mut ids = KnownIds::from_seed(seed);
        let mut stmt = self.conn.prepare("SELECT device_id FROM known_devices")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for id in rows {
            ids.insert(&id?);
        }
        Ok(ids)
    }

    /// Insert the device unless it already exists, and log an `added` event.
    ///
    /// The event is appended even when the row already existed. Both writes
    /// commit together or not at all. Returns whether a new row was created.
    pub fn remember(
        &self,
        device_id: &str,
        display_name: &str,
        host_name: &str,
    ) -> Result<bool, WatchError> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO known_devices (device_id, display_name, host_name)
             VALUES (?1, ?2, ?3)",
            params![device_id, display_name, host_name],
        )? > 0;
        append_event(
            &tx,
            Utc::now(),
            EventKind::Added,
            device_id,
            display_name,
            host_name,
        )?;
        tx.commit()?;
        debug!(device_id, inserted, "remembered device");
        Ok(inserted)
    }

    /// Age out devices missing from `current_ids`, using the wall clock.
    pub fn sweep_absences(
        &mut self,
        current_ids: &HashSet<String>,
        grace: Duration,
    ) -> Result<SweepReport, WatchError> {
        self.sweep_absences_at(current_ids, grace, Utc::now())
    }

    /// Age out devices missing from `current_ids` as of `now`.
    ///
    /// Present devices get their absence marker cleared. A missing device is
    /// first marked with `now`; it is deleted (with one `removed` event) on
    /// a later sweep once `now - marker >= grace`. Runs in one transaction.
    pub fn sweep_absences_at(
        &mut self,
        current_ids: &HashSet<String>,
        grace: Duration,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, WatchError> {
        let grace_secs = i64::try_from(grace.as_secs()).unwrap_or(i64::MAX);
        let now_secs = now.timestamp();
        let tx = self.conn.transaction()?;
        let mut report = SweepReport::default();

        let devices = {
            let mut stmt = tx.prepare(
                "SELECT device_id, display_name, host_name, last_seen_absent
                 FROM known_devices ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], device_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for device in devices {
            if current_ids.contains(&device.id) {
                if device.last_seen_absent.is_some() {
                    tx.execute(
                        "UPDATE known_devices SET last_seen_absent = NULL WHERE device_id = ?1",
                        params![device.id],
                    )?;
                    report.returned.push(device.id);
                }
                continue;
            }

            match device.last_seen_absent {
                None => {
                    tx.execute(
                        "UPDATE known_devices SET last_seen_absent = ?1 WHERE device_id = ?2",
                        params![now_secs, device.id],
                    )?;
                    info!(
                        device_id = %device.id,
                        name = %device.display_name,
                        host = %device.host_name,
                        "device disappeared, not yet removing"
                    );
                    report.pending_removal.push(KnownDevice {
                        last_seen_absent: Some(now),
                        ..device
                    });
                }
                Some(marked) if now_secs.saturating_sub(marked.timestamp()) >= grace_secs => {
                    tx.execute(
                        "DELETE FROM known_devices WHERE device_id = ?1",
                        params![device.id],
                    )?;
                    append_event(
                        &tx,
                        now,
                        EventKind::Removed,
                        &device.id,
                        &device.display_name,
                        &device.host_name,
                    )?;
                    info!(
                        device_id = %device.id,
                        name = %device.display_name,
                        host = %device.host_name,
                        "removing device from store"
                    );
                    report.removed.push(device);
                }
                Some(_) => {}
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// Look up one device by id.
    pub fn device(&self, device_id: &str) -> Result<Option<KnownDevice>, WatchError> {
        Ok(self
            .conn
            .query_row(
                "SELECT device_id, display_name, host_name, last_seen_absent
                 FROM known_devices WHERE device_id = ?1",
                params![device_id],
                device_from_row,
            )
            .optional()?)
    }

    /// All known devices, oldest first.
    pub fn known_devices(&self) -> Result<Vec<KnownDevice>, WatchError> {
        let mut stmt = self.conn.prepare(
            "SELECT device_id, display_name, host_name, last_seen_absent
             FROM known_devices ORDER BY id",
        )?;
        let devices = stmt
            .query_map([], device_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(devices)
    }

    /// The event log, newest first, optionally capped at `limit` entries.
    pub fn events(&self, limit: Option<usize>) -> Result<Vec<DeviceEvent>, WatchError> {
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(
            "SELECT occurred_at, kind, device_id, display_name, host_name
             FROM device_events ORDER BY id DESC LIMIT ?1",
        )?;
        let events = stmt
            .query_map(params![limit], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

fn append_event(
    conn: &Connection,
    at: DateTime<Utc>,
    kind: EventKind,
    device_id: &str,
    display_name: &str,
    host_name: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO device_events (occurred_at, kind, device_id, display_name, host_name)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![at.to_rfc3339(), kind.as_ref(), device_id, display_name, host_name],
    )?;
    Ok(())
}

fn device_from_row(row: &Row<'_>) -> Result<KnownDevice, rusqlite::Error> {
    let absent: Option<i64> = row.get(3)?;
    let last_seen_absent = absent
        .map(|secs| {
            DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(3, secs))
        })
        .transpose()?;
    Ok(KnownDevice {
        id: row.get(0)?,
        display_name: row.get(1)?,
        host_name: row.get(2)?,
        last_seen_absent,
    })
}

fn event_from_row(row: &Row<'_>) -> Result<DeviceEvent, rusqlite::Error> {
    let occurred_at: String = row.get(0)?;
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    let kind: String = row.get(1)?;
    let kind = kind
        .parse::<EventKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(DeviceEvent {
        occurred_at,
        kind,
        device_id: row.get(2)?,
        display_name: row.get(3)?,
        host_name: row.get(4)?,
    })
}
