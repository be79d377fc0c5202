//! Presence tracking core for UniFi networks.
//!
//! Polls a controller for connected clients, remembers devices it has seen
//! in a SQLite store and raises notifications for new arrivals:
//!
//! - **[`DeviceStore`]**: known devices plus an append-only event log,
//!   with two-phase absence eviction ([`DeviceStore::sweep_absences`]).
//! - **[`reconcile()`]**: pure decision function: which clients notify,
//!   which get remembered.
//! - **[`Watcher`]**: the poll / reconcile / sweep / sleep loop with its
//!   failure recovery, generic over a [`ClientSource`] and a [`Notifier`].
//! - Adapters: [`UnifiSource`] (legacy controller API) and
//!   [`HttpNotifier`] (Telegram, ntfy).

pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod watcher;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    ControllerConfig, IdSource, NotificationService, NotifyConfig, TelegramTarget,
    TlsVerification, WatchConfig,
};
pub use error::WatchError;
pub use model::{
    ClientRecord, DeviceEvent, EventKind, KnownDevice, KnownIds, NotificationRequest, RecordType,
};
pub use notify::{HttpNotifier, Notifier};
pub use reconcile::{Reconciliation, reconcile};
pub use source::{ClientSource, SnapshotOutcome, UnifiSource};
pub use store::{DeviceStore, SweepReport};
pub use watcher::{CycleOutcome, WatchState, Watcher};
