// ── Watch loop ──
//
// One poll / reconcile / sweep / sleep cycle at a time. The watcher owns
// its store connection, known-id cache and controller session; nothing
// is shared, so nothing is locked.
//
// Failure routing:
// - failed or malformed listing  -> recovery delay, reconnect, next cycle
// - any other error in a cycle   -> log, optional notification, then
//                                   fatal (`exit_on_error`) or reconnect
// - notification delivery errors -> logged and dropped

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::config::{NotificationService, WatchConfig};
use crate::error::WatchError;
use crate::message;
use crate::model::{ClientRecord, KnownIds};
use crate::notify::Notifier;
use crate::reconcile::reconcile;
use crate::source::{ClientSource, SnapshotOutcome};
use crate::store::DeviceStore;

/// Phase the watcher is in (or last entered).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Connecting,
    Polling,
    Reconciling,
    Sweeping,
    BackingOff,
    Fatal,
}

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A snapshot was reconciled (and swept, when eviction is on).
    Reconciled {
        notified: usize,
        remembered: usize,
        removed: usize,
    },
    /// The controller reported no clients; nothing was reconciled.
    NoDevices,
    /// The listing failed or was malformed; the session was rebuilt.
    Recovered,
    /// The cycle hit an error and a reconnect was attempted.
    Failed,
}

pub struct Watcher<S: ClientSource, N: Notifier> {
    config: WatchConfig,
    source: S,
    notifier: N,
    store: DeviceStore,
    known: KnownIds,
    session: Option<S::Session>,
    state: WatchState,
}

impl<S: ClientSource, N: Notifier> Watcher<S, N> {
    /// Build a watcher and load the known-id cache from `store` and the seed list.
    pub fn new(
        config: WatchConfig,
        source: S,
        notifier: N,
        store: DeviceStore,
    ) -> Result<Self, WatchError> {
        let known = store.load_known_ids(&config.known_ids)?;
        info!(known = known.len(), "loaded known devices");
        Ok(Self {
            config,
            source,
            notifier,
            store,
            known,
            session: None,
            state: WatchState::Connecting,
        })
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn known_ids(&self) -> &KnownIds {
        &self.known
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connect, then cycle forever. Returns only with [`WatchError::Fatal`].
    pub async fn run(&mut self) -> Result<(), WatchError> {
        self.connect().await?;
        loop {
            self.run_cycle().await?;
            debug!(
                secs = self.config.poll_interval.as_secs(),
                "checking again after poll interval"
            );
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Establish a controller session.
    ///
    /// A failure is logged and optionally notified. It is only returned
    /// (as `Fatal`) when `exit_on_error` is set; otherwise the watcher
    /// stays unconnected and the next cycle takes the error path.
    pub async fn connect(&mut self) -> Result<(), WatchError> {
        self.state = WatchState::Connecting;
        match self.source.connect().await {
            Ok(session) => {
                self.session = Some(session);
                info!("connected to controller");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "could not connect to controller");
                self.escalate("Could not connect to the controller.", &err)
                    .await
            }
        }
    }

    /// Log out of the controller, if connected.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            self.source.disconnect(session).await;
            info!("disconnected from controller");
        }
    }

    /// Run one cycle. `Err` is always [`WatchError::Fatal`].
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, WatchError> {
        match self.poll().await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => self.back_off(err).await,
        }
    }

    async fn poll(&mut self) -> Result<CycleOutcome, WatchError> {
        self.state = WatchState::Polling;
        let Some(session) = self.session.as_ref() else {
            return Err(WatchError::not_connected());
        };

        match self.source.list_clients(session).await {
            SnapshotOutcome::Clients(clients) => self.process(&clients).await,
            SnapshotOutcome::Empty => {
                info!("no devices currently connected to the network");
                Ok(CycleOutcome::NoDevices)
            }
            SnapshotOutcome::Malformed { reason } => {
                warn!(%reason, "controller returned a malformed client list");
                self.recover().await
            }
            SnapshotOutcome::RequestFailed(err) => {
                warn!(error = %err, "client listing failed");
                self.recover().await
            }
        }
    }

    /// Reconcile a non-empty snapshot, then sweep if eviction is enabled.
    async fn process(&mut self, clients: &[ClientRecord]) -> Result<CycleOutcome, WatchError> {
        self.state = WatchState::Reconciling;
        let decision = reconcile(clients, &mut self.known, &self.config);

        if decision.notifications.is_empty() {
            info!(clients = clients.len(), "no new devices found on the network");
        }
        for request in &decision.notifications {
            info!(channel = %request.channel, "sending device notification");
            deliver(&self.notifier, request.channel, &request.message).await;
        }
        for (i, device) in decision.newly_known.iter().enumerate() {
            if let Err(e) = self
                .store
                .remember(&device.id, &device.display_name, &device.host_name)
            {
                // Unsaved ids must stay unknown so the next cycle retries them.
                for unsaved in &decision.newly_known[i..] {
                    self.known.remove(&unsaved.id);
                }
                return Err(e);
            }
            info!(device_id = %device.id, name = %device.display_name, "remembered new device");
        }

        let removed = if self.config.remove_old_devices {
            self.sweep(clients).await?
        } else {
            0
        };

        Ok(CycleOutcome::Reconciled {
            notified: decision.notifications.len(),
            remembered: decision.newly_known.len(),
            removed,
        })
    }

    async fn sweep(&mut self, clients: &[ClientRecord]) -> Result<usize, WatchError> {
        self.state = WatchState::Sweeping;
        let current: HashSet<String> = clients
            .iter()
            .map(|c| c.canonical_id(self.config.id_source).to_owned())
            .collect();

        let report = self
            .store
            .sweep_absences(&current, self.config.removal_grace)?;
        for id in &report.returned {
            info!(device_id = %id, "device is back on the network");
        }
        if !report.is_quiet() {
            debug!(
                returned = report.returned.len(),
                pending = report.pending_removal.len(),
                removed = report.removed.len(),
                "absence sweep finished"
            );
        }
        if self.config.notify_on_removal {
            let channel = self.config.notification_service;
            for device in &report.removed {
                deliver(
                    &self.notifier,
                    channel,
                    &message::device_removed(device, channel),
                )
                .await;
            }
        }

        self.known = self.store.load_known_ids(&self.config.known_ids)?;
        debug!(known = self.known.len(), "reloaded known devices after sweep");
        Ok(report.removed.len())
    }

    /// Listing failed: wait out the recovery delay and rebuild the session.
    async fn recover(&mut self) -> Result<CycleOutcome, WatchError> {
        self.state = WatchState::BackingOff;
        info!(
            secs = self.config.recovery_delay.as_secs(),
            "waiting before reconnecting"
        );
        tokio::time::sleep(self.config.recovery_delay).await;
        self.reconnect().await?;
        Ok(CycleOutcome::Recovered)
    }

    /// Generic error path for a cycle.
    async fn back_off(&mut self, err: WatchError) -> Result<CycleOutcome, WatchError> {
        self.state = WatchState::BackingOff;
        error!(error = %err, "watch cycle failed");
        self.escalate("An error occurred while checking for devices.", &err)
            .await?;
        self.reconnect().await?;
        Ok(CycleOutcome::Failed)
    }

    async fn reconnect(&mut self) -> Result<(), WatchError> {
        if let Some(session) = self.session.take() {
            self.source.disconnect(session).await;
        }
        info!("reconnecting to controller");
        self.connect().await
    }

    /// Notify about `err` if configured; turn it fatal if `exit_on_error`.
    async fn escalate(&mut self, context: &str, err: &WatchError) -> Result<(), WatchError> {
        if self.config.notify_on_error {
            let channel = self.config.notification_service;
            deliver(
                &self.notifier,
                channel,
                &message::watcher_error(context, &err.to_string(), channel),
            )
            .await;
        }
        if self.config.exit_on_error {
            self.state = WatchState::Fatal;
            error!("exit_on_error is set, stopping");
            return Err(WatchError::Fatal {
                reason: format!("{context} {err}"),
            });
        }
        Ok(())
    }
}

/// Best-effort delivery: failures are logged and dropped.
async fn deliver<N: Notifier>(notifier: &N, channel: NotificationService, message: &str) {
    if let Err(e) = notifier.send(message, channel).await {
        warn!(%channel, error = %e, "notification delivery failed");
    }
}
