// ── Reconciliation ──
//
// Pure decision step: given one snapshot and the known-id cache, decide
// who gets a notification and who gets remembered. No I/O happens here;
// the watcher delivers the results.

use crate::config::WatchConfig;
use crate::message;
use crate::model::{ClientRecord, KnownDevice, KnownIds, NotificationRequest};

/// Decisions for one snapshot, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub notifications: Vec<NotificationRequest>,
    pub newly_known: Vec<KnownDevice>,
}

/// Compare `snapshot` against `known`.
///
/// A remembered id is inserted into `known` immediately, so a client
/// listed twice in one snapshot is remembered once.
pub fn reconcile(
    snapshot: &[ClientRecord],
    known: &mut KnownIds,
    config: &WatchConfig,
) -> Reconciliation {
    let mut out = Reconciliation::default();

    for record in snapshot {
        let id = record.canonical_id(config.id_source);
        let is_new = !known.contains(id);

        if config.always_notify || is_new {
            out.notifications.push(NotificationRequest {
                message: message::device_seen(record, config.notification_service),
                channel: config.notification_service,
            });
        }

        if is_new && config.remember_new_devices {
            known.insert(id);
            out.newly_known
                .push(KnownDevice::from_client(record, config.id_source));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdSource;

    fn client(id: &str, name: &str) -> ClientRecord {
        ClientRecord {
            display_name: Some(name.into()),
            ..ClientRecord::new(id)
        }
    }

    #[test]
    fn new_device_notifies_and_is_remembered() {
        let mut known = KnownIds::default();
        let out = reconcile(
            &[client("AA:BB", "Phone")],
            &mut known,
            &WatchConfig::default(),
        );

        assert_eq!(out.notifications.len(), 1);
        assert_eq!(out.newly_known.len(), 1);
        assert_eq!(out.newly_known[0].id, "AA:BB");
        assert_eq!(out.newly_known[0].display_name, "Phone");
        assert!(known.contains("AA:BB"));
    }

    #[test]
    fn known_device_is_silent_without_always_notify() {
        let mut known = KnownIds::from_seed(["AA:BB"]);
        let out = reconcile(
            &[client("AA:BB", "Phone")],
            &mut known,
            &WatchConfig::default(),
        );
        assert_eq!(out, Reconciliation::default());
    }

    #[test]
    fn always_notify_covers_known_devices_but_never_remembers_them() {
        let mut known = KnownIds::from_seed(["AA:BB"]);
        let config = WatchConfig {
            always_notify: true,
            ..WatchConfig::default()
        };
        let out = reconcile(&[client("AA:BB", "Phone")], &mut known, &config);
        assert_eq!(out.notifications.len(), 1);
        assert!(out.newly_known.is_empty());
    }

    #[test]
    fn duplicate_ids_in_one_snapshot_are_remembered_once() {
        let mut known = KnownIds::default();
        let snapshot = [client("AA:BB", "Phone"), client("AA:BB", "Phone")];
        let out = reconcile(&snapshot, &mut known, &WatchConfig::default());
        assert_eq!(out.newly_known.len(), 1);
        assert_eq!(out.notifications.len(), 1);
    }

    #[test]
    fn remember_disabled_notifies_every_pass() {
        let config = WatchConfig {
            remember_new_devices: false,
            ..WatchConfig::default()
        };
        let mut known = KnownIds::default();
        let snapshot = [client("AA:BB", "Phone")];

        let first = reconcile(&snapshot, &mut known, &config);
        let second = reconcile(&snapshot, &mut known, &config);
        assert_eq!(first.notifications.len(), 1);
        assert_eq!(second.notifications.len(), 1);
        assert!(first.newly_known.is_empty());
        assert!(known.is_empty());
    }

    #[test]
    fn empty_snapshot_produces_nothing() {
        let mut known = KnownIds::default();
        let out = reconcile(&[], &mut known, &WatchConfig::default());
        assert_eq!(out, Reconciliation::default());
    }

    #[test]
    fn controller_id_mode_keys_on_alt_id() {
        let config = WatchConfig {
            id_source: IdSource::ControllerId,
            ..WatchConfig::default()
        };
        let mut known = KnownIds::from_seed(["aa:bb"]);
        let record = ClientRecord {
            alt_id: Some("60d0c0ffee".into()),
            ..client("aa:bb", "Phone")
        };
        let out = reconcile(&[record], &mut known, &config);
        assert_eq!(out.newly_known.len(), 1);
        assert_eq!(out.newly_known[0].id, "60d0c0ffee");
    }

    #[test]
    fn notifications_follow_snapshot_order() {
        let mut known = KnownIds::default();
        let snapshot = [client("one", "First"), client("two", "Second")];
        let out = reconcile(&snapshot, &mut known, &WatchConfig::default());
        assert!(out.notifications[0].message.contains("First"));
        assert!(out.notifications[1].message.contains("Second"));
    }
}
