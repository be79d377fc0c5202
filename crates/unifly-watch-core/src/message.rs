// ── Notification text ──
//
// Telegram messages are sent with `parse_mode = HTML`, so anything
// interpolated into them is escaped. ntfy gets plain text.

use std::fmt::Write as _;

use crate::config::NotificationService;
use crate::model::{ClientRecord, KnownDevice};

/// Describe a connected client.
pub fn device_seen(record: &ClientRecord, channel: NotificationService) -> String {
    let mut out = header(channel, "Device seen on network:");
    let fields = [
        ("Device Name", record.display_name()),
        ("IP Address", record.ip()),
        ("Hostname", record.host_name()),
        ("MAC Address", record.id.as_str()),
        ("Connection Type", record.connection_label()),
        ("Network", record.network()),
    ];
    for (label, value) in fields {
        let _ = write!(out, "\n{label}: {}", escape(channel, value));
    }
    out
}

/// Announce a device deleted from the store after its grace period.
pub fn device_removed(device: &KnownDevice, channel: NotificationService) -> String {
    let mut out = header(channel, "Device removed from known devices:");
    let _ = write!(
        out,
        "\nDevice Name: {}\nHostname: {}\nID: {}",
        escape(channel, &device.display_name),
        escape(channel, &device.host_name),
        escape(channel, &device.id),
    );
    out
}

/// Report an operational error.
pub fn watcher_error(context: &str, detail: &str, channel: NotificationService) -> String {
    let mut out = header(channel, "unifly-watch error:");
    let _ = write!(
        out,
        "\n{}\n{}",
        escape(channel, context),
        escape(channel, detail)
    );
    out
}

fn header(channel: NotificationService, text: &str) -> String {
    match channel {
        NotificationService::Telegram => format!("<b>{text}</b>"),
        NotificationService::Ntfy => text.to_owned(),
    }
}

fn escape(channel: NotificationService, value: &str) -> String {
    match channel {
        NotificationService::Telegram => value
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
        NotificationService::Ntfy => value.to_owned(),
    }
}
