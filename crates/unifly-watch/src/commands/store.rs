//! Read-only views over the device store: `devices` and `events`.

use chrono::{DateTime, Local, Utc};
use tabled::Tabled;

use unifly_watch_core::{DeviceEvent, DeviceStore, KnownDevice};

use crate::cli::{EventsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hostname")]
    host: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&KnownDevice> for DeviceRow {
    fn from(d: &KnownDevice) -> Self {
        Self {
            id: d.id.clone(),
            name: d.display_name.clone(),
            host: d.host_name.clone(),
            status: d
                .last_seen_absent
                .map_or_else(|| "present".into(), |t| format!("absent since {}", local(t))),
        }
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Event")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hostname")]
    host: String,
}

impl From<&DeviceEvent> for EventRow {
    fn from(e: &DeviceEvent) -> Self {
        Self {
            time: local(e.occurred_at),
            kind: e.kind.to_string(),
            id: e.device_id.clone(),
            name: e.display_name.clone(),
            host: e.host_name.clone(),
        }
    }
}

fn local(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn devices(global: &GlobalOpts) -> Result<(), CliError> {
    let store = open_existing(global)?;
    let devices = store.known_devices()?;
    let out = output::render_list(
        global.output,
        &devices,
        |d| DeviceRow::from(d),
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn events(args: &EventsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = open_existing(global)?;
    let limit = (args.limit > 0).then_some(args.limit);
    let events = store.events(limit)?;
    let out = output::render_list(
        global.output,
        &events,
        |e| EventRow::from(e),
        |e| format!("{}\t{}", e.kind, e.device_id),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Open the store without creating it; inspection never writes a new file.
fn open_existing(global: &GlobalOpts) -> Result<DeviceStore, CliError> {
    let (config, _) = super::load(global)?;
    let path = super::database_path(global, &config);
    if !path.exists() {
        return Err(CliError::NoDatabase {
            path: path.display().to_string(),
        });
    }
    Ok(DeviceStore::open(&path)?)
}
