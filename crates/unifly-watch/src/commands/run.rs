//! `run`: build the watcher from config and drive it until interrupted.

use tracing::{info, warn};

use unifly_watch_core::{CycleOutcome, DeviceStore, HttpNotifier, UnifiSource, Watcher};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (config, path) = super::load(global)?;
    let config_err = |e| CliError::config(e, &path);
    let watch = config.watch_config().map_err(config_err)?;
    let notify = config.notify_config().map_err(config_err)?;
    let controller = config.controller_config().map_err(config_err)?;

    let db_path = super::database_path(global, &config);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let store = DeviceStore::open(&db_path)?;

    info!(
        controller = %controller.url,
        site = %controller.site,
        database = %db_path.display(),
        interval_secs = watch.poll_interval.as_secs(),
        "starting watcher"
    );

    let source = UnifiSource::new(controller);
    let notifier = HttpNotifier::new(&notify)?;
    let mut watcher = Watcher::new(watch, source, notifier, store)?;

    if args.once {
        watcher.connect().await?;
        let outcome = watcher.run_cycle().await?;
        watcher.shutdown().await;
        return match outcome {
            CycleOutcome::Reconciled { .. } | CycleOutcome::NoDevices => {
                info!(?outcome, "cycle complete");
                Ok(())
            }
            CycleOutcome::Recovered | CycleOutcome::Failed => Err(CliError::Watch {
                message: "the watch cycle did not complete; see the log for details".into(),
            }),
        };
    }

    let result = tokio::select! {
        result = watcher.run() => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("interrupted, shutting down");
            Ok(())
        }
    };

    watcher.shutdown().await;
    result.map_err(CliError::from)
}
