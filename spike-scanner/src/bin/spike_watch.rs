/// Headless spike watcher
///
/// Polls the freshest spikes for the configured filters and raises desktop alerts
/// for newly detected ones. Runs until Ctrl-C.
use std::{error::Error, sync::Arc};

use spike_data::SpikeApiClient;
use spike_scanner::{
    init_logging, spawn_watcher, AlertSink, CycleKind, DesktopSink, ScannerConfig, SpikeNotifier,
    WatchUpdate, WatcherConfig,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let config = ScannerConfig::from_env();
    info!(
        api_url = %config.api_url,
        segment = %config.filters.segment,
        threshold = config.filters.volume_threshold,
        date = %config.filters.date,
        "Starting spike-watch"
    );

    let client = Arc::new(SpikeApiClient::new(config.api_config())?);

    let desktop =
        DesktopSink::new(config.notify_command.clone()).with_enabled(config.desktop_notify);
    if !config.desktop_notify {
        warn!("Desktop notifications disabled, alerts will only be logged");
    }
    let notifier = SpikeNotifier::new(config.max_alerts_per_cycle)
        .with_sink(Arc::new(desktop) as Arc<dyn AlertSink>);

    let (watcher, mut updates) = spawn_watcher(
        client,
        notifier,
        config.filters.clone(),
        WatcherConfig::from(&config),
    );

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(WatchUpdate::Cycle { page, report, .. }) => match report.kind {
                    CycleKind::Suppressed => info!(
                        received = report.received,
                        total = page.total,
                        "Baseline captured, alerting from next poll"
                    ),
                    CycleKind::Active if !report.alerted.is_empty() => info!(
                        alerted = report.alerted.len(),
                        deferred = report.deferred(),
                        "New spikes detected"
                    ),
                    CycleKind::Active => {}
                },
                Some(WatchUpdate::PollFailed { error, .. }) => {
                    warn!(%error, "Poll failed");
                }
                None => {
                    error!("Spike watcher stopped unexpectedly");
                    break;
                }
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    error!(%error, "Failed to listen for Ctrl-C");
                }
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    if let Some(notifier) = watcher.shutdown().await {
        info!(seen = notifier.seen_len(), "Spike watcher stopped");
    }

    Ok(())
}
