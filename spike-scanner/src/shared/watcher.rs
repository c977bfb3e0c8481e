/// Background spike watcher
///
/// Owns a [`SpikeNotifier`] and polls page 1 (newest first) of the current filters on a
/// fixed interval, independent of whatever page a UI is displaying. Ticks and filter
/// updates are handled one at a time on the same task, so poll cycles never overlap.
use crate::shared::{
    config::ScannerConfig,
    notifier::{CycleReport, SpikeNotifier},
};
use chrono::{DateTime, Local, Utc};
use spike_data::{DataError, SpikeFilters, SpikeSource, SpikesPage};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Interval between polls of the freshest page
    pub poll_interval: Duration,
    /// Rows requested per poll
    pub page_limit: u32,
    /// Maximum buffered updates before the watcher waits on its consumer
    pub channel_buffer_size: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            page_limit: 100,
            channel_buffer_size: 64,
        }
    }
}

impl From<&ScannerConfig> for WatcherConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            page_limit: config.page_limit,
            ..Default::default()
        }
    }
}

/// Commands accepted by a running watcher
#[derive(Debug, Clone, PartialEq)]
pub enum WatchCommand {
    /// New filter parameters: the next cycle is suppressed and runs immediately
    UpdateFilters(SpikeFilters),
    Shutdown,
}

/// Outcome of each poll, streamed to the consumer
#[derive(Debug, Clone)]
pub enum WatchUpdate {
    Cycle {
        page: SpikesPage,
        report: CycleReport,
        at: DateTime<Utc>,
    },
    PollFailed {
        error: DataError,
        at: DateTime<Utc>,
    },
}

/// Handle to a spawned watcher task
#[derive(Debug)]
pub struct WatcherHandle {
    command_tx: mpsc::Sender<WatchCommand>,
    task: JoinHandle<SpikeNotifier>,
}

impl WatcherHandle {
    /// Send new filter parameters. Returns false if the watcher has stopped.
    pub async fn update_filters(&self, filters: SpikeFilters) -> bool {
        self.command_tx
            .send(WatchCommand::UpdateFilters(filters))
            .await
            .is_ok()
    }

    /// Stop polling and hand back the notifier with its seen set.
    pub async fn shutdown(self) -> Option<SpikeNotifier> {
        let _ = self.command_tx.send(WatchCommand::Shutdown).await;
        match self.task.await {
            Ok(notifier) => Some(notifier),
            Err(error) => {
                warn!(%error, "spike watcher task failed");
                None
            }
        }
    }
}

/// Spawn the watcher task.
///
/// Returns a handle for filter updates and teardown, and a receiver of poll updates.
pub fn spawn_watcher<S>(
    source: Arc<S>,
    notifier: SpikeNotifier,
    filters: SpikeFilters,
    config: WatcherConfig,
) -> (WatcherHandle, mpsc::Receiver<WatchUpdate>)
where
    S: SpikeSource + ?Sized + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(16);
    let (update_tx, update_rx) = mpsc::channel(config.channel_buffer_size.max(1));

    let task = tokio::spawn(run_watch_loop(
        source, notifier, filters, config, command_rx, update_tx,
    ));

    (WatcherHandle { command_tx, task }, update_rx)
}

/// Main poll loop. Ends on shutdown, when every handle is dropped, or when the
/// update receiver is dropped.
async fn run_watch_loop<S>(
    source: Arc<S>,
    mut notifier: SpikeNotifier,
    mut filters: SpikeFilters,
    config: WatcherConfig,
    mut command_rx: mpsc::Receiver<WatchCommand>,
    update_tx: mpsc::Sender<WatchUpdate>,
) -> SpikeNotifier
where
    S: SpikeSource + ?Sized + 'static,
{
    info!(
        "Starting spike watcher for {} spikes >= {}, polling every {:?}",
        filters.segment, filters.volume_threshold, config.poll_interval
    );

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(WatchCommand::UpdateFilters(next)) => {
                    if next != filters {
                        debug!(?next, "watcher filters updated");
                        filters = next;
                        notifier.reset_for_new_filters();
                        ticker.reset_immediately();
                    }
                }
                Some(WatchCommand::Shutdown) | None => {
                    info!("Spike watcher shutting down");
                    break;
                }
            },
            _ = ticker.tick() => {
                let query = filters.latest_query(config.page_limit, &Local::now());

                let update = match source.fetch_spikes(&query).await {
                    Ok(page) => {
                        let report = notifier.on_poll(&page.spikes).await;
                        debug!(
                            kind = ?report.kind,
                            received = report.received,
                            alerted = report.alerted.len(),
                            "poll cycle complete"
                        );
                        WatchUpdate::Cycle { page, report, at: Utc::now() }
                    }
                    Err(error) => {
                        warn!(%error, "spike poll failed, waiting for next tick");
                        WatchUpdate::PollFailed { error, at: Utc::now() }
                    }
                };

                if update_tx.send(update).await.is_err() {
                    warn!("Update receiver dropped, stopping watcher");
                    break;
                }
            }
        }
    }

    notifier
}
