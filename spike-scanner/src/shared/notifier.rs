/// Spike notifier
///
/// Decides, for every poll of the freshest page, which spikes are new and alerts on them.
///
/// Rules:
/// - A spike's identity is its `(symbol, volume_delta)` pair. Once an identity is in the
///   seen set it is never alerted again for the lifetime of the notifier.
/// - The first cycle of a session and the first cycle after any filter change are
///   suppressed: every returned identity is marked seen and nothing fires.
/// - An active cycle alerts on at most `max_alerts_per_cycle` unseen records, in the
///   order received (freshest first). Only alerted identities are marked seen, so
///   records beyond the cap stay eligible for the next cycle.
use crate::shared::alert::{AlertSink, Sound, SpikeAlert};
use fnv::FnvHashSet;
use spike_data::{SpikeIdentity, SpikeRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default maximum number of alerts fired per poll.
pub const DEFAULT_MAX_ALERTS_PER_CYCLE: usize = 3;

/// What a poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// First cycle after a (re)start or filter change: records absorbed, no alerts
    Suppressed,
    /// Regular cycle: unseen records alerted up to the cap
    Active,
}

/// Outcome of one [`SpikeNotifier::on_poll`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub kind: CycleKind,
    /// Records in the polled page
    pub received: usize,
    /// Unseen records before the cap was applied
    pub unseen: usize,
    /// Identities alerted this cycle, in emission order
    pub alerted: Vec<SpikeIdentity>,
}

impl CycleReport {
    /// Unseen records left for a later cycle because of the cap
    pub fn deferred(&self) -> usize {
        self.unseen.saturating_sub(self.alerted.len())
    }
}

/// Session scoped spike deduplication and alert dispatch.
pub struct SpikeNotifier {
    seen: FnvHashSet<SpikeIdentity>,
    suppress_next_cycle: bool,
    max_alerts_per_cycle: usize,
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl std::fmt::Debug for SpikeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpikeNotifier")
            .field("seen", &self.seen.len())
            .field("suppress_next_cycle", &self.suppress_next_cycle)
            .field("max_alerts_per_cycle", &self.max_alerts_per_cycle)
            .field(
                "sinks",
                &self.sinks.iter().map(|sink| sink.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for SpikeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ALERTS_PER_CYCLE)
    }
}

impl SpikeNotifier {
    /// New notifier with no sinks. The first cycle is suppressed.
    pub fn new(max_alerts_per_cycle: usize) -> Self {
        Self {
            seen: FnvHashSet::default(),
            suppress_next_cycle: true,
            max_alerts_per_cycle,
            sinks: Vec::new(),
        }
    }

    /// Add a sink. Sinks fire in registration order for every alerted spike.
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Arm suppression for the next cycle. Called whenever the filter parameters change.
    pub fn reset_for_new_filters(&mut self) {
        debug!(seen = self.seen.len(), "filters changed, suppressing next cycle");
        self.suppress_next_cycle = true;
    }

    pub fn is_suppressing(&self) -> bool {
        self.suppress_next_cycle
    }

    pub fn has_seen(&self, identity: &SpikeIdentity) -> bool {
        self.seen.contains(identity)
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Unseen records of a poll, in input order, without mutating any state.
    ///
    /// A repeated identity within the same poll is only counted once.
    pub fn unseen<'a>(&self, records: &'a [SpikeRecord]) -> Vec<&'a SpikeRecord> {
        let mut batch = FnvHashSet::default();
        records
            .iter()
            .filter(|record| {
                let identity = record.identity();
                !self.seen.contains(&identity) && batch.insert(identity)
            })
            .collect()
    }

    /// Process one successful poll of the freshest page.
    pub async fn on_poll(&mut self, records: &[SpikeRecord]) -> CycleReport {
        if self.suppress_next_cycle {
            self.seen.extend(records.iter().map(SpikeRecord::identity));
            self.suppress_next_cycle = false;

            debug!(
                received = records.len(),
                seen = self.seen.len(),
                "suppressed cycle absorbed records"
            );

            return CycleReport {
                kind: CycleKind::Suppressed,
                received: records.len(),
                unseen: 0,
                alerted: Vec::new(),
            };
        }

        let unseen = self.unseen(records);
        let unseen_len = unseen.len();
        let mut alerted = Vec::with_capacity(unseen_len.min(self.max_alerts_per_cycle));

        for record in unseen.into_iter().take(self.max_alerts_per_cycle) {
            let alert = SpikeAlert::from(record);
            info!(
                symbol = %record.symbol,
                volume_delta = record.volume_delta,
                "{} {}",
                alert.title,
                alert.body
            );

            self.dispatch(&alert).await;

            let identity = record.identity();
            self.seen.insert(identity.clone());
            alerted.push(identity);
        }

        if unseen_len > alerted.len() {
            debug!(
                deferred = unseen_len - alerted.len(),
                "alert cap reached, remaining spikes deferred to next cycle"
            );
        }

        CycleReport {
            kind: CycleKind::Active,
            received: records.len(),
            unseen: unseen_len,
            alerted,
        }
    }

    async fn dispatch(&self, alert: &SpikeAlert) {
        for sink in &self.sinks {
            if let Err(error) = sink.notify(alert).await {
                warn!(sink = sink.name(), symbol = %alert.symbol, %error, "notification failed");
            }
            if let Err(error) = sink.play(Sound::Chime).await {
                warn!(sink = sink.name(), symbol = %alert.symbol, %error, "sound play failed");
            }
        }
    }
}
