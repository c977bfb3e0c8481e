//! Fakes shared by unit tests.

use crate::shared::alert::{AlertError, AlertSink, Sound, SpikeAlert};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use smol_str::SmolStr;
use spike_data::{DataError, SpikeQuery, SpikeRecord, SpikeSource, SpikesPage};
use std::collections::VecDeque;

/// Records, freshest first, one second apart.
pub fn spikes(input: &[(&str, f64)]) -> Vec<SpikeRecord> {
    let base = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
    input
        .iter()
        .enumerate()
        .map(|(index, (symbol, volume_delta))| SpikeRecord {
            symbol: SmolStr::new(symbol),
            volume_delta: *volume_delta,
            timestamp: base - Duration::seconds(index as i64),
            ltp: 100.0,
            open_price_of_candle: 100.0,
        })
        .collect()
}

pub fn page(input: &[(&str, f64)]) -> SpikesPage {
    let spikes = spikes(input);
    SpikesPage {
        total: spikes.len() as u64,
        spikes,
        last_updated: None,
    }
}

/// [`AlertSink`] that remembers every alert as `"SYMBOL:volume"`.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notified: Mutex<Vec<String>>,
    played: Mutex<usize>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().clone()
    }

    pub fn played(&self) -> usize {
        *self.played.lock()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, alert: &SpikeAlert) -> Result<(), AlertError> {
        self.notified
            .lock()
            .push(format!("{}:{}", alert.symbol, alert.volume_delta));
        if self.fail {
            Err(AlertError::PermissionDenied("denied".to_string()))
        } else {
            Ok(())
        }
    }

    async fn play(&self, _sound: Sound) -> Result<(), AlertError> {
        *self.played.lock() += 1;
        if self.fail {
            Err(AlertError::Sound("blocked".to_string()))
        } else {
            Ok(())
        }
    }
}

/// [`SpikeSource`] answering polls from a script, then with empty pages.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<SpikesPage, DataError>>>,
    queries: Mutex<Vec<SpikeQuery>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<SpikesPage, DataError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<SpikeQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SpikeSource for ScriptedSource {
    async fn fetch_spikes(&self, query: &SpikeQuery) -> Result<SpikesPage, DataError> {
        self.queries.lock().push(query.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SpikesPage::default()))
    }

    async fn fetch_symbols(&self) -> Result<Vec<SmolStr>, DataError> {
        Ok(Vec::new())
    }
}
