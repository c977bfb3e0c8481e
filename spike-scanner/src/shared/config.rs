/// Scanner configuration
///
/// Built from environment variables with per-segment defaults, then refined with
/// the `with_*` builders.
use crate::shared::notifier::DEFAULT_MAX_ALERTS_PER_CYCLE;
use smol_str::SmolStr;
use spike_data::{ApiConfig, DateOption, Segment, SpikeFilters};
use std::{fmt::Display, str::FromStr, time::Duration};
use tracing::warn;

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Base url of the spike API (`SPIKES_API_URL`)
    pub api_url: String,
    /// Initial filter parameters (`SEGMENT`, `VOLUME_THRESHOLD`, `DATE_OPTION`, `SYMBOLS`)
    pub filters: SpikeFilters,
    /// Background poll interval (`POLL_INTERVAL_SECS`)
    pub poll_interval: Duration,
    /// Rows per page (`PAGE_LIMIT`)
    pub page_limit: u32,
    /// Maximum alerts fired per poll (`MAX_ALERTS_PER_CYCLE`)
    pub max_alerts_per_cycle: usize,
    /// How long a toast stays on screen (`TOAST_DURATION_SECS`)
    pub toast_duration: Duration,
    /// Send desktop notifications (`DESKTOP_NOTIFY`)
    pub desktop_notify: bool,
    /// Command used for desktop notifications (`NOTIFY_COMMAND`)
    pub notify_command: String,
    /// Per request HTTP timeout (`REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::for_segment(Segment::Equity)
    }
}

impl ScannerConfig {
    /// Defaults for a segment
    pub fn for_segment(segment: Segment) -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            filters: SpikeFilters::for_segment(segment),
            poll_interval: Duration::from_secs(10),
            page_limit: segment.default_page_limit(),
            max_alerts_per_cycle: DEFAULT_MAX_ALERTS_PER_CYCLE,
            toast_duration: default_toast_duration(segment),
            desktop_notify: true,
            notify_command: "notify-send".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let segment = parse_or(&lookup, "SEGMENT", Segment::Equity);
        let defaults = Self::for_segment(segment);

        let symbols = lookup("SYMBOLS")
            .map(|csv| parse_symbols(&csv))
            .unwrap_or_default();

        let filters = SpikeFilters {
            volume_threshold: parse_or(
                &lookup,
                "VOLUME_THRESHOLD",
                defaults.filters.volume_threshold,
            ),
            date: parse_or(&lookup, "DATE_OPTION", DateOption::Today),
            symbols,
            ..defaults.filters.clone()
        };

        Self {
            api_url: lookup("SPIKES_API_URL").unwrap_or(defaults.api_url),
            filters,
            poll_interval: Duration::from_secs(
                parse_or(&lookup, "POLL_INTERVAL_SECS", 10u64).max(1),
            ),
            page_limit: parse_or(&lookup, "PAGE_LIMIT", defaults.page_limit).max(1),
            max_alerts_per_cycle: parse_or(
                &lookup,
                "MAX_ALERTS_PER_CYCLE",
                defaults.max_alerts_per_cycle,
            )
            .max(1),
            toast_duration: Duration::from_secs(
                parse_or(
                    &lookup,
                    "TOAST_DURATION_SECS",
                    defaults.toast_duration.as_secs(),
                )
                .max(1),
            ),
            desktop_notify: parse_or(&lookup, "DESKTOP_NOTIFY", defaults.desktop_notify),
            notify_command: lookup("NOTIFY_COMMAND").unwrap_or(defaults.notify_command),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    /// Set the API base url
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set maximum alerts per poll, at least 1
    pub fn with_max_alerts_per_cycle(mut self, max: usize) -> Self {
        self.max_alerts_per_cycle = max.max(1);
        self
    }

    /// Set initial filters
    pub fn with_filters(mut self, filters: SpikeFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Client configuration for [`SpikeApiClient`](spike_data::SpikeApiClient)
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.api_url.clone()).with_request_timeout(self.request_timeout)
    }
}

fn default_toast_duration(segment: Segment) -> Duration {
    match segment {
        Segment::Equity => Duration::from_secs(6),
        Segment::Options => Duration::from_secs(5),
    }
}

/// Split a comma separated symbol list, upper-casing and dropping blanks.
pub fn parse_symbols(csv: &str) -> Vec<SmolStr> {
    let mut symbols: Vec<SmolStr> = Vec::new();
    for symbol in csv
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
    {
        if !symbols.iter().any(|existing| existing == symbol.as_str()) {
            symbols.push(SmolStr::new(symbol));
        }
    }
    symbols
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(error) => {
                warn!(key, value = %raw, %error, "invalid config value, using default");
                default
            }
        },
    }
}
