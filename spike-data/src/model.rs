//! Records returned by the spike API.
//!
//! These types match the JSON bodies served by `GET /api/spikes` and
//! `GET /api/symbols`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// A single volume spike as reported by the upstream scanner.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpikeRecord {
    /// Traded instrument (e.g. "RELIANCE", "NIFTY24JUN22500CE")
    pub symbol: SmolStr,
    /// Magnitude of the volume change that triggered the spike
    #[serde(rename = "volumeDelta")]
    pub volume_delta: f64,
    /// When the upstream source recorded the spike
    pub timestamp: DateTime<Utc>,
    /// Last traded price
    #[serde(default)]
    pub ltp: f64,
    /// Open price of the candle the spike was detected in
    #[serde(rename = "openPriceofCandle", default)]
    pub open_price_of_candle: f64,
}

impl SpikeRecord {
    /// Deduplication key of this record.
    pub fn identity(&self) -> SpikeIdentity {
        SpikeIdentity::new(self.symbol.clone(), self.volume_delta)
    }

    /// Traded value of the spike: `volume_delta × open_price_of_candle`.
    pub fn trade_value(&self) -> f64 {
        self.volume_delta * self.open_price_of_candle
    }
}

/// Identity of a notifiable spike event: the exact `(symbol, volume_delta)` pair.
///
/// Two records with the same symbol but different volume deltas are distinct
/// events. Timestamps play no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpikeIdentity {
    symbol: SmolStr,
    volume_bits: u64,
}

impl SpikeIdentity {
    pub fn new(symbol: impl Into<SmolStr>, volume_delta: f64) -> Self {
        // -0.0 and 0.0 compare equal, so they must share a key
        let normalised = if volume_delta == 0.0 { 0.0 } else { volume_delta };
        Self {
            symbol: symbol.into(),
            volume_bits: normalised.to_bits(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn volume_delta(&self) -> f64 {
        f64::from_bits(self.volume_bits)
    }
}

impl fmt::Display for SpikeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.volume_delta())
    }
}

/// One page of spikes plus the total number matching the query.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SpikesPage {
    pub spikes: Vec<SpikeRecord>,
    #[serde(default)]
    pub total: u64,
    /// Server side refresh time, when provided
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Response body of `GET /api/symbols`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SymbolsResponse {
    pub symbols: Vec<SmolStr>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_spikes_page_de() {
        struct TestCase {
            input: &'static str,
            expected: Option<SpikesPage>,
        }

        let tests = vec![
            // TC0: input SpikesPage is deserialised
            TestCase {
                input: r#"
                    {
                        "spikes": [
                            {
                                "symbol": "AAPL",
                                "volumeDelta": 500000,
                                "timestamp": "2025-06-02T09:15:30.000Z",
                                "ltp": 195.25,
                                "openPriceofCandle": 194.5
                            }
                        ],
                        "total": 41
                    }
                "#,
                expected: Some(SpikesPage {
                    spikes: vec![SpikeRecord {
                        symbol: SmolStr::new("AAPL"),
                        volume_delta: 500000.0,
                        timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 9, 15, 30).unwrap(),
                        ltp: 195.25,
                        open_price_of_candle: 194.5,
                    }],
                    total: 41,
                    last_updated: None,
                }),
            },
            // TC1: input SpikesPage w/ lastUpdated and missing display fields is deserialised
            TestCase {
                input: r#"
                    {
                        "spikes": [
                            {
                                "symbol": "MSFT",
                                "volumeDelta": 300000.5,
                                "timestamp": "2025-06-02T09:16:00Z"
                            }
                        ],
                        "total": 1,
                        "lastUpdated": "2025-06-02T09:16:05Z"
                    }
                "#,
                expected: Some(SpikesPage {
                    spikes: vec![SpikeRecord {
                        symbol: SmolStr::new("MSFT"),
                        volume_delta: 300000.5,
                        timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 9, 16, 0).unwrap(),
                        ltp: 0.0,
                        open_price_of_candle: 0.0,
                    }],
                    total: 1,
                    last_updated: Some(Utc.with_ymd_and_hms(2025, 6, 2, 9, 16, 5).unwrap()),
                }),
            },
            // TC2: input SpikesPage w/ a record missing volumeDelta is unable to be deserialised
            TestCase {
                input: r#"
                    {
                        "spikes": [
                            { "symbol": "GOOG", "timestamp": "2025-06-02T09:16:00Z" }
                        ],
                        "total": 1
                    }
                "#,
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = serde_json::from_str::<SpikesPage>(test.input).ok();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_spike_identity() {
        let a = SpikeIdentity::new("AAPL", 500000.0);
        let b = SpikeIdentity::new("AAPL", 500000.0);
        let c = SpikeIdentity::new("AAPL", 500001.0);
        let d = SpikeIdentity::new("MSFT", 500000.0);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(SpikeIdentity::new("X", 0.0), SpikeIdentity::new("X", -0.0));
        assert_eq!(a.to_string(), "AAPL:500000");
        assert_eq!(a.symbol(), "AAPL");
        assert_eq!(a.volume_delta(), 500000.0);
    }

    #[test]
    fn test_trade_value() {
        let record = SpikeRecord {
            symbol: SmolStr::new("INFY"),
            volume_delta: 1_000.0,
            timestamp: Utc::now(),
            ltp: 1_500.0,
            open_price_of_candle: 1_490.5,
        };

        assert_eq!(record.trade_value(), 1_490_500.0);
        assert_eq!(record.identity(), SpikeIdentity::new("INFY", 1_000.0));
    }
}
