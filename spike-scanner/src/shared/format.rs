/// Display formatting for spike figures
///
/// Volumes and trade values are shown with thousands separators; prices with two decimals.
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

/// Format a volume with thousands separators and at most three fraction digits.
///
/// `500000.0` -> `"500,000"`, `1234.5` -> `"1,234.5"`
pub fn format_volume(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Format `volume_delta × open_price` as a rounded rupee amount, e.g. `"₹ 1,490,500"`.
pub fn format_trade_value(value: f64) -> String {
    if !value.is_finite() {
        return format!("₹ {}", value);
    }
    let rounded = format!("{:.0}", value.abs().round());
    let sign = if value <= -0.5 { "-" } else { "" };
    format!("₹ {}{}", sign, group_thousands(&rounded))
}

/// Last traded price with two decimals.
pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

/// Wall clock time of a spike in the provided timezone, `HH:MM:SS`.
pub fn format_clock<Tz>(time: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.with_timezone(tz).format("%H:%M:%S").to_string()
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Colour band of a spike's volume delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTier {
    /// Above 500K
    High,
    /// Above 300K
    Elevated,
    /// Any positive delta
    Normal,
    /// Zero or invalid
    None,
}

impl VolumeTier {
    pub fn classify(volume_delta: f64) -> Self {
        if !volume_delta.is_finite() || volume_delta <= 0.0 {
            VolumeTier::None
        } else if volume_delta > 500_000.0 {
            VolumeTier::High
        } else if volume_delta > 300_000.0 {
            VolumeTier::Elevated
        } else {
            VolumeTier::Normal
        }
    }
}
