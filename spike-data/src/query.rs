//! Query parameters for `GET /api/spikes`.

use chrono::{DateTime, Days, NaiveTime, SecondsFormat, TimeZone, Utc};
use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};
use smol_str::SmolStr;
use std::str::FromStr;

/// Market segment a spike belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Deserialize, Serialize)]
pub enum Segment {
    #[default]
    #[display("Equity")]
    Equity,
    #[display("Options")]
    Options,
}

impl Segment {
    /// Minimum volume thresholds offered for this segment, ascending.
    pub fn thresholds(&self) -> &'static [u64] {
        match self {
            Segment::Equity => &[50_000, 100_000, 200_000],
            Segment::Options => &[10_000, 20_000, 40_000, 80_000, 100_000],
        }
    }

    pub fn default_threshold(&self) -> u64 {
        match self {
            Segment::Equity => 100_000,
            Segment::Options => 10_000,
        }
    }

    pub fn default_page_limit(&self) -> u32 {
        match self {
            Segment::Equity => 100,
            Segment::Options => 20,
        }
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" => Ok(Segment::Equity),
            "options" => Ok(Segment::Options),
            other => Err(format!("unknown segment: {other}")),
        }
    }
}

/// Field the spike table is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Deserialize, Serialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "timestamp")]
    #[display("timestamp")]
    Timestamp,
    #[serde(rename = "volumeDelta")]
    #[display("volumeDelta")]
    VolumeDelta,
}

impl SortBy {
    pub fn toggle(self) -> Self {
        match self {
            SortBy::Timestamp => SortBy::VolumeDelta,
            SortBy::VolumeDelta => SortBy::Timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Deserialize, Serialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    #[display("asc")]
    Asc,
    #[default]
    #[serde(rename = "desc")]
    #[display("desc")]
    Desc,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Trading day the query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Deserialize, Serialize)]
pub enum DateOption {
    #[default]
    #[serde(rename = "today")]
    #[display("today")]
    Today,
    #[serde(rename = "yesterday")]
    #[display("yesterday")]
    Yesterday,
}

impl DateOption {
    pub fn toggle(self) -> Self {
        match self {
            DateOption::Today => DateOption::Yesterday,
            DateOption::Yesterday => DateOption::Today,
        }
    }

    fn days_ago(&self) -> u64 {
        match self {
            DateOption::Today => 0,
            DateOption::Yesterday => 1,
        }
    }

    /// Local midnight of the selected day, expressed in UTC.
    ///
    /// `now` carries the local timezone the day boundary is taken in.
    pub fn start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        let day = now.date_naive() - Days::new(self.days_ago());
        let midnight = day.and_time(NaiveTime::MIN);

        now.timezone()
            .from_local_datetime(&midnight)
            .earliest()
            .map(|start| start.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

impl FromStr for DateOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DateOption::Today),
            "yesterday" => Ok(DateOption::Yesterday),
            other => Err(format!("unknown date option: {other}")),
        }
    }
}

/// User selectable filter parameters.
///
/// Any change to these counts as a parameter change for notification purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpikeFilters {
    pub segment: Segment,
    pub volume_threshold: u64,
    pub date: DateOption,
    /// Symbol allow-list, empty means every symbol
    pub symbols: Vec<SmolStr>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for SpikeFilters {
    fn default() -> Self {
        Self::for_segment(Segment::default())
    }
}

impl SpikeFilters {
    pub fn for_segment(segment: Segment) -> Self {
        Self {
            segment,
            volume_threshold: segment.default_threshold(),
            date: DateOption::default(),
            symbols: Vec::new(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Query for one page of the table the user is looking at.
    pub fn page_query<Tz: TimeZone>(
        &self,
        page: u32,
        limit: u32,
        now: &DateTime<Tz>,
    ) -> SpikeQuery {
        SpikeQuery {
            segment: self.segment,
            volume: self.volume_threshold,
            from: self.date.start(now),
            page: page.max(1),
            limit,
            symbols: self.symbols.clone(),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }

    /// Query for the freshest spikes: page 1, newest first, whatever the table sort is.
    pub fn latest_query<Tz: TimeZone>(&self, limit: u32, now: &DateTime<Tz>) -> SpikeQuery {
        SpikeQuery {
            sort_by: SortBy::Timestamp,
            sort_order: SortOrder::Desc,
            ..self.page_query(1, limit, now)
        }
    }
}

/// Wire form of the `GET /api/spikes` query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeQuery {
    pub segment: Segment,
    pub volume: u64,
    #[serde(serialize_with = "se_iso_millis")]
    pub from: DateTime<Utc>,
    pub page: u32,
    pub limit: u32,
    #[serde(serialize_with = "se_csv", skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<SmolStr>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl SpikeQuery {
    pub fn to_query_string(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(self)
    }
}

fn se_iso_millis<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn se_csv<S>(symbols: &[SmolStr], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&symbols.iter().join(","))
}
