// Query filters: time window + per-system predicate, combined with AND.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chart window; longer windows read the instance's pre-aggregated record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartRange {
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl ChartRange {
    pub fn window(self) -> TimeDelta {
        match self {
            ChartRange::OneHour => TimeDelta::hours(1),
            ChartRange::TwelveHours => TimeDelta::hours(12),
            ChartRange::OneDay => TimeDelta::hours(24),
            ChartRange::OneWeek => TimeDelta::weeks(1),
            ChartRange::ThirtyDays => TimeDelta::days(30),
        }
    }

    /// Record `type` stored by the instance for this window.
    pub fn record_type(self) -> &'static str {
        match self {
            ChartRange::OneHour => "1m",
            ChartRange::TwelveHours => "10m",
            ChartRange::OneDay => "20m",
            ChartRange::OneWeek => "120m",
            ChartRange::ThirtyDays => "480m",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartRange::OneHour => "1h",
            ChartRange::TwelveHours => "12h",
            ChartRange::OneDay => "24h",
            ChartRange::OneWeek => "1w",
            ChartRange::ThirtyDays => "30d",
        }
    }
}

impl FromStr for ChartRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(ChartRange::OneHour),
            "12h" => Ok(ChartRange::TwelveHours),
            "24h" => Ok(ChartRange::OneDay),
            "1w" => Ok(ChartRange::OneWeek),
            "30d" => Ok(ChartRange::ThirtyDays),
            other => anyhow::bail!("unknown chart range {:?}", other),
        }
    }
}

/// Time-range predicate shared by every system in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeFilter {
    pub since: DateTime<Utc>,
    pub record_type: Option<String>,
}

impl TimeFilter {
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since,
            record_type: None,
        }
    }

    pub fn for_range(range: ChartRange, now: DateTime<Utc>) -> Self {
        Self {
            since: now - range.window(),
            record_type: Some(range.record_type().to_string()),
        }
    }

    /// Filter string for one system: `system='<id>' && created > '<since>' [&& type='<t>']`.
    pub fn query_for(&self, system_id: &str) -> RecordQuery {
        let mut clauses = vec![
            system_clause(system_id),
            format!(
                "created > '{}'",
                self.since.format("%Y-%m-%d %H:%M:%S%.3fZ")
            ),
        ];
        if let Some(t) = &self.record_type {
            clauses.push(format!("type='{}'", escape(t)));
        }
        RecordQuery {
            filter: clauses.join(" && "),
        }
    }
}

/// Filter string sent to the record API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: String,
}

impl RecordQuery {
    /// System predicate alone (no time filter).
    pub fn system_only(system_id: &str) -> Self {
        Self {
            filter: system_clause(system_id),
        }
    }
}

fn system_clause(system_id: &str) -> String {
    format!("system='{}'", escape(system_id))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
