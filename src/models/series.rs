// Typed time-series points and chart-ready shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sent/received pair carried alongside the primary metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPair {
    pub sent: f64,
    pub received: f64,
}

impl NetworkPair {
    pub fn total(&self) -> f64 {
        self.sent + self.received
    }
}

/// One sample of a single entity (host or container).
/// Values are passed through in the instance's units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatPoint {
    pub timestamp: DateTime<Utc>,
    pub cpu: f64,
    pub memory: f64,
    #[serde(default)]
    pub network: NetworkPair,
}

impl StatPoint {
    pub fn new(timestamp: DateTime<Utc>, cpu: f64, memory: f64) -> Self {
        Self {
            timestamp,
            cpu,
            memory,
            network: NetworkPair::default(),
        }
    }

    pub fn with_network(mut self, sent: f64, received: f64) -> Self {
        self.network = NetworkPair { sent, received };
        self
    }
}

/// One host-level sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDataPoint {
    pub timestamp: DateTime<Utc>,
    pub cpu: f64,
    pub memory_percent: f64,
    pub memory_used: f64,
    pub disk_used: f64,
    pub disk_percent: f64,
    pub network: NetworkPair,
    /// Sensor readings ordered by sensor name; the sensor set may vary per sample.
    pub temperatures: Vec<(String, f64)>,
}

impl SystemDataPoint {
    /// Project onto the CPU / memory-percent / network channels.
    pub fn stat_point(&self) -> StatPoint {
        StatPoint {
            timestamp: self.timestamp,
            cpu: self.cpu,
            memory: self.memory_percent,
            network: self.network,
        }
    }

    pub fn hottest_sensor(&self) -> Option<(&str, f64)> {
        self.temperatures
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, c)| (name.as_str(), *c))
    }
}

/// All points observed for one container within the query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTimeSeries {
    pub entity_name: String,
    pub points: Vec<StatPoint>,
}

/// Entity series for one system, unique by name, in first-observed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySeriesMap {
    series: Vec<EntityTimeSeries>,
}

impl EntitySeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the series with the same name, keeping its original position.
    pub fn insert(&mut self, series: EntityTimeSeries) {
        match self
            .series
            .iter_mut()
            .find(|s| s.entity_name == series.entity_name)
        {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EntityTimeSeries> {
        self.series.iter().find(|s| s.entity_name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.entity_name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityTimeSeries> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<EntityTimeSeries> for EntitySeriesMap {
    fn from_iter<I: IntoIterator<Item = EntityTimeSeries>>(iter: I) -> Self {
        let mut map = EntitySeriesMap::new();
        for s in iter {
            map.insert(s);
        }
        map
    }
}

impl<'a> IntoIterator for &'a EntitySeriesMap {
    type Item = &'a EntityTimeSeries;
    type IntoIter = std::slice::Iter<'a, EntityTimeSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}

/// One entity's vertical slice of a stacked-area chart at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackedBand {
    pub timestamp: DateTime<Utc>,
    pub entity_name: String,
    pub y_start: f64,
    pub y_end: f64,
    /// Un-stacked network channels of the underlying point.
    pub aux: NetworkPair,
}

impl StackedBand {
    pub fn height(&self) -> f64 {
        self.y_end - self.y_start
    }
}

/// Stacked chart: domain order drives both stacking order and color assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackedChart {
    pub domain: Vec<String>,
    pub bands: Vec<StackedBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityScalarPoint {
    pub timestamp: DateTime<Utc>,
    pub entity_name: String,
    pub value: f64,
}

/// Per-entity scalar aggregate for summary tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub entity_name: String,
    pub latest: f64,
    pub average: f64,
    pub peak: f64,
}
