// Multi-entity aggregation: stacked bands, flattened lines, per-entity summaries.
// Domain order drives stacking order and color assignment, so it must be stable.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::models::{
    EntityScalarPoint, EntitySeriesMap, EntitySummary, StackedBand, StackedChart, StatPoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSelector {
    #[default]
    Cpu,
    Memory,
    /// Sent + received; both channels also ride along in each band's `aux`.
    Network,
}

impl MetricSelector {
    pub fn value(self, point: &StatPoint) -> f64 {
        match self {
            MetricSelector::Cpu => point.cpu,
            MetricSelector::Memory => point.memory,
            MetricSelector::Network => point.network.total(),
        }
    }
}

impl FromStr for MetricSelector {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricSelector::Cpu),
            "memory" | "mem" => Ok(MetricSelector::Memory),
            "network" | "net" => Ok(MetricSelector::Network),
            other => Err(AnalyticsError::InvalidParameter {
                name: "metric",
                reason: format!("unknown metric {:?}", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainOrder {
    /// Order in which entities were first observed.
    #[default]
    Observed,
    NameSorted,
}

impl FromStr for DomainOrder {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "observed" => Ok(DomainOrder::Observed),
            "name_sorted" | "name" | "sorted" => Ok(DomainOrder::NameSorted),
            other => Err(AnalyticsError::InvalidParameter {
                name: "order",
                reason: format!("unknown domain order {:?}", other),
            }),
        }
    }
}

/// Distinct entity names in the requested order.
pub fn domain(series: &EntitySeriesMap, order: DomainOrder) -> Vec<String> {
    let mut names: Vec<String> = series.names().map(str::to_string).collect();
    if order == DomainOrder::NameSorted {
        names.sort();
    }
    names
}

/// Points of every entity grouped by exact timestamp; each group lists
/// (domain index, point) in domain order, then series order.
fn group_by_timestamp<'a>(
    series: &'a EntitySeriesMap,
    domain: &[String],
) -> BTreeMap<DateTime<Utc>, Vec<(usize, &'a StatPoint)>> {
    let mut by_ts: BTreeMap<DateTime<Utc>, Vec<(usize, &StatPoint)>> = BTreeMap::new();
    for (idx, name) in domain.iter().enumerate() {
        let Some(s) = series.get(name) else {
            continue;
        };
        for p in &s.points {
            by_ts.entry(p.timestamp).or_default().push((idx, p));
        }
    }
    by_ts
}

/// Stack all entities per timestamp.
///
/// Entities absent at a timestamp produce no band and do not advance the running sum,
/// so the first present entity always starts at zero.
pub fn stack(series: &EntitySeriesMap, metric: MetricSelector, order: DomainOrder) -> StackedChart {
    let domain = domain(series, order);
    let grouped = group_by_timestamp(series, &domain);

    let mut bands = Vec::new();
    for (timestamp, entries) in grouped {
        let mut running = 0.0;
        for (idx, point) in entries {
            let value = metric.value(point);
            bands.push(StackedBand {
                timestamp,
                entity_name: domain[idx].clone(),
                y_start: running,
                y_end: running + value,
                aux: point.network,
            });
            running += value;
        }
    }
    StackedChart { domain, bands }
}

/// One scalar per (entity, point), ordered by timestamp then domain.
pub fn flatten(
    series: &EntitySeriesMap,
    metric: MetricSelector,
    order: DomainOrder,
) -> Vec<EntityScalarPoint> {
    let domain = domain(series, order);
    group_by_timestamp(series, &domain)
        .into_iter()
        .flat_map(|(timestamp, entries)| {
            let domain = &domain;
            entries.into_iter().map(move |(idx, point)| EntityScalarPoint {
                timestamp,
                entity_name: domain[idx].clone(),
                value: metric.value(point),
            })
        })
        .collect()
}

/// Latest / average / peak per entity, name-sorted. Entities without points are skipped.
pub fn summarize(series: &EntitySeriesMap, metric: MetricSelector) -> Vec<EntitySummary> {
    let mut out: Vec<EntitySummary> = series
        .iter()
        .filter_map(|s| {
            let last = s.points.last()?;
            let values: Vec<f64> = s.points.iter().map(|p| metric.value(p)).collect();
            Some(EntitySummary {
                entity_name: s.entity_name.clone(),
                latest: metric.value(last),
                average: values.iter().sum::<f64>() / values.len() as f64,
                peak: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        })
        .collect();
    out.sort_by(|a, b| a.entity_name.cmp(&b.entity_name));
    out
}

/// (entity, timestamp) -> band lookup for detail views. First band wins; later duplicates
/// are counted and logged.
#[derive(Debug, Default)]
pub struct BandIndex<'a> {
    by_entity: HashMap<&'a str, HashMap<DateTime<Utc>, &'a StackedBand>>,
    len: usize,
    duplicates: usize,
}

impl<'a> BandIndex<'a> {
    pub fn build(bands: &'a [StackedBand]) -> Self {
        let mut by_entity: HashMap<&'a str, HashMap<DateTime<Utc>, &'a StackedBand>> =
            HashMap::new();
        let mut len = 0;
        let mut duplicates = 0;
        for band in bands {
            let slot = by_entity.entry(band.entity_name.as_str()).or_default();
            if slot.contains_key(&band.timestamp) {
                duplicates += 1;
                continue;
            }
            slot.insert(band.timestamp, band);
            len += 1;
        }
        if duplicates > 0 {
            tracing::warn!(
                duplicates,
                operation = "band_index",
                "duplicate entity/timestamp bands; keeping first"
            );
        }
        Self {
            by_entity,
            len,
            duplicates,
        }
    }

    pub fn get(&self, entity_name: &str, timestamp: DateTime<Utc>) -> Option<&'a StackedBand> {
        self.by_entity
            .get(entity_name)
            .and_then(|slot| slot.get(&timestamp))
            .copied()
    }

    /// Value of one entity at one timestamp; `None` means no data, not zero.
    pub fn value(&self, entity_name: &str, timestamp: DateTime<Utc>) -> Option<f64> {
        self.get(entity_name, timestamp).map(StackedBand::height)
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
