// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fleetcharts::error::SourceError;
use fleetcharts::fetch::{RecordQuery, StatsSource};
use fleetcharts::models::*;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Fixed base time plus `secs`.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::TimeDelta::seconds(secs)
}

/// Record API timestamp string for `ts(secs)`.
pub fn created(secs: i64) -> String {
    ts(secs).format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

pub fn point(secs: i64, cpu: f64, memory: f64) -> StatPoint {
    StatPoint::new(ts(secs), cpu, memory)
}

pub fn host_record(id: &str, secs: i64, cpu: f64, mp: f64) -> RawHostRecord {
    RawHostRecord {
        id: id.into(),
        created: created(secs),
        stats: serde_json::json!({ "cpu": cpu, "mp": mp, "mu": 1.5, "ns": 0.25, "nr": 0.5 }),
    }
}

pub fn entity_record(id: &str, secs: i64, entries: &[(&str, f64, f64)]) -> RawEntityRecord {
    let stats: Vec<serde_json::Value> = entries
        .iter()
        .map(|(n, c, m)| serde_json::json!({ "n": n, "c": c, "m": m }))
        .collect();
    RawEntityRecord {
        id: id.into(),
        created: created(secs),
        stats: serde_json::Value::Array(stats),
    }
}

pub fn series(name: &str, points: Vec<StatPoint>) -> EntityTimeSeries {
    EntityTimeSeries {
        entity_name: name.into(),
        points,
    }
}

/// Canned responses for one system.
#[derive(Clone)]
pub struct MockSystem {
    pub host: Result<Vec<RawHostRecord>, SourceError>,
    pub entities: Result<Vec<RawEntityRecord>, SourceError>,
    pub host_delay: Option<Duration>,
}

impl MockSystem {
    pub fn healthy(secs: i64) -> Self {
        Self {
            host: Ok(vec![host_record("h1", secs, 10.0, 40.0)]),
            entities: Ok(vec![entity_record("e1", secs, &[("nginx", 1.0, 64.0)])]),
            host_delay: None,
        }
    }
}

/// In-memory StatsSource; records every query it receives.
#[derive(Default)]
pub struct MockSource {
    pub systems: HashMap<String, MockSystem>,
    pub queries: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn with(mut self, id: &str, system: MockSystem) -> Self {
        self.systems.insert(id.into(), system);
        self
    }

    fn system(&self, id: &str) -> Result<&MockSystem, SourceError> {
        self.systems
            .get(id)
            .ok_or_else(|| SourceError::Status {
                status: 404,
                body: format!("unknown system {}", id),
            })
    }
}

#[async_trait]
impl StatsSource for MockSource {
    async fn fetch_host_records(
        &self,
        system: &SystemRef,
        query: &RecordQuery,
    ) -> Result<Vec<RawHostRecord>, SourceError> {
        self.queries.lock().unwrap().push(query.filter.clone());
        let s = self.system(&system.id)?;
        if let Some(delay) = s.host_delay {
            tokio::time::sleep(delay).await;
        }
        s.host.clone()
    }

    async fn fetch_entity_records(
        &self,
        system: &SystemRef,
        _query: &RecordQuery,
    ) -> Result<Vec<RawEntityRecord>, SourceError> {
        self.system(&system.id)?.entities.clone()
    }
}
