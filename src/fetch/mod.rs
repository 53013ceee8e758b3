// Fetch orchestration: one task per selected system, two concurrent sub-fetches per task.
// A failing system is captured as data; only an all-failed cycle is an error.

mod cycle;
mod filter;

pub use cycle::{CycleTicket, CycleTracker};
pub use filter::{ChartRange, RecordQuery, TimeFilter};

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{FetchError, SourceError, SystemFetchError};
use crate::models::{EntitySeriesMap, RawEntityRecord, RawHostRecord, SystemDataPoint, SystemRef};
use crate::transform::{transform_entities, transform_host};

/// The record API seam. Implemented over HTTP by `client::HttpStatsSource` and by mocks in tests.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_host_records(
        &self,
        system: &SystemRef,
        query: &RecordQuery,
    ) -> Result<Vec<RawHostRecord>, SourceError>;

    async fn fetch_entity_records(
        &self,
        system: &SystemRef,
        query: &RecordQuery,
    ) -> Result<Vec<RawEntityRecord>, SourceError>;
}

/// Merged result of one fetch cycle.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub host_series: HashMap<String, Vec<SystemDataPoint>>,
    pub entity_series: HashMap<String, EntitySeriesMap>,
    pub errors: Vec<SystemFetchError>,
    /// Records dropped as malformed across all systems.
    pub dropped_records: usize,
}

impl FetchOutcome {
    pub fn failed_system_ids(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.system_id.as_str())
    }
}

struct SystemResult {
    host: Vec<SystemDataPoint>,
    entities: EntitySeriesMap,
    dropped: usize,
}

pub struct FetchOrchestrator {
    source: Arc<dyn StatsSource>,
    request_timeout: Option<Duration>,
}

impl FetchOrchestrator {
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        Self {
            source,
            request_timeout: None,
        }
    }

    /// Bound each sub-fetch; a timeout counts as that system's failure.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Fetch and transform host + entity series for every system concurrently.
    #[instrument(skip_all, fields(systems = systems.len()))]
    pub async fn fetch(
        &self,
        systems: &[SystemRef],
        time_filter: Option<&TimeFilter>,
    ) -> Result<FetchOutcome, FetchError> {
        let mut outcome = FetchOutcome::default();
        if systems.is_empty() {
            debug!("no systems selected");
            return Ok(outcome);
        }

        let mut tasks = JoinSet::new();
        let mut task_systems = HashMap::with_capacity(systems.len());
        for system in systems {
            let query = match time_filter {
                Some(f) => f.query_for(&system.id),
                None => RecordQuery::system_only(&system.id),
            };
            let source = self.source.clone();
            let system = system.clone();
            let timeout = self.request_timeout;
            let system_id = system.id.clone();
            let handle = tasks.spawn(async move {
                let result = fetch_system(source.as_ref(), &system, &query, timeout).await;
                (system.id, result)
            });
            task_systems.insert(handle.id(), system_id);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (system_id, result) = match joined {
                Ok((_, pair)) => pair,
                Err(e) => {
                    let system_id = task_systems.remove(&e.id()).unwrap_or_default();
                    (system_id, Err(SourceError::Task(e.to_string())))
                }
            };
            match result {
                Ok(r) => {
                    outcome.dropped_records += r.dropped;
                    outcome.host_series.insert(system_id.clone(), r.host);
                    outcome.entity_series.insert(system_id, r.entities);
                }
                Err(source) => {
                    warn!(system_id = %system_id, error = %source, "system fetch failed");
                    outcome.errors.push(SystemFetchError { system_id, source });
                }
            }
        }
        outcome
            .errors
            .sort_by(|a, b| a.system_id.cmp(&b.system_id));

        if outcome.host_series.is_empty() {
            return Err(FetchError::AllSystemsFailed {
                errors: outcome.errors,
            });
        }
        info!(
            ok = outcome.host_series.len(),
            failed = outcome.errors.len(),
            dropped_records = outcome.dropped_records,
            "fetch cycle complete"
        );
        Ok(outcome)
    }
}

async fn fetch_system(
    source: &dyn StatsSource,
    system: &SystemRef,
    query: &RecordQuery,
    timeout: Option<Duration>,
) -> Result<SystemResult, SourceError> {
    let (host_records, entity_records) = tokio::try_join!(
        with_timeout(timeout, source.fetch_host_records(system, query)),
        with_timeout(timeout, source.fetch_entity_records(system, query)),
    )?;

    let host = transform_host(&host_records);
    let entities = transform_entities(&entity_records);
    let dropped = host.dropped + entities.dropped;
    if dropped > 0 {
        debug!(system_id = %system.id, dropped, "malformed records dropped");
    }
    Ok(SystemResult {
        host: host.value,
        entities: entities.value,
        dropped,
    })
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, SourceError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| SourceError::Timeout(limit))?,
        None => fut.await,
    }
}
