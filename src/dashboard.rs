// Last applied fetch cycle plus on-demand chart views.
// Consumers are notified of a new cycle (worker broadcast) and then pull views from here.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::aggregate::{self, DomainOrder, MetricSelector};
use crate::downsample::{self, Reducer};
use crate::error::{AnalyticsError, SystemFetchError};
use crate::fetch::{CycleTicket, FetchOutcome};
use crate::models::{
    EntityScalarPoint, EntitySeriesMap, EntitySummary, StackedChart, StatPoint, SystemDataPoint,
    SystemRef, SystemStatus,
};

/// Notification sent after a cycle has been applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUpdate {
    pub cycle: u64,
    pub fetched_at: DateTime<Utc>,
    pub systems_ok: usize,
    pub systems_failed: usize,
}

#[derive(Debug, Default)]
struct Snapshot {
    cycle: u64,
    fetched_at: Option<DateTime<Utc>>,
    systems: Vec<SystemRef>,
    host_series: HashMap<String, Vec<SystemDataPoint>>,
    entity_series: HashMap<String, EntitySeriesMap>,
    errors: HashMap<String, String>,
}

#[derive(Default)]
pub struct DashboardState {
    inner: RwLock<Snapshot>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a cycle's outcome unless a newer cycle has already been applied.
    /// Returns the update to broadcast, or `None` when the result was stale.
    pub async fn apply(
        &self,
        ticket: &CycleTicket,
        systems: &[SystemRef],
        outcome: FetchOutcome,
    ) -> Option<DashboardUpdate> {
        self.replace(
            ticket,
            systems,
            outcome.host_series,
            outcome.entity_series,
            &outcome.errors,
        )
        .await
    }

    /// Apply a cycle in which every selected system failed: series are cleared, errors kept.
    pub async fn apply_failure(
        &self,
        ticket: &CycleTicket,
        systems: &[SystemRef],
        errors: &[SystemFetchError],
    ) -> Option<DashboardUpdate> {
        self.replace(ticket, systems, HashMap::new(), HashMap::new(), errors)
            .await
    }

    async fn replace(
        &self,
        ticket: &CycleTicket,
        systems: &[SystemRef],
        host_series: HashMap<String, Vec<SystemDataPoint>>,
        entity_series: HashMap<String, EntitySeriesMap>,
        errors: &[SystemFetchError],
    ) -> Option<DashboardUpdate> {
        let mut inner = self.inner.write().await;
        // Checked under the write lock so an older cycle can never overwrite a newer one.
        // A cycle overtaken by one still in flight is applied; partial data beats none.
        if ticket.seq() <= inner.cycle {
            tracing::debug!(cycle = ticket.seq(), "discarding superseded cycle");
            return None;
        }
        let fetched_at = Utc::now();
        inner.cycle = ticket.seq();
        inner.fetched_at = Some(fetched_at);
        inner.systems = systems.to_vec();
        inner.errors = errors
            .iter()
            .map(|e| (e.system_id.clone(), e.source.to_string()))
            .collect();
        inner.host_series = host_series;
        inner.entity_series = entity_series;
        Some(DashboardUpdate {
            cycle: inner.cycle,
            fetched_at,
            systems_ok: inner.host_series.len(),
            systems_failed: inner.errors.len(),
        })
    }

    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.fetched_at
    }

    pub async fn cycle(&self) -> u64 {
        self.inner.read().await.cycle
    }

    pub async fn statuses(&self) -> Vec<SystemStatus> {
        let inner = self.inner.read().await;
        inner
            .systems
            .iter()
            .map(|s| SystemStatus {
                id: s.id.clone(),
                name: s.name.clone(),
                ok: inner.host_series.contains_key(&s.id),
                host_points: inner.host_series.get(&s.id).map_or(0, Vec::len),
                entities: inner.entity_series.get(&s.id).map_or(0, EntitySeriesMap::len),
                error: inner.errors.get(&s.id).cloned(),
            })
            .collect()
    }

    pub async fn host_series(&self, system_id: &str) -> Option<Vec<SystemDataPoint>> {
        self.inner.read().await.host_series.get(system_id).cloned()
    }

    /// Time covered by a system's host series.
    pub async fn host_span(&self, system_id: &str) -> Option<TimeDelta> {
        let inner = self.inner.read().await;
        let series = inner.host_series.get(system_id)?;
        let first = series.first()?;
        let last = series.last()?;
        Some(last.timestamp - first.timestamp)
    }

    /// Host CPU / memory / network chart, downsampled when `bucket` is given.
    pub async fn host_chart(
        &self,
        system_id: &str,
        bucket: Option<TimeDelta>,
        reducer: Reducer,
    ) -> Result<Option<Vec<StatPoint>>, AnalyticsError> {
        let inner = self.inner.read().await;
        let Some(series) = inner.host_series.get(system_id) else {
            return Ok(None);
        };
        let points = match bucket {
            Some(width) => downsample::downsample_host(series, width, reducer)?,
            None => series.iter().map(SystemDataPoint::stat_point).collect(),
        };
        Ok(Some(points))
    }

    pub async fn entity_stack(
        &self,
        system_id: &str,
        metric: MetricSelector,
        order: DomainOrder,
    ) -> Option<StackedChart> {
        let inner = self.inner.read().await;
        let series = inner.entity_series.get(system_id)?;
        Some(aggregate::stack(series, metric, order))
    }

    pub async fn entity_lines(
        &self,
        system_id: &str,
        metric: MetricSelector,
        order: DomainOrder,
    ) -> Option<Vec<EntityScalarPoint>> {
        let inner = self.inner.read().await;
        let series = inner.entity_series.get(system_id)?;
        Some(aggregate::flatten(series, metric, order))
    }

    pub async fn entity_summary(
        &self,
        system_id: &str,
        metric: MetricSelector,
    ) -> Option<Vec<EntitySummary>> {
        let inner = self.inner.read().await;
        let series = inner.entity_series.get(system_id)?;
        Some(aggregate::summarize(series, metric))
    }
}
