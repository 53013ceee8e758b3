// Dashboard state tests: cycle sequencing and chart views

mod common;

use common::{MockSource, MockSystem, point, series, ts};
use fleetcharts::aggregate::{DomainOrder, MetricSelector};
use fleetcharts::dashboard::DashboardState;
use fleetcharts::downsample::Reducer;
use fleetcharts::error::{SourceError, SystemFetchError};
use fleetcharts::fetch::{CycleTracker, FetchOrchestrator, FetchOutcome};
use fleetcharts::models::{EntitySeriesMap, SystemRef};
use std::sync::Arc;

fn outcome_for(id: &str) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    outcome.host_series.insert(id.into(), vec![]);
    let entities: EntitySeriesMap = [
        series("nginx", vec![point(0, 10.0, 1.0), point(60, 12.0, 1.0)]),
        series("redis", vec![point(0, 5.0, 2.0)]),
    ]
    .into_iter()
    .collect();
    outcome.entity_series.insert(id.into(), entities);
    outcome
}

#[tokio::test]
async fn test_apply_current_cycle() {
    let dashboard = DashboardState::new();
    let cycles = CycleTracker::new();
    let systems = vec![SystemRef::new("a", "alpha")];
    let ticket = cycles.begin();
    let update = dashboard
        .apply(&ticket, &systems, outcome_for("a"))
        .await
        .expect("current cycle applied");
    assert_eq!(update.cycle, 1);
    assert_eq!(update.systems_ok, 1);
    assert_eq!(update.systems_failed, 0);
    assert_eq!(dashboard.cycle().await, 1);
    assert!(dashboard.fetched_at().await.is_some());

    let statuses = dashboard.statuses().await;
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].ok);
    assert_eq!(statuses[0].entities, 2);
}

#[tokio::test]
async fn test_stale_cycle_is_discarded() {
    let dashboard = DashboardState::new();
    let cycles = CycleTracker::new();
    let systems = vec![SystemRef::new("a", "alpha")];
    let older = cycles.begin();
    let newer = cycles.begin();

    // Newer finishes first, older arrives late.
    assert!(dashboard.apply(&newer, &systems, outcome_for("a")).await.is_some());
    assert!(dashboard.apply(&older, &systems, FetchOutcome::default()).await.is_none());
    assert_eq!(dashboard.cycle().await, 2);
    assert!(dashboard.host_series("a").await.is_some());
}

#[tokio::test]
async fn test_overtaken_cycle_still_applies_when_nothing_newer_landed() {
    let dashboard = DashboardState::new();
    let cycles = CycleTracker::new();
    let older = cycles.begin();
    let newer = cycles.begin();
    // The newer cycle is still running: the older result is the best data available.
    assert!(dashboard.apply(&older, &[], outcome_for("a")).await.is_some());
    assert_eq!(dashboard.cycle().await, 1);
    assert!(dashboard.apply(&newer, &[], outcome_for("a")).await.is_some());
    assert_eq!(dashboard.cycle().await, 2);
    assert!(dashboard.apply(&older, &[], FetchOutcome::default()).await.is_none());
}

#[tokio::test]
async fn test_apply_failure_clears_series_and_keeps_errors() {
    let dashboard = DashboardState::new();
    let cycles = CycleTracker::new();
    let systems = vec![SystemRef::new("a", "alpha")];
    dashboard
        .apply(&cycles.begin(), &systems, outcome_for("a"))
        .await
        .unwrap();

    let errors = vec![SystemFetchError {
        system_id: "a".into(),
        source: SourceError::Auth(403),
    }];
    let update = dashboard
        .apply_failure(&cycles.begin(), &systems, &errors)
        .await
        .unwrap();
    assert_eq!(update.systems_ok, 0);
    assert_eq!(update.systems_failed, 1);
    assert!(dashboard.host_series("a").await.is_none());
    let statuses = dashboard.statuses().await;
    assert!(!statuses[0].ok);
    assert!(statuses[0].error.as_deref().unwrap().contains("403"));
}

#[tokio::test]
async fn test_entity_views_for_known_and_unknown_systems() {
    let dashboard = DashboardState::new();
    let cycles = CycleTracker::new();
    dashboard
        .apply(&cycles.begin(), &[SystemRef::new("a", "")], outcome_for("a"))
        .await
        .unwrap();

    let chart = dashboard
        .entity_stack("a", MetricSelector::Cpu, DomainOrder::Observed)
        .await
        .unwrap();
    assert_eq!(chart.domain, vec!["nginx", "redis"]);
    assert_eq!(chart.bands.len(), 3);

    let lines = dashboard
        .entity_lines("a", MetricSelector::Cpu, DomainOrder::Observed)
        .await
        .unwrap();
    assert_eq!(lines.len(), 3);

    let summary = dashboard.entity_summary("a", MetricSelector::Cpu).await.unwrap();
    assert_eq!(summary[0].peak, 12.0);

    assert!(dashboard
        .entity_stack("zz", MetricSelector::Cpu, DomainOrder::Observed)
        .await
        .is_none());
}

#[tokio::test]
async fn test_host_chart_downsamples_fetched_series() {
    let mut system = MockSystem::healthy(0);
    system.host = Ok((0..10)
        .map(|i| common::host_record(&format!("h{}", i), i * 30, i as f64, 50.0))
        .collect());
    let orchestrator = FetchOrchestrator::new(Arc::new(MockSource::default().with("a", system)));
    let systems = vec![SystemRef::new("a", "")];
    let outcome = orchestrator.fetch(&systems, None).await.unwrap();

    let dashboard = DashboardState::new();
    let cycles = CycleTracker::new();
    dashboard.apply(&cycles.begin(), &systems, outcome).await.unwrap();

    assert_eq!(
        dashboard.host_span("a").await,
        Some(chrono::TimeDelta::seconds(270))
    );
    let raw = dashboard.host_chart("a", None, Reducer::Average).await.unwrap().unwrap();
    assert_eq!(raw.len(), 10);

    let bucketed = dashboard
        .host_chart("a", Some(chrono::TimeDelta::seconds(90)), Reducer::Max)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bucketed.len(), 4);
    assert_eq!(bucketed[0].timestamp, ts(0));
    assert_eq!(bucketed[0].cpu, 2.0);
    assert_eq!(bucketed[0].memory, 50.0);

    assert!(dashboard
        .host_chart("a", Some(chrono::TimeDelta::zero()), Reducer::Max)
        .await
        .is_err());
    assert!(dashboard
        .host_chart("zz", None, Reducer::Max)
        .await
        .unwrap()
        .is_none());
}
