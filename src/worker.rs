// Background refresh worker.
// Each tick (or manual refresh) starts a new fetch cycle in its own task; a cycle that
// finishes after a newer one started is discarded by DashboardState.

use crate::dashboard::{DashboardState, DashboardUpdate};
use crate::error::FetchError;
use crate::fetch::{ChartRange, CycleTicket, CycleTracker, FetchOrchestrator, TimeFilter};
use crate::models::SystemRef;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Rate limit for "no receivers" message (avoid logging every cycle when no one is on /ws/updates)
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity of the manual-refresh trigger; extra requests while one is queued are dropped.
pub const REFRESH_CHANNEL_CAPACITY: usize = 1;

/// Shared handles and channels for the worker.
pub struct WorkerDeps {
    pub orchestrator: Arc<FetchOrchestrator>,
    pub dashboard: Arc<DashboardState>,
    pub cycles: CycleTracker,
    pub systems: Vec<SystemRef>,
    pub tx: broadcast::Sender<DashboardUpdate>,
    pub refresh_rx: mpsc::Receiver<()>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing config.
pub struct WorkerConfig {
    pub interval_secs: u64,
    pub chart_range: ChartRange,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        orchestrator,
        dashboard,
        cycles,
        systems,
        tx,
        mut refresh_rx,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        interval_secs,
        chart_range,
    } = config;
    let systems: Arc<[SystemRef]> = systems.into();

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        interval_secs,
        range = chart_range.as_str()
    );

    let run_loop = async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let last_no_receivers_log: Arc<std::sync::Mutex<Option<Instant>>> =
            Arc::new(std::sync::Mutex::new(None));
        // Cleared once every refresh sender is dropped; the timer keeps running.
        let mut refresh_open = true;
        // Owned by the loop: cycles still running at shutdown are aborted on drop.
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, operation = "fetch_cycle", "cycle task failed");
                    }
                    continue;
                }
                trigger = refresh_rx.recv(), if refresh_open => {
                    if trigger.is_none() {
                        refresh_open = false;
                        continue;
                    }
                    tracing::debug!(operation = "manual_refresh", "refresh requested");
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
            }

            let ticket = cycles.begin();
            let cycle = CycleRun {
                orchestrator: orchestrator.clone(),
                dashboard: dashboard.clone(),
                systems: systems.clone(),
                tx: tx.clone(),
                chart_range,
                last_no_receivers_log: last_no_receivers_log.clone(),
            };
            if !in_flight.is_empty() {
                tracing::debug!(
                    in_flight = in_flight.len(),
                    "previous cycle still running; starting another"
                );
            }
            in_flight.spawn(cycle.run(ticket).in_current_span());
        }
    };
    tokio::spawn(run_loop.instrument(worker_span))
}

struct CycleRun {
    orchestrator: Arc<FetchOrchestrator>,
    dashboard: Arc<DashboardState>,
    systems: Arc<[SystemRef]>,
    tx: broadcast::Sender<DashboardUpdate>,
    chart_range: ChartRange,
    last_no_receivers_log: Arc<std::sync::Mutex<Option<Instant>>>,
}

impl CycleRun {
    async fn run(self, ticket: CycleTicket) {
        let filter = TimeFilter::for_range(self.chart_range, chrono::Utc::now());
        let update = match self.orchestrator.fetch(&self.systems, Some(&filter)).await {
            Ok(outcome) => self.dashboard.apply(&ticket, &self.systems, outcome).await,
            Err(FetchError::AllSystemsFailed { errors }) => {
                tracing::warn!(
                    cycle = ticket.seq(),
                    failed = errors.len(),
                    operation = "fetch_cycle",
                    "all systems failed"
                );
                self.dashboard
                    .apply_failure(&ticket, &self.systems, &errors)
                    .await
            }
        };
        let Some(update) = update else {
            return;
        };
        tracing::debug!(
            cycle = update.cycle,
            superseded = !ticket.is_current(),
            "cycle applied"
        );
        if self.tx.send(update).is_err() {
            let mut last = self
                .last_no_receivers_log
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if last.is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL) {
                tracing::debug!(
                    operation = "broadcast_update",
                    "No active WebSocket clients; broadcast channel has no receivers"
                );
                *last = Some(Instant::now());
            }
        }
    }
}
