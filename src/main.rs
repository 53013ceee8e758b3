use anyhow::Result;
use fleetcharts::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        instance = %app_config.instance.id,
        "starting"
    );

    let token = app_config.token();
    if token.is_none() {
        tracing::warn!(
            env = %app_config.instance.token_env,
            "no auth token set; requests are sent unauthenticated"
        );
    }
    let request_timeout = Duration::from_millis(app_config.refresh.request_timeout_ms);
    let source = Arc::new(client::HttpStatsSource::new(
        &app_config.instance.url,
        token,
        request_timeout,
    )?);

    let systems = if app_config.instance.systems.is_empty() {
        source
            .list_systems()
            .await
            .map_err(|e| anyhow::anyhow!("list systems: {}", e))?
    } else {
        app_config.instance.systems.clone()
    };
    tracing::info!(systems = systems.len(), "systems selected");

    let pin_repo = Arc::new(pin_repo::PinRepo::connect(&app_config.pins.path).await?);
    pin_repo.init().await?;
    let pins = Arc::new(pins::PinRegistry::from_snapshot(
        app_config.instance.id.clone(),
        pin_repo.load().await?,
    ));

    let orchestrator =
        Arc::new(fetch::FetchOrchestrator::new(source).with_request_timeout(request_timeout));
    let dashboard = Arc::new(dashboard::DashboardState::new());
    let (updates_tx, _) =
        broadcast::channel::<dashboard::DashboardUpdate>(app_config.refresh.broadcast_capacity);
    let (refresh_tx, refresh_rx) = mpsc::channel(worker::REFRESH_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            orchestrator,
            dashboard: dashboard.clone(),
            cycles: fetch::CycleTracker::new(),
            systems,
            tx: updates_tx.clone(),
            refresh_rx,
            shutdown_rx,
        },
        worker::WorkerConfig {
            interval_secs: app_config.refresh.interval_secs,
            chart_range: app_config.refresh.chart_range,
        },
    );

    let app = routes::app(
        routes::AppDeps {
            dashboard,
            pins: pins.clone(),
            pin_repo: Some(pin_repo.clone()),
            updates_tx,
            refresh_tx,
        },
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = worker_handle.await;
            if let Err(e) = pin_repo.save(&pins.snapshot()).await {
                tracing::warn!(error = %e, operation = "save_pins", "final pin flush failed");
            }
        }
    }

    Ok(())
}
