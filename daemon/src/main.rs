use allocator_daemon::{
    allocator::Allocator,
    api::{build_router, ApiState},
    collector::Sampler,
    config::Config,
    executor::OsPriorityControl,
    thresholds::ThresholdStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn load_config() -> Config {
    let config_path = Config::config_path();
    Config::load_or_init(&config_path).unwrap_or_else(|e| {
        warn!("Failed to load config from {:?}: {}, using defaults", config_path, e);
        Config::default()
    })
}

#[cfg(target_os = "linux")]
fn host_sampler(config: &Config) -> Result<Arc<dyn Sampler>> {
    Ok(Arc::new(allocator_daemon::collector::LinuxSampler::new(
        config.sample_window(),
    )))
}

#[cfg(not(target_os = "linux"))]
fn host_sampler(_config: &Config) -> Result<Arc<dyn Sampler>> {
    anyhow::bail!("host sampling is only implemented for Linux")
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // keep serving; only an explicit signal stops the daemon
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Allocator daemon starting...");

    let config = load_config();
    let registry = Arc::new(config.registry());
    let thresholds = Arc::new(ThresholdStore::new(
        config.initial_thresholds(),
        config.thresholds.validate,
    ));
    info!(
        groups = registry.len(),
        thresholds = ?thresholds.get(),
        "Configuration loaded"
    );

    let sampler = host_sampler(&config)?;

    let allocator = Allocator::new(
        Arc::clone(&sampler),
        Arc::clone(&registry),
        Arc::clone(&thresholds),
        Arc::new(OsPriorityControl::new()),
    )
    .with_period(config.tick_interval());

    let state = Arc::new(ApiState::new(sampler, registry, thresholds));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.general.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.general.listen_addr))?;
    info!("API listening on {}", config.general.listen_addr);

    let cancel = CancellationToken::new();
    let allocator_cancel = cancel.clone();
    let allocator_task = tokio::spawn(async move {
        allocator.run(allocator_cancel).await;
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("API server failed")?;

    cancel.cancel();
    if let Err(e) = allocator_task.await {
        error!("Allocator task panicked: {}", e);
    }
    info!("Allocator daemon stopped");
    Ok(())
}
