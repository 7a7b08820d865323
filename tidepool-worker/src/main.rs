//! Tidepool Worker
//!
//! A long-running assessment job worker. It polls the central dispatch
//! API, claims work for its configured job types, executes typed handlers,
//! uploads artifacts to the object store, and reports outcomes. After a
//! configurable idle period with no work it exits cleanly so autoscaled
//! fleets can shrink.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tidepool_client::ApiClient;
use tidepool_worker::api::HttpJobApi;
use tidepool_worker::config::WorkerConfig;
use tidepool_worker::engine::{AssessmentEngine, CommandEngine, UnconfiguredEngine};
use tidepool_worker::runtime::{RunOutcome, Worker};
use tidepool_worker::storage::S3ObjectStorage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidepool_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tidepool Worker");

    let config = WorkerConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    info!(
        worker_id = %config.worker_id,
        api_endpoint = %config.api_endpoint,
        "loaded configuration"
    );

    let client = ApiClient::new(&config.api_endpoint, &config.username, &config.password)
        .with_timeouts(config.poll_timeout, config.result_timeout);
    let api = Arc::new(HttpJobApi::new(client));

    let engine: Arc<dyn AssessmentEngine> = match &config.engine_command {
        Some(command) => Arc::new(CommandEngine::new(command.clone())),
        None => Arc::new(UnconfiguredEngine),
    };
    let storage = Arc::new(S3ObjectStorage::new(
        &config.aws_region,
        config.s3_endpoint.clone(),
    ));

    let worker = Worker::start(config, api, engine, storage)
        .await
        .context("worker startup failed")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received; stopping after the current job");
        let _ = shutdown_tx.send(true);
    });

    match worker.run(shutdown_rx).await {
        Ok(RunOutcome::IdleTimeout) => {
            info!("worker idle past timeout; exiting");
            Ok(())
        }
        Ok(RunOutcome::Signalled) => {
            info!("worker stopped by signal; exiting");
            Ok(())
        }
        Err(e) => {
            error!("worker failed: {e:#}");
            Err(e)
        }
    }
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
