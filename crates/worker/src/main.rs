//! Standalone outbox worker.
//!
//! Drains the fan-out and verification tasks the API enqueues. Running it
//! alongside the API's in-process worker is safe: notification ids are
//! derived from `(eventId, userId)`, so a task processed twice writes
//! nothing new.

use anyhow::Context;
use pulse_core::config::{NotifyConfig, OutboxConfig};
use pulse_db::StoreBackend;
use pulse_events::NotifyServices;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_worker=debug,pulse_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let notify = NotifyConfig::from_env();
    let outbox = OutboxConfig::from_env();

    let backend = StoreBackend::from_env().map_err(anyhow::Error::msg)?;
    if backend == StoreBackend::Memory {
        tracing::warn!("In-memory store is private to this process; the worker will see no tasks");
    }
    let store = pulse_db::open_store(&backend)
        .await
        .context("Failed to open document store")?;

    let worker = NotifyServices::new(store, notify).worker(outbox);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });
    tracing::info!("Worker started");

    wait_for_shutdown().await?;

    cancel.cancel();
    handle.await.context("Outbox worker task panicked")?;
    tracing::info!("Worker stopped");
    Ok(())
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn wait_for_shutdown() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Received SIGINT (Ctrl-C), shutting down");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        tracing::info!("Received Ctrl-C, shutting down");
    }

    Ok(())
}
