mod args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use stamp_cache::{CachingNodeCache, InMemoryKv};
use stamp_crypto::Sha512;
use stamp_scheduler::{InMemoryBroadcastSink, InMemoryStore, IntervalScheduler};
use tokio::signal;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.init_tracing();
    tracing::debug!("args: {args:?}");

    let config = args.resolve_config()?;
    tracing::debug!("config: {config:?}");

    let store: Box<InMemoryStore<Sha512>> = Box::default();
    let cache: Box<CachingNodeCache<Sha512, InMemoryKv>> = Box::new(CachingNodeCache::with_threshold(
        InMemoryKv::new(config.cache_ttl),
        config.small_subtree_threshold,
    ));
    let broadcast: Box<InMemoryBroadcastSink> = Box::default();

    let scheduler = Arc::new(IntervalScheduler::new(
        config.authority.clone(),
        store,
        cache,
        broadcast,
        config.head_queue_depth,
    ));

    tracing::info!(
        authority = %config.authority,
        tick_interval_secs = config.tick_interval.as_secs(),
        "starting interval scheduler"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let run_handle = {
        let scheduler = scheduler.clone();
        let tick_interval = config.tick_interval;
        tokio::spawn(async move { scheduler.run(tick_interval, shutdown_rx).await })
    };

    shutdown_signal().await;
    tracing::info!("starting shutdown");
    let _ = shutdown_tx.send(true);
    run_handle.await?;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        tracing::info!("received SIGINT");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        tracing::info!("received SIGTERM");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
