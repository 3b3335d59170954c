//! Runtime wiring: store, resolvers, processor, scheduler, HTTP API.

use std::sync::Arc;

use {
    anyhow::Context,
    chanstat_collector::{
        ChannelProcessor, ChannelStore, CollectionScheduler, store_sqlite::SqliteStore,
        types::SweepReport,
    },
    chanstat_config::ChanstatConfig,
    chanstat_gateway::AppState,
    tracing::{info, warn},
};

struct Runtime {
    store: Arc<dyn ChannelStore>,
    scheduler: Arc<CollectionScheduler>,
}

async fn build(config: &ChanstatConfig) -> anyhow::Result<Runtime> {
    let store: Arc<dyn ChannelStore> = Arc::new(
        SqliteStore::new(&config.database.url, config.database.max_connections)
            .await
            .with_context(|| format!("failed to open database {}", config.database.url))?,
    );

    let processor = chanstat_platforms::build_resolvers(config, &store)?
        .into_iter()
        .fold(
            ChannelProcessor::from_config(Arc::clone(&store), &config.collector),
            ChannelProcessor::with_resolver,
        );

    let scheduler = CollectionScheduler::from_config(
        Arc::clone(&store),
        Arc::new(processor),
        &config.collector,
    )?;
    Ok(Runtime { store, scheduler })
}

/// Start the scheduler and serve the API until ctrl-c.
pub async fn serve(config: ChanstatConfig) -> anyhow::Result<()> {
    let runtime = build(&config).await?;

    if config.collector.enabled {
        runtime.scheduler.start().await?;
    } else {
        warn!("collector disabled in config; only manual collection will run");
    }

    let state = AppState::new(Arc::clone(&runtime.store), Arc::clone(&runtime.scheduler));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    };
    let result =
        chanstat_gateway::serve(state, &config.server.bind, config.server.port, shutdown).await;

    runtime.scheduler.stop().await;
    result
}

/// Run a single sweep inline.
pub async fn collect_once(config: ChanstatConfig) -> anyhow::Result<SweepReport> {
    let runtime = build(&config).await?;
    runtime
        .scheduler
        .sweep()
        .await
        .context("a sweep is already in progress")
}
