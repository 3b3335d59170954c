//! Scheduled statistics collection for tracked YouTube and TikTok channels.
//!
//! A [`service::CollectionScheduler`] sweeps every tracked channel on a cron
//! cadence. Each channel goes through the [`processor::ChannelProcessor`]:
//! cached id resolution, retried platform fetch, validity check, snapshot.

pub mod error;
pub mod parse;
pub mod processor;
pub mod quota;
pub mod resolver;
pub mod retry;
pub mod schedule;
pub mod service;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;
pub mod validity;

pub use {
    error::{Error, Result},
    processor::ChannelProcessor,
    resolver::{PlatformApi, PlatformResolver, StatsResolver},
    service::{CollectionScheduler, SchedulerOptions},
    store::ChannelStore,
};

/// Run database migrations for the collector.
///
/// Creates the `channels` and `stats` tables. Called by
/// [`store_sqlite::SqliteStore::new`]; call it yourself before
/// [`store_sqlite::SqliteStore::with_pool`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
