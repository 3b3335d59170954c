//! SQLite-backed channel store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions, sqlite::SqliteRow},
};

use crate::{
    Error, Result,
    error::Context,
    processor::now_ms,
    store::ChannelStore,
    types::{ChannelStats, NewChannel, Platform, StatsSnapshot, TrackedChannel},
};

const CHANNEL_COLUMNS: &str =
    "id, platform, handle, resolved_id, display_name, channel_url, created_at_ms";
const SNAPSHOT_COLUMNS: &str =
    "id, channel_id, subscribers, total_views, videos, likes, recorded_at_ms, error";

/// SQLite-backed persistence for channels and statistics snapshots.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with its own connection pool and run migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| Error::external("failed to connect to SQLite", e))?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn channel_from_row(row: &SqliteRow) -> Result<TrackedChannel> {
    let platform: String = row.try_get("platform")?;
    Ok(TrackedChannel {
        id: row.try_get("id")?,
        platform: platform
            .parse()
            .with_context(|| format!("corrupt channels row {:?}", row.try_get::<i64, _>("id").ok()))?,
        handle: row.try_get("handle")?,
        resolved_id: row.try_get("resolved_id")?,
        display_name: row.try_get("display_name")?,
        channel_url: row.try_get("channel_url")?,
        created_at_ms: row.try_get::<i64, _>("created_at_ms")? as u64,
    })
}

fn snapshot_from_row(row: &SqliteRow) -> Result<StatsSnapshot> {
    Ok(StatsSnapshot {
        id: row.try_get("id")?,
        channel_id: row.try_get("channel_id")?,
        subscribers: row.try_get::<i64, _>("subscribers")? as u64,
        total_views: row.try_get::<i64, _>("total_views")? as u64,
        videos: row.try_get::<i64, _>("videos")? as u64,
        likes: row.try_get::<i64, _>("likes")? as u64,
        recorded_at_ms: row.try_get::<i64, _>("recorded_at_ms")? as u64,
        error: row.try_get("error")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

impl SqliteStore {
    async fn insert_row(
        &self,
        channel_id: i64,
        stats: &ChannelStats,
        recorded_at_ms: u64,
        error: Option<&str>,
    ) -> Result<StatsSnapshot> {
        let result = sqlx::query(
            "INSERT INTO stats (channel_id, subscribers, total_views, videos, likes, recorded_at_ms, error)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(channel_id)
        .bind(stats.subscribers as i64)
        .bind(stats.views as i64)
        .bind(stats.videos as i64)
        .bind(stats.likes as i64)
        .bind(recorded_at_ms as i64)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                Error::ChannelMissing { id: channel_id }
            } else {
                Error::from(e)
            }
        })?;

        Ok(StatsSnapshot {
            id: result.last_insert_rowid(),
            channel_id,
            subscribers: stats.subscribers,
            total_views: stats.views,
            videos: stats.videos,
            likes: stats.likes,
            recorded_at_ms,
            error: error.map(str::to_owned),
        })
    }
}

#[async_trait]
impl ChannelStore for SqliteStore {
    async fn list_channels(&self) -> Result<Vec<TrackedChannel>> {
        let rows = sqlx::query(&format!("SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(channel_from_row).collect()
    }

    async fn get_channel(&self, id: i64) -> Result<Option<TrackedChannel>> {
        let row = sqlx::query(&format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(channel_from_row).transpose()
    }

    async fn find_channel(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<Option<TrackedChannel>> {
        let row = sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE platform = ? AND handle = ?"
        ))
        .bind(platform.as_str())
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(channel_from_row).transpose()
    }

    async fn add_channel(&self, channel: &NewChannel) -> Result<TrackedChannel> {
        let created_at_ms = now_ms();
        let result = sqlx::query(
            "INSERT INTO channels (platform, handle, resolved_id, display_name, channel_url, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(channel.platform.as_str())
        .bind(&channel.handle)
        .bind(&channel.resolved_id)
        .bind(&channel.display_name)
        .bind(&channel.channel_url)
        .bind(created_at_ms as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::DuplicateChannel {
                    platform: channel.platform,
                    handle: channel.handle.clone(),
                }
            } else {
                Error::from(e)
            }
        })?;

        Ok(TrackedChannel {
            id: result.last_insert_rowid(),
            platform: channel.platform,
            handle: channel.handle.clone(),
            resolved_id: channel.resolved_id.clone(),
            display_name: channel.display_name.clone(),
            channel_url: channel.channel_url.clone(),
            created_at_ms,
        })
    }

    async fn delete_channel(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::ChannelMissing { id });
        }
        Ok(())
    }

    async fn get_cached_internal_id(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<Option<String>> {
        let row = sqlx::query("SELECT resolved_id FROM channels WHERE platform = ? AND handle = ?")
            .bind(platform.as_str())
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("resolved_id")?),
            None => Ok(None),
        }
    }

    async fn set_cached_internal_id(
        &self,
        platform: Platform,
        handle: &str,
        internal_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE channels SET resolved_id = ?
             WHERE platform = ? AND handle = ? AND resolved_id IS NULL",
        )
        .bind(internal_id)
        .bind(platform.as_str())
        .bind(handle)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_display_name(&self, id: i64, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE channels SET display_name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::ChannelMissing { id });
        }
        Ok(())
    }

    async fn insert_snapshot(
        &self,
        channel_id: i64,
        stats: &ChannelStats,
        recorded_at_ms: u64,
    ) -> Result<StatsSnapshot> {
        self.insert_row(channel_id, stats, recorded_at_ms, None).await
    }

    async fn insert_error_snapshot(
        &self,
        channel_id: i64,
        error: &str,
        recorded_at_ms: u64,
    ) -> Result<StatsSnapshot> {
        self.insert_row(channel_id, &ChannelStats::default(), recorded_at_ms, Some(error))
            .await
    }

    async fn latest_snapshot(&self, channel_id: i64) -> Result<Option<StatsSnapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM stats
             WHERE channel_id = ?
             ORDER BY recorded_at_ms DESC, id DESC
             LIMIT 1"
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn snapshots_since(&self, channel_id: i64, since_ms: u64) -> Result<Vec<StatsSnapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM stats
             WHERE channel_id = ? AND recorded_at_ms >= ?
             ORDER BY recorded_at_ms ASC, id ASC"
        ))
        .bind(channel_id)
        .bind(since_ms as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(snapshot_from_row).collect()
    }
}
