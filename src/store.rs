use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::{composite_score, NarrativeLabel};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One persisted post. Engagement columns stay null until the reconciler's
/// single backfill write, after which all four are set together and never
/// change again.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRecord {
    pub id: String,
    pub text: String,
    pub emotion: String,
    pub narrative: String,
    pub predicted_score: Option<i64>,
    pub actual_likes: Option<i64>,
    pub actual_retweets: Option<i64>,
    pub composite_score: i64,
    pub engagement_fetched_at: Option<i64>,
    pub created_at: i64,
}

/// SQLite-backed post store. The only state shared between the watch loop
/// and the feedback loop.
#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

impl PostStore {
    pub async fn connect(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Fresh in-memory store for tests. Single connection: every pooled
    /// connection to `:memory:` would otherwise see its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn insert_post(
        &self,
        id: &str,
        text: &str,
        emotion: NarrativeLabel,
        narrative: NarrativeLabel,
        predicted_score: Option<u8>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO posts (id, text, emotion, narrative, predicted_score, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(text)
        .bind(emotion.label())
        .bind(narrative.label())
        .bind(predicted_score.map(i64::from))
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Ids of posts still waiting for real engagement, newest first.
    pub async fn unresolved_ids(&self, limit: u32) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar(
            "SELECT id FROM posts \
             WHERE engagement_fetched_at IS NULL \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// One-time engagement backfill. The `engagement_fetched_at IS NULL`
    /// predicate makes repeated calls for the same id no-ops; returns
    /// whether this call performed the write.
    pub async fn backfill_engagement(
        &self,
        id: &str,
        likes: i64,
        retweets: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE posts \
             SET actual_likes = ?, actual_retweets = ?, composite_score = ?, \
                 engagement_fetched_at = ? \
             WHERE id = ? AND engagement_fetched_at IS NULL",
        )
        .bind(likes)
        .bind(retweets)
        .bind(composite_score(likes, retweets))
        .bind(now_secs())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Average composite score per narrative label, best first. The raw
    /// material for judging which moods actually earn engagement.
    pub async fn average_score_by_label(&self) -> Result<Vec<(String, f64)>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT emotion, AVG(composite_score) FROM posts \
             GROUP BY emotion \
             ORDER BY AVG(composite_score) DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: &str) -> Result<Option<PostRecord>, StoreError> {
        let record = sqlx::query_as::<_, PostRecord>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
