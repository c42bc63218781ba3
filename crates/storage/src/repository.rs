//! Repository Implementation

use crate::{Color, Prediction, RandomSource, StorageError, ThreadRandom, Wish, SEED_PREDICTIONS};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Number of wishes listed when the caller gives no limit
pub const DEFAULT_RECENT_LIMIT: u32 = 20;

const CREATE_PREDICTIONS: &str = "
    CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        color TEXT NOT NULL DEFAULT 'gold'
    )";

const CREATE_WISHES: &str = "
    CREATE TABLE IF NOT EXISTS wishes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        color TEXT NOT NULL DEFAULT 'red',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        is_visible BOOLEAN NOT NULL DEFAULT 1
    )";

/// SQLite-backed store for predictions and wishes
///
/// Every operation opens its own connection and closes it before
/// returning, so a `Repository` holds no connection state and can be shared
/// freely between request handlers.
pub struct Repository {
    path: PathBuf,
    options: SqliteConnectOptions,
    rng: Arc<dyn RandomSource>,
}

impl Repository {
    /// Create a repository for the database file at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self::with_random(db_path, Arc::new(ThreadRandom))
    }

    /// Create a repository with a custom randomness source
    pub fn with_random(db_path: impl AsRef<Path>, rng: Arc<dyn RandomSource>) -> Self {
        let path = db_path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        Self { path, options, rng }
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<SqliteConnection, StorageError> {
        Ok(SqliteConnection::connect_with(&self.options).await?)
    }

    /// Create tables if absent and seed predictions into an empty table
    pub async fn initialize(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        sqlx::query(CREATE_PREDICTIONS).execute(&mut *tx).await?;
        sqlx::query(CREATE_WISHES).execute(&mut *tx).await?;

        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM predictions")
            .fetch_one(&mut *tx)
            .await?;

        if existing == 0 {
            for (text, color) in SEED_PREDICTIONS {
                sqlx::query("INSERT INTO predictions (text, color) VALUES (?, ?)")
                    .bind(text)
                    .bind(color.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
            info!("Seeded {} predictions", SEED_PREDICTIONS.len());
        }

        tx.commit().await?;
        conn.close().await?;

        info!("Database ready at {}", self.path.display());
        Ok(())
    }

    /// Pick one prediction uniformly at random
    pub async fn get_random_prediction(&self) -> Result<Option<Prediction>, StorageError> {
        let mut conn = self.connect().await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM predictions")
            .fetch_one(&mut conn)
            .await?;

        let prediction = if total > 0 {
            let offset = self.rng.pick(total as usize) as i64;
            sqlx::query_as::<_, Prediction>(
                "SELECT id, text, color FROM predictions ORDER BY id LIMIT 1 OFFSET ?",
            )
            .bind(offset)
            .fetch_optional(&mut conn)
            .await?
        } else {
            None
        };

        conn.close().await?;
        Ok(prediction)
    }

    /// Insert a wish with a random color and return the stored row
    ///
    /// The text is stored as given; callers validate it.
    pub async fn add_wish(&self, text: &str) -> Result<Wish, StorageError> {
        let color = Color::PALETTE[self.rng.pick(Color::PALETTE.len())];

        let mut conn = self.connect().await?;
        let wish = sqlx::query_as::<_, Wish>(
            "INSERT INTO wishes (text, color) VALUES (?, ?)
             RETURNING id, text, color, created_at",
        )
        .bind(text)
        .bind(color.as_str())
        .fetch_one(&mut conn)
        .await?;
        conn.close().await?;

        debug!("Inserted wish {} ({})", wish.id, wish.color);
        Ok(wish)
    }

    /// Most recent visible wishes, newest first
    ///
    /// Wishes created within the same second are ordered by id, newest first.
    pub async fn get_recent_wishes(&self, limit: u32) -> Result<Vec<Wish>, StorageError> {
        let mut conn = self.connect().await?;
        let wishes = sqlx::query_as::<_, Wish>(
            "SELECT id, text, color, created_at
             FROM wishes
             WHERE is_visible = 1
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        Ok(wishes)
    }

    /// Number of visible wishes
    pub async fn get_wish_count(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM wishes WHERE is_visible = 1").await
    }

    /// Number of seeded predictions
    pub async fn prediction_count(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM predictions").await
    }

    /// Hide a wish from listings and counts
    ///
    /// Returns `false` if no visible wish has this id.
    pub async fn hide_wish(&self, id: i64) -> Result<bool, StorageError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("UPDATE wishes SET is_visible = 0 WHERE id = ? AND is_visible = 1")
            .bind(id)
            .execute(&mut conn)
            .await?;
        conn.close().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, sql: &str) -> Result<u64, StorageError> {
        let mut conn = self.connect().await?;
        let (count,): (i64,) = sqlx::query_as(sql).fetch_one(&mut conn).await?;
        conn.close().await?;

        Ok(count.max(0) as u64)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("path", &self.path).finish()
    }
}
