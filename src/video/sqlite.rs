//! SQLite-based video store implementation.

use super::{Video, VideoStatus, VideoStore};
use crate::error::{Result, ViddexError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        youtube_id TEXT NOT NULL,
        title TEXT NOT NULL,
        status TEXT NOT NULL,
        error TEXT,
        zeroentropy_collection_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_videos_user_id ON videos(user_id);
"#;

/// SQLite-backed video store.
pub struct SqliteVideoStore {
    conn: Mutex<Connection>,
}

impl SqliteVideoStore {
    /// Create a new SQLite video store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite video store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory video store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ViddexError::VideoStore(format!("Failed to acquire lock: {}", e)))
    }

    fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
        let status_str: String = row.get("status")?;
        let status = VideoStatus::from_str(&status_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Video {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            youtube_id: row.get("youtube_id")?,
            title: row.get("title")?,
            status,
            error: row.get("error")?,
            zeroentropy_collection_id: row.get("zeroentropy_collection_id")?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn get_inner(conn: &Connection, id: &str, user_id: &str) -> Result<Option<Video>> {
        let mut stmt =
            conn.prepare("SELECT * FROM videos WHERE id = ?1 AND user_id = ?2")?;
        let mut rows = stmt.query_map(params![id, user_id], Self::row_to_video)?;

        match rows.next() {
            Some(video) => Ok(Some(video?)),
            None => Ok(None),
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    #[instrument(skip(self, video), fields(video_id = %video.id))]
    async fn insert(&self, video: &Video) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO videos
            (id, user_id, youtube_id, title, status, error, zeroentropy_collection_id,
             created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                video.id,
                video.user_id,
                video.youtube_id,
                video.title,
                video.status.as_str(),
                video.error,
                video.zeroentropy_collection_id,
                video.created_at.to_rfc3339(),
                video.updated_at.to_rfc3339(),
            ],
        )?;

        debug!("Inserted video {}", video.id);
        Ok(())
    }

    async fn get(&self, id: &str, user_id: &str) -> Result<Option<Video>> {
        let conn = self.lock()?;
        Self::get_inner(&conn, id, user_id)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: &str, user_id: &str, status: VideoStatus) -> Result<()> {
        let conn = self.lock()?;

        let current = Self::get_inner(&conn, id, user_id)?
            .ok_or_else(|| ViddexError::VideoNotFound(id.to_string()))?;

        if current.status == status {
            debug!("Status already {}, nothing to do", status);
            return Ok(());
        }

        if !current.status.can_transition_to(status) {
            return Err(ViddexError::InvalidTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        conn.execute(
            "UPDATE videos SET status = ?1, error = NULL, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![status.as_str(), Utc::now().to_rfc3339(), id, user_id],
        )?;

        debug!("Video {} -> {}", id, status);
        Ok(())
    }

    #[instrument(skip(self, error))]
    async fn mark_failed(&self, id: &str, user_id: &str, error: &str) -> Result<()> {
        let conn = self.lock()?;

        let current = Self::get_inner(&conn, id, user_id)?
            .ok_or_else(|| ViddexError::VideoNotFound(id.to_string()))?;

        if !current.status.can_transition_to(VideoStatus::Failed) {
            return Err(ViddexError::InvalidTransition {
                from: current.status.to_string(),
                to: VideoStatus::Failed.to_string(),
            });
        }

        conn.execute(
            "UPDATE videos SET status = ?1, error = ?2, updated_at = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![
                VideoStatus::Failed.as_str(),
                error,
                Utc::now().to_rfc3339(),
                id,
                user_id
            ],
        )?;

        debug!("Video {} failed: {}", id, error);
        Ok(())
    }

    async fn set_collection(&self, id: &str, user_id: &str, collection_id: &str) -> Result<()> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE videos SET zeroentropy_collection_id = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![collection_id, Utc::now().to_rfc3339(), id, user_id],
        )?;

        if updated == 0 {
            return Err(ViddexError::VideoNotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM videos WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM videos WHERE user_id = ?1", params![user_id])?;
        info!("Removed {} videos for user {}", removed, user_id);
        Ok(removed)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Video>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM videos WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], Self::row_to_video)?;

        let mut videos = Vec::new();
        for video in rows {
            videos.push(video?);
        }
        Ok(videos)
    }
}
