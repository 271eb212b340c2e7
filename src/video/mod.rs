//! Video records and lifecycle state machine.
//!
//! A video moves through a fixed pipeline of statuses; every transition is
//! enumerated here and anything else is rejected at the store boundary.

mod sqlite;

pub use sqlite::SqliteVideoStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a video.
///
/// Wire strings are exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    Pending,
    Queued,
    Processing,
    TranscriptExtracting,
    ZeroentropyProcessing,
    Ready,
    Failed,
}

impl VideoStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "PENDING",
            VideoStatus::Queued => "QUEUED",
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::TranscriptExtracting => "TRANSCRIPT_EXTRACTING",
            VideoStatus::ZeroentropyProcessing => "ZEROENTROPY_PROCESSING",
            VideoStatus::Ready => "READY",
            VideoStatus::Failed => "FAILED",
        }
    }

    /// Whether this status ends the pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }

    /// Whether a transition to `next` is allowed.
    ///
    /// Allowed edges: the forward pipeline chain, `FAILED` from any
    /// non-terminal status, same-status writes (no-ops), and the explicit
    /// re-trigger edge `FAILED -> QUEUED` used by the retry operation.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        use VideoStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (*self, next),
            (Pending, Queued)
                | (Queued, Processing)
                | (Processing, TranscriptExtracting)
                | (TranscriptExtracting, ZeroentropyProcessing)
                | (ZeroentropyProcessing, Ready)
                | (Failed, Queued)
        ) || (next == Failed && !self.is_terminal())
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VideoStatus::Pending),
            "QUEUED" => Ok(VideoStatus::Queued),
            "PROCESSING" => Ok(VideoStatus::Processing),
            "TRANSCRIPT_EXTRACTING" => Ok(VideoStatus::TranscriptExtracting),
            "ZEROENTROPY_PROCESSING" => Ok(VideoStatus::ZeroentropyProcessing),
            "READY" => Ok(VideoStatus::Ready),
            "FAILED" => Ok(VideoStatus::Failed),
            _ => Err(format!("Unknown video status: {}", s)),
        }
    }
}

/// A video record owned by the video store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub user_id: String,
    pub youtube_id: String,
    pub title: String,
    pub status: VideoStatus,
    /// Failure message recorded on transition into FAILED.
    pub error: Option<String>,
    /// Search-index collection this video's chunks live in, once indexed.
    pub zeroentropy_collection_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new pending video record.
    pub fn new(user_id: &str, youtube_id: &str, title: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            youtube_id: youtube_id.to_string(),
            title: title.to_string(),
            status: VideoStatus::Pending,
            error: None,
            zeroentropy_collection_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trait for video store implementations.
///
/// Every write is scoped by owner id as well as primary key.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Insert a new video record.
    async fn insert(&self, video: &Video) -> Result<()>;

    /// Fetch a video by id and owner.
    async fn get(&self, id: &str, user_id: &str) -> Result<Option<Video>>;

    /// Write a new status, validating the transition and stamping updated-at.
    /// Writing the current status again is a no-op. Any status but FAILED
    /// clears the error field.
    async fn update_status(&self, id: &str, user_id: &str, status: VideoStatus) -> Result<()>;

    /// Transition into FAILED and record the failure message.
    async fn mark_failed(&self, id: &str, user_id: &str, error: &str) -> Result<()>;

    /// Persist the search-index collection id.
    async fn set_collection(&self, id: &str, user_id: &str, collection_id: &str) -> Result<()>;

    /// Delete one video. Returns false when no row matched.
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool>;

    /// Delete all of a user's videos. Returns the number of rows removed.
    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize>;

    /// List a user's videos, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Video>>;
}
