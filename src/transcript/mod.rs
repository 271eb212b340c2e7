//! Transcript types and source abstraction.
//!
//! A transcript source delivers raw time-coded caption segments; the
//! extraction policy retries fetching with escalating request shapes and
//! validates the result before it reaches the chunker.

mod extraction;
mod youtube;

pub use extraction::{extract_with_retry, ExtractionPolicy};
pub use youtube::{extract_video_id, YtDlpTranscriptSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw caption unit as delivered by the transcript source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Caption language tag.
    pub language: String,
}

impl TranscriptSegment {
    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A validated, normalized transcript ready for chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptData {
    pub segments: Vec<TranscriptSegment>,
    /// Language of the transcript (from the selected caption track).
    pub language: String,
}

impl TranscriptData {
    /// Total duration in seconds, up to the end of the last segment.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().fold(0.0, |acc, s| acc.max(s.end()))
    }

    /// Total text length in characters across all segments.
    pub fn total_chars(&self) -> usize {
        self.segments.iter().map(|s| s.text.chars().count()).sum()
    }
}

/// Client identity presented to the transcript source.
///
/// Sources intermittently reject requests based on client fingerprint, so
/// retries vary the identity rather than repeating the same request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerClient {
    /// The source's default web client.
    Default,
    /// Alternate client identity.
    Android,
}

/// Per-attempt fetch configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub player_client: PlayerClient,
    pub use_cache: bool,
    /// Requested caption language (None = best available).
    pub language: Option<String>,
}

/// Trait for transcript sources.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch raw caption segments for a video, offsets in seconds.
    async fn fetch(
        &self,
        youtube_id: &str,
        options: &FetchOptions,
    ) -> std::result::Result<Vec<TranscriptSegment>, TranscriptError>;
}

/// Failure taxonomy for transcript extraction.
///
/// Each variant carries a distinct human-readable message; callers report the
/// message, not a code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    #[error("Captions are disabled for this video")]
    CaptionsDisabled,

    #[error("No transcript available for this video")]
    NotAvailable,

    #[error("Transcript not available in language '{0}'")]
    LanguageUnavailable(String),

    #[error("Video is unavailable or private")]
    VideoUnavailable,

    #[error("Rate limited by the transcript source, try again later")]
    RateLimited,

    #[error("Invalid YouTube video ID: {0}")]
    InvalidVideoId(String),

    #[error("No transcript data returned")]
    Empty,

    #[error("Transcript too short or low quality ({0} characters)")]
    TooShort(usize),

    #[error("Video too short to index ({0:.1} seconds)")]
    VideoTooShort(f64),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Transcript extraction failed: {0}")]
    Extraction(String),
}

impl TranscriptError {
    /// Whether retrying the same video can ever succeed.
    ///
    /// Permanent content errors exhaust the extraction policy's fixed attempts
    /// and then fail the video; transient errors may additionally be retried
    /// at the pipeline-step level.
    pub fn is_permanent(&self) -> bool {
        !matches!(
            self,
            TranscriptError::RateLimited
                | TranscriptError::ToolNotFound(_)
                | TranscriptError::Extraction(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_end() {
        let seg = TranscriptSegment {
            text: "hi".to_string(),
            start: 1.5,
            duration: 2.5,
            language: "en".to_string(),
        };
        assert_eq!(seg.end(), 4.0);
    }

    #[test]
    fn test_total_duration_and_chars() {
        let data = TranscriptData {
            segments: vec![
                TranscriptSegment {
                    text: "hello".to_string(),
                    start: 0.0,
                    duration: 5.0,
                    language: "en".to_string(),
                },
                TranscriptSegment {
                    text: "world".to_string(),
                    start: 5.0,
                    duration: 3.0,
                    language: "en".to_string(),
                },
            ],
            language: "en".to_string(),
        };
        assert_eq!(data.total_duration(), 8.0);
        assert_eq!(data.total_chars(), 10);
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let errors = [
            TranscriptError::CaptionsDisabled.to_string(),
            TranscriptError::NotAvailable.to_string(),
            TranscriptError::LanguageUnavailable("en".to_string()).to_string(),
            TranscriptError::VideoUnavailable.to_string(),
            TranscriptError::RateLimited.to_string(),
            TranscriptError::InvalidVideoId("x".to_string()).to_string(),
        ];
        let unique: std::collections::HashSet<_> = errors.iter().collect();
        assert_eq!(unique.len(), errors.len());
    }

    #[test]
    fn test_permanence_classification() {
        assert!(TranscriptError::CaptionsDisabled.is_permanent());
        assert!(TranscriptError::VideoUnavailable.is_permanent());
        assert!(TranscriptError::TooShort(10).is_permanent());
        assert!(!TranscriptError::RateLimited.is_permanent());
        assert!(!TranscriptError::Extraction("boom".to_string()).is_permanent());
    }
}
