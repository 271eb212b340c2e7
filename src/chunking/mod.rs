//! Transcript chunking for search indexing.
//!
//! Turns a time-coded transcript into token-bounded, overlapping chunks at two
//! granularities: detailed (level 1) and thematic (level 2). Pure functions,
//! no I/O; output is fully determined by the input segments and configuration.

mod detailed;
mod thematic;

pub use detailed::chunk_segments;
pub use thematic::{chunk_detailed, window_for_duration, ThematicWindow};

use crate::transcript::TranscriptData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chunk granularity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkLevel {
    /// Detailed, seconds-scale chunks built from raw segments.
    Detailed,
    /// Thematic, minutes-scale chunks built from detailed chunks.
    Thematic,
}

impl ChunkLevel {
    /// Wire representation ("1" detailed, "2" thematic).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkLevel::Detailed => "1",
            ChunkLevel::Thematic => "2",
        }
    }
}

impl std::fmt::Display for ChunkLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity fields stamped onto every chunk of a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoContext {
    pub user_id: String,
    pub video_id: String,
    pub video_title: String,
    pub language: String,
}

/// A contiguous run of segments merged into one indexable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Space-joined text of the constituent segments.
    pub text: String,
    /// Start time in seconds (first constituent segment).
    pub start: f64,
    /// End time in seconds (last constituent segment).
    pub end: f64,
    /// Duration in seconds; always `end - start`.
    pub duration: f64,
    /// Number of raw transcript segments merged into this chunk.
    pub segment_count: usize,
    /// Zero-based emission order within this chunk's level.
    pub chunk_index: u32,
    /// Granularity tier.
    pub level: ChunkLevel,
    pub user_id: String,
    pub video_id: String,
    pub video_title: String,
    pub language: String,
}

impl Chunk {
    /// All chunk fields as string key/value pairs for index-side filtering.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("user_id".to_string(), self.user_id.clone());
        map.insert("video_id".to_string(), self.video_id.clone());
        map.insert("video_title".to_string(), self.video_title.clone());
        map.insert("language".to_string(), self.language.clone());
        map.insert("start".to_string(), format!("{:.3}", self.start));
        map.insert("end".to_string(), format!("{:.3}", self.end));
        map.insert("duration".to_string(), format!("{:.3}", self.duration));
        map.insert(
            "segment_count".to_string(),
            self.segment_count.to_string(),
        );
        map.insert("chunk_index".to_string(), self.chunk_index.to_string());
        map.insert("chunk_level".to_string(), self.level.as_str().to_string());
        map
    }
}

/// Configuration for detailed (level 1) chunking.
#[derive(Debug, Clone)]
pub struct DetailedChunkingConfig {
    /// Target estimated tokens per chunk.
    pub target_tokens: usize,
    /// Minimum estimated tokens before the max-bound check may finalize.
    pub min_tokens: usize,
    /// Maximum estimated tokens per chunk.
    pub max_tokens: usize,
    /// Fraction of target tokens carried into the next chunk as overlap.
    pub overlap_percentage: f64,
}

impl Default for DetailedChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: 375,
            min_tokens: 250,
            max_tokens: 500,
            overlap_percentage: 0.20,
        }
    }
}

impl From<&crate::config::ChunkingSettings> for DetailedChunkingConfig {
    fn from(settings: &crate::config::ChunkingSettings) -> Self {
        Self {
            target_tokens: settings.target_tokens,
            min_tokens: settings.min_tokens,
            max_tokens: settings.max_tokens,
            overlap_percentage: settings.overlap_percentage,
        }
    }
}

/// Estimate the token count of a text as `ceil(chars / 4)`.
///
/// A fixed, language-agnostic approximation used only for chunk-boundary
/// decisions. Empty text estimates to zero.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    chars.div_ceil(4)
}

/// Chunk a transcript at both granularities, detailed chunks first.
///
/// Thematic chunks are produced only when `video_duration` is at least
/// fifteen minutes; shorter videos yield detailed chunks alone.
pub fn chunk_transcript(
    transcript: &TranscriptData,
    context: &VideoContext,
    video_duration: f64,
    config: &DetailedChunkingConfig,
) -> Vec<Chunk> {
    let mut chunks = chunk_segments(&transcript.segments, context, config);
    let thematic = chunk_detailed(&chunks, video_duration, context);
    chunks.extend(thematic);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    pub(crate) fn context() -> VideoContext {
        VideoContext {
            user_id: "user1".to_string(),
            video_id: "vid1".to_string(),
            video_title: "Test Video".to_string(),
            language: "en".to_string(),
        }
    }

    pub(crate) fn segment(start: f64, duration: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start,
            duration,
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // Unicode scalars count, not bytes
        assert_eq!(estimate_tokens("æøåæ"), 1);
    }

    #[test]
    fn test_chunk_level_wire_strings() {
        assert_eq!(ChunkLevel::Detailed.as_str(), "1");
        assert_eq!(ChunkLevel::Thematic.as_str(), "2");
    }

    #[test]
    fn test_metadata_carries_all_fields() {
        let chunk = Chunk {
            text: "hello".to_string(),
            start: 0.0,
            end: 5.0,
            duration: 5.0,
            segment_count: 1,
            chunk_index: 0,
            level: ChunkLevel::Detailed,
            user_id: "u".to_string(),
            video_id: "v".to_string(),
            video_title: "t".to_string(),
            language: "en".to_string(),
        };

        let meta = chunk.metadata();
        assert_eq!(meta.get("chunk_level").map(String::as_str), Some("1"));
        assert_eq!(meta.get("video_id").map(String::as_str), Some("v"));
        assert_eq!(meta.get("chunk_index").map(String::as_str), Some("0"));
        assert_eq!(meta.get("segment_count").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_empty_transcript_yields_no_chunks() {
        let transcript = TranscriptData {
            segments: vec![],
            language: "en".to_string(),
        };
        let chunks = chunk_transcript(
            &transcript,
            &context(),
            0.0,
            &DetailedChunkingConfig::default(),
        );
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_determinism() {
        let segments: Vec<TranscriptSegment> = (0..200)
            .map(|i| segment(i as f64 * 6.0, 6.0, "some spoken words about the topic at hand"))
            .collect();
        let transcript = TranscriptData {
            segments,
            language: "en".to_string(),
        };

        let config = DetailedChunkingConfig::default();
        let first = chunk_transcript(&transcript, &context(), 1200.0, &config);
        let second = chunk_transcript(&transcript, &context(), 1200.0, &config);
        assert_eq!(first, second);
    }
}
