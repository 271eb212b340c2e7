//! Search index abstraction for Viddex.
//!
//! Provides a trait-based interface over the external vector search service,
//! chunk document identifiers, and per-user collection naming.

mod batch;
mod zeroentropy;

pub use batch::batch_index;
pub use zeroentropy::ZeroEntropyClient;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Deterministic per-user collection name in the search index.
pub fn collection_name(user_id: &str) -> String {
    format!("user-{}-videos", user_id)
}

/// A chunk's document identifier within a video.
///
/// Two formats coexist in the index: chunks produced by the current chunker
/// (`{videoId}-chunk{index}`) and the legacy unchunked per-segment format
/// (`{videoId}-{index}`) kept for previously-indexed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRef {
    /// A chunk from the current chunker.
    Chunked(u32),
    /// A raw segment from the legacy unchunked format.
    Segment(u32),
}

impl ChunkRef {
    /// Render the document path for a video.
    pub fn path(&self, video_id: &str) -> String {
        match self {
            ChunkRef::Chunked(index) => format!("{}-chunk{}", video_id, index),
            ChunkRef::Segment(index) => format!("{}-{}", video_id, index),
        }
    }

    /// Parse a document path belonging to a video, either format.
    ///
    /// Returns None when the path does not belong to the video or the suffix
    /// is not a recognized identifier.
    pub fn parse(path: &str, video_id: &str) -> Option<ChunkRef> {
        let suffix = path
            .strip_prefix(video_id)
            .and_then(|rest| rest.strip_prefix('-'))?;

        if let Some(index) = suffix.strip_prefix("chunk") {
            return index.parse().ok().map(ChunkRef::Chunked);
        }
        suffix.parse().ok().map(ChunkRef::Segment)
    }
}

impl std::fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkRef::Chunked(index) => write!(f, "chunk{}", index),
            ChunkRef::Segment(index) => write!(f, "{}", index),
        }
    }
}

/// Trait for search index implementations.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create a collection if it does not already exist. A creation conflict
    /// means the collection exists and counts as success.
    async fn ensure_collection(&self, name: &str) -> Result<()>;

    /// Add (or replace) a document under a path.
    async fn add_document(
        &self,
        collection: &str,
        path: &str,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Delete a document. Deleting a missing document is success.
    async fn delete_document(&self, collection: &str, path: &str) -> Result<()>;

    /// List all document paths in a collection. A missing collection lists
    /// as empty.
    async fn list_documents(&self, collection: &str) -> Result<Vec<String>>;

    /// Delete a whole collection. Deleting a missing collection is success.
    async fn delete_collection(&self, name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name() {
        assert_eq!(collection_name("abc123"), "user-abc123-videos");
    }

    #[test]
    fn test_chunk_ref_paths() {
        assert_eq!(ChunkRef::Chunked(0).path("vid1"), "vid1-chunk0");
        assert_eq!(ChunkRef::Chunked(12).path("vid1"), "vid1-chunk12");
        assert_eq!(ChunkRef::Segment(7).path("vid1"), "vid1-7");
    }

    #[test]
    fn test_chunk_ref_parse_roundtrip() {
        for chunk_ref in [ChunkRef::Chunked(0), ChunkRef::Chunked(42), ChunkRef::Segment(3)] {
            let path = chunk_ref.path("vid1");
            assert_eq!(ChunkRef::parse(&path, "vid1"), Some(chunk_ref));
        }
    }

    #[test]
    fn test_chunk_ref_parse_rejects_foreign_paths() {
        assert_eq!(ChunkRef::parse("other-chunk0", "vid1"), None);
        assert_eq!(ChunkRef::parse("vid1-chunkx", "vid1"), None);
        assert_eq!(ChunkRef::parse("vid1-", "vid1"), None);
        assert_eq!(ChunkRef::parse("vid1", "vid1"), None);
        // A different video sharing a prefix must not match
        assert_eq!(ChunkRef::parse("vid1-chunk0", "vid"), None);
    }
}
