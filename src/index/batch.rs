//! Batch indexing of chunks with bounded concurrency.

use super::{ChunkRef, SearchIndex};
use crate::chunking::Chunk;
use tracing::{debug, instrument, warn};

/// Push chunks to the search index in fixed-size concurrent windows.
///
/// Document paths are assigned from the chunk's position in the flat list, so
/// detailed and thematic chunks never collide. Each window of at most
/// `concurrency` pushes is awaited fully before the next starts. A single
/// chunk's failure is logged and excluded from the result; siblings in the
/// same and later windows are unaffected.
///
/// Returns the document paths of the successfully indexed chunks.
#[instrument(skip(index, chunks), fields(total = chunks.len()))]
pub async fn batch_index(
    index: &dyn SearchIndex,
    collection: &str,
    chunks: &[Chunk],
    concurrency: usize,
) -> Vec<String> {
    let concurrency = concurrency.max(1);
    let mut indexed = Vec::with_capacity(chunks.len());

    for (window_index, window) in chunks.chunks(concurrency).enumerate() {
        let window_start = window_index * concurrency;
        let pushes = window.iter().enumerate().map(|(offset, chunk)| {
            let path = ChunkRef::Chunked((window_start + offset) as u32).path(&chunk.video_id);
            async move {
                match index
                    .add_document(collection, &path, &chunk.text, &chunk.metadata())
                    .await
                {
                    Ok(()) => Some(path),
                    Err(e) => {
                        warn!(path = %path, error = %e, "Failed to index chunk");
                        None
                    }
                }
            }
        });

        let results = futures::future::join_all(pushes).await;
        indexed.extend(results.into_iter().flatten());
    }

    debug!(indexed = indexed.len(), "Batch indexing complete");
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkLevel, VideoContext};
    use crate::error::{Result, ViddexError};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Index that fails specific paths and tracks peak concurrency.
    struct FlakyIndex {
        failing_paths: BTreeSet<String>,
        stored: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FlakyIndex {
        fn new(failing_paths: &[&str]) -> Self {
            Self {
                failing_paths: failing_paths.iter().map(|p| p.to_string()).collect(),
                stored: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchIndex for FlakyIndex {
        async fn ensure_collection(&self, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn add_document(
            &self,
            _collection: &str,
            path: &str,
            _text: &str,
            _metadata: &BTreeMap<String, String>,
        ) -> Result<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_paths.contains(path) {
                return Err(ViddexError::SearchIndex("push rejected".to_string()));
            }
            self.stored.lock().unwrap().push(path.to_string());
            Ok(())
        }

        async fn delete_document(&self, _collection: &str, _path: &str) -> Result<()> {
            Ok(())
        }

        async fn list_documents(&self, _collection: &str) -> Result<Vec<String>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn delete_collection(&self, _name: &str) -> Result<()> {
            Ok(())
        }
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        let context = VideoContext {
            user_id: "user1".to_string(),
            video_id: "vid1".to_string(),
            video_title: "Test Video".to_string(),
            language: "en".to_string(),
        };
        (0..count)
            .map(|i| Chunk {
                text: format!("chunk {}", i),
                start: i as f64 * 10.0,
                end: (i + 1) as f64 * 10.0,
                duration: 10.0,
                segment_count: 2,
                chunk_index: i as u32,
                level: ChunkLevel::Detailed,
                user_id: context.user_id.clone(),
                video_id: context.video_id.clone(),
                video_title: context.video_title.clone(),
                language: context.language.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_all_chunks_indexed() {
        let index = FlakyIndex::new(&[]);
        let indexed = batch_index(&index, "user-user1-videos", &chunks(12), 5).await;

        assert_eq!(indexed.len(), 12);
        assert_eq!(indexed[0], "vid1-chunk0");
        assert_eq!(indexed[11], "vid1-chunk11");
    }

    #[tokio::test]
    async fn test_partial_failure_excluded_not_fatal() {
        let index = FlakyIndex::new(&["vid1-chunk2"]);
        let indexed = batch_index(&index, "user-user1-videos", &chunks(5), 5).await;

        assert_eq!(indexed.len(), 4);
        assert!(!indexed.contains(&"vid1-chunk2".to_string()));
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty() {
        let index = FlakyIndex::new(&[
            "vid1-chunk0",
            "vid1-chunk1",
            "vid1-chunk2",
        ]);
        let indexed = batch_index(&index, "user-user1-videos", &chunks(3), 5).await;
        assert!(indexed.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_capped_at_window_size() {
        let index = FlakyIndex::new(&[]);
        batch_index(&index, "user-user1-videos", &chunks(17), 5).await;

        assert!(index.peak_in_flight.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_empty_chunk_list() {
        let index = FlakyIndex::new(&[]);
        let indexed = batch_index(&index, "user-user1-videos", &[], 5).await;
        assert!(indexed.is_empty());
    }
}
