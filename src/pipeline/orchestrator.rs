//! Job orchestrator for ingestion and deletion pipelines.
//!
//! Runs each video's ingestion as an ordered sequence of durable steps and
//! drives the status state machine. The orchestrator is the only writer of
//! FAILED status, and writes it at exactly two points: transcript extraction
//! failure and zero successfully indexed chunks.

use super::ledger::{StepLedger, StepRunner};
use super::{PipelineEvent, PipelineOutcome};
use crate::chunking::{chunk_transcript, Chunk, DetailedChunkingConfig, VideoContext};
use crate::config::Settings;
use crate::error::{Result, ViddexError};
use crate::index::{batch_index, collection_name, ChunkRef, SearchIndex, ZeroEntropyClient};
use crate::transcript::{
    extract_with_retry, ExtractionPolicy, TranscriptData, TranscriptSource, YtDlpTranscriptSource,
};
use crate::video::{SqliteVideoStore, Video, VideoStatus, VideoStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Extraction step result persisted in the step ledger.
///
/// Permanent content errors are recorded as a value rather than thrown, so
/// the step runner does not burn retry attempts on failures that can never
/// succeed.
#[derive(Debug, Serialize, Deserialize)]
enum ExtractStepResult {
    Extracted(TranscriptData),
    Unrecoverable { reason: String },
}

/// The main orchestrator for Viddex pipelines.
pub struct Orchestrator {
    store: Arc<dyn VideoStore>,
    transcripts: Arc<dyn TranscriptSource>,
    index: Arc<dyn SearchIndex>,
    steps: StepRunner,
    extraction: ExtractionPolicy,
    chunking: DetailedChunkingConfig,
    concurrency: usize,
}

impl Orchestrator {
    /// Create a new orchestrator with default components.
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.index_api_key().ok_or_else(|| {
            ViddexError::Config(
                "No search index API key; set indexing.api_key or ZEROENTROPY_API_KEY".to_string(),
            )
        })?;

        let store = Arc::new(SqliteVideoStore::new(&settings.database_path())?);
        let ledger = Arc::new(StepLedger::new(&settings.database_path())?);
        let transcripts = Arc::new(YtDlpTranscriptSource::new(&settings.transcript.ytdlp_path));
        let index = Arc::new(ZeroEntropyClient::new(
            &settings.indexing.base_url,
            &api_key,
        )?);

        Ok(Self::with_components(
            store,
            transcripts,
            index,
            ledger,
            settings,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        store: Arc<dyn VideoStore>,
        transcripts: Arc<dyn TranscriptSource>,
        index: Arc<dyn SearchIndex>,
        ledger: Arc<StepLedger>,
        settings: &Settings,
    ) -> Self {
        let steps = StepRunner::new(
            ledger,
            settings.indexing.step_retries,
            Duration::from_secs(settings.indexing.step_timeout_seconds),
        );

        Self {
            store,
            transcripts,
            index,
            steps,
            extraction: ExtractionPolicy::from(&settings.transcript),
            chunking: DetailedChunkingConfig::from(&settings.chunking),
            concurrency: settings.indexing.concurrency,
        }
    }

    /// The video store (for callers that read or enqueue records).
    pub fn store(&self) -> Arc<dyn VideoStore> {
        self.store.clone()
    }

    /// Create a video record and move it to QUEUED, ready for ingestion.
    pub async fn enqueue_video(
        &self,
        user_id: &str,
        youtube_id: &str,
        title: &str,
    ) -> Result<Video> {
        let video = Video::new(user_id, youtube_id, title);
        self.store.insert(&video).await?;
        self.store
            .update_status(&video.id, user_id, VideoStatus::Queued)
            .await?;

        self.store
            .get(&video.id, user_id)
            .await?
            .ok_or_else(|| ViddexError::VideoNotFound(video.id.clone()))
    }

    /// Handle one pipeline event.
    pub async fn handle_event(&self, event: PipelineEvent) -> Result<PipelineOutcome> {
        match event {
            PipelineEvent::TranscriptProcessingRequested { video } => {
                self.process_video(&video).await
            }
            PipelineEvent::DocumentsDeletionRequested { video_id, user_id } => {
                self.delete_video_documents(&video_id, &user_id).await?;
                Ok(PipelineOutcome::Deleted)
            }
            PipelineEvent::CollectionDeletionRequested { user_id } => {
                self.delete_user_collection(&user_id).await?;
                Ok(PipelineOutcome::Deleted)
            }
        }
    }

    /// Run the ingestion pipeline for one video.
    #[instrument(skip(self, video), fields(video_id = %video.id, youtube_id = %video.youtube_id))]
    pub async fn process_video(&self, video: &Video) -> Result<PipelineOutcome> {
        let job_id = format!("ingest-{}", video.id);
        let id = video.id.as_str();
        let user = video.user_id.as_str();

        self.steps
            .run(&job_id, "set-status-processing", || async move {
                self.store
                    .update_status(id, user, VideoStatus::Processing)
                    .await
            })
            .await?;

        self.steps
            .run(&job_id, "set-status-transcript-extracting", || async move {
                self.store
                    .update_status(id, user, VideoStatus::TranscriptExtracting)
                    .await
            })
            .await?;

        let extracted = self
            .steps
            .run(&job_id, "extract-transcript", || async move {
                match extract_with_retry(
                    self.transcripts.as_ref(),
                    &video.youtube_id,
                    &self.extraction,
                )
                .await
                {
                    Ok(data) => Ok(ExtractStepResult::Extracted(data)),
                    Err(e) if e.is_permanent() => Ok(ExtractStepResult::Unrecoverable {
                        reason: e.to_string(),
                    }),
                    Err(e) => Err(ViddexError::from(e)),
                }
            })
            .await;

        let transcript = match extracted {
            Ok(ExtractStepResult::Extracted(data)) => data,
            Ok(ExtractStepResult::Unrecoverable { reason }) => {
                return self.fail_video(id, user, reason).await;
            }
            Err(e) => {
                let reason = root_message(&e);
                return self.fail_video(id, user, reason).await;
            }
        };

        self.steps
            .run(&job_id, "set-status-zeroentropy-processing", || async move {
                self.store
                    .update_status(id, user, VideoStatus::ZeroentropyProcessing)
                    .await
            })
            .await?;

        let video_duration = transcript.total_duration();
        let transcript_ref = &transcript;
        let chunks: Vec<Chunk> = self
            .steps
            .run(&job_id, "chunk-transcript", || async move {
                let context = VideoContext {
                    user_id: video.user_id.clone(),
                    video_id: video.id.clone(),
                    video_title: video.title.clone(),
                    language: transcript_ref.language.clone(),
                };
                Ok(chunk_transcript(
                    transcript_ref,
                    &context,
                    video_duration,
                    &self.chunking,
                ))
            })
            .await?;

        let collection: String = self
            .steps
            .run(&job_id, "resolve-collection", || async move {
                let name = collection_name(user);
                self.index.ensure_collection(&name).await?;
                Ok(name)
            })
            .await?;

        let collection_ref = collection.as_str();
        let chunk_list = chunks.as_slice();
        let indexed: Vec<String> = self
            .steps
            .run(&job_id, "index-chunks", || async move {
                Ok(batch_index(
                    self.index.as_ref(),
                    collection_ref,
                    chunk_list,
                    self.concurrency,
                )
                .await)
            })
            .await?;

        if indexed.is_empty() {
            let reason = ViddexError::NothingIndexed.to_string();
            return self.fail_video(id, user, reason).await;
        }
        if indexed.len() < chunks.len() {
            warn!(
                indexed = indexed.len(),
                total = chunks.len(),
                "Some chunks failed to index"
            );
        }

        self.steps
            .run(&job_id, "finalize", || async move {
                self.store.set_collection(id, user, collection_ref).await?;
                self.store.update_status(id, user, VideoStatus::Ready).await
            })
            .await?;

        info!(
            chunks = indexed.len(),
            collection = %collection,
            "Video indexed and ready"
        );

        Ok(PipelineOutcome::Completed {
            chunks_indexed: indexed.len(),
            collection,
        })
    }

    /// Delete one video's indexed documents, then its store row.
    #[instrument(skip(self))]
    pub async fn delete_video_documents(&self, video_id: &str, user_id: &str) -> Result<()> {
        let job_id = format!("delete-video-{}", video_id);
        let collection = collection_name(user_id);
        let collection_ref = collection.as_str();

        let paths: Vec<String> = self
            .steps
            .run(&job_id, "list-documents", || async move {
                let all = self.index.list_documents(collection_ref).await?;
                Ok(all
                    .into_iter()
                    .filter(|path| ChunkRef::parse(path, video_id).is_some())
                    .collect())
            })
            .await?;

        let path_list = paths.as_slice();
        self.steps
            .run(&job_id, "delete-documents", || async move {
                for path in path_list {
                    self.index.delete_document(collection_ref, path).await?;
                }
                Ok(())
            })
            .await?;

        self.steps
            .run(&job_id, "delete-video-row", || async move {
                // A missing row is already deleted
                self.store.delete(video_id, user_id).await.map(|_| ())
            })
            .await?;

        info!(documents = paths.len(), "Video documents deleted");
        Ok(())
    }

    /// Delete a user's entire collection, then all their video rows.
    #[instrument(skip(self))]
    pub async fn delete_user_collection(&self, user_id: &str) -> Result<()> {
        let job_id = format!("delete-user-{}", user_id);

        self.steps
            .run(&job_id, "delete-collection", || async move {
                self.index.delete_collection(&collection_name(user_id)).await
            })
            .await?;

        let removed: usize = self
            .steps
            .run(&job_id, "delete-video-rows", || async move {
                self.store.delete_all_for_user(user_id).await
            })
            .await?;

        info!(videos = removed, "User collection deleted");
        Ok(())
    }

    /// Re-trigger ingestion for a FAILED video.
    ///
    /// Clears the ingest job's step ledger and requeues the video before
    /// running the pipeline again from the start.
    #[instrument(skip(self))]
    pub async fn retry_video(&self, video_id: &str, user_id: &str) -> Result<PipelineOutcome> {
        let video = self
            .store
            .get(video_id, user_id)
            .await?
            .ok_or_else(|| ViddexError::VideoNotFound(video_id.to_string()))?;

        if video.status != VideoStatus::Failed {
            return Err(ViddexError::InvalidInput(format!(
                "Video {} is {}, only FAILED videos can be retried",
                video_id, video.status
            )));
        }

        self.steps.ledger().clear_job(&format!("ingest-{}", video_id))?;
        self.store
            .update_status(video_id, user_id, VideoStatus::Queued)
            .await?;

        let video = self
            .store
            .get(video_id, user_id)
            .await?
            .ok_or_else(|| ViddexError::VideoNotFound(video_id.to_string()))?;

        self.process_video(&video).await
    }

    async fn fail_video(
        &self,
        video_id: &str,
        user_id: &str,
        reason: String,
    ) -> Result<PipelineOutcome> {
        warn!(video_id, reason = %reason, "Marking video FAILED");
        self.store.mark_failed(video_id, user_id, &reason).await?;
        Ok(PipelineOutcome::Failed { reason })
    }
}

/// The message of the error that actually failed a step, unwrapping the
/// step-exhaustion wrapper.
fn root_message(error: &ViddexError) -> String {
    match error {
        ViddexError::StepExhausted { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}
