//! Pipeline events, durable step execution, and the job orchestrator.

mod ledger;
mod orchestrator;

pub use ledger::{StepLedger, StepRunner};
pub use orchestrator::Orchestrator;

use crate::video::Video;
use serde::{Deserialize, Serialize};

/// Events consumed at the orchestration boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum PipelineEvent {
    /// A newly queued video is ready for ingestion.
    #[serde(rename = "video.transcript.processing.requested")]
    TranscriptProcessingRequested { video: Video },

    /// A single video's indexed documents should be removed.
    #[serde(rename = "video.documents.deletion.requested")]
    DocumentsDeletionRequested {
        #[serde(rename = "videoId")]
        video_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// A user's entire collection should be removed.
    #[serde(rename = "user.collection.deletion.requested")]
    CollectionDeletionRequested {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Result of handling a pipeline event.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Ingestion finished and the video is READY.
    Completed {
        chunks_indexed: usize,
        collection: String,
    },
    /// The video was marked FAILED with the given reason.
    Failed { reason: String },
    /// A deletion workflow finished.
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Video;

    #[test]
    fn test_event_wire_names() {
        let event = PipelineEvent::DocumentsDeletionRequested {
            video_id: "vid1".to_string(),
            user_id: "user1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "video.documents.deletion.requested");
        assert_eq!(json["data"]["videoId"], "vid1");
        assert_eq!(json["data"]["userId"], "user1");

        let event = PipelineEvent::CollectionDeletionRequested {
            user_id: "user1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "user.collection.deletion.requested");
        assert_eq!(json["data"]["userId"], "user1");
    }

    #[test]
    fn test_processing_event_carries_video() {
        let video = Video::new("user1", "dQw4w9WgXcQ", "Test Video");
        let event = PipelineEvent::TranscriptProcessingRequested {
            video: video.clone(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "video.transcript.processing.requested");
        assert_eq!(json["data"]["video"]["youtubeId"], "dQw4w9WgXcQ");
        assert_eq!(json["data"]["video"]["status"], "PENDING");

        let parsed: PipelineEvent = serde_json::from_value(json).unwrap();
        match parsed {
            PipelineEvent::TranscriptProcessingRequested { video: v } => {
                assert_eq!(v.id, video.id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
