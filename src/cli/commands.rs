//! Command implementations.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{Orchestrator, PipelineEvent, PipelineOutcome};
use crate::transcript::extract_video_id;
use anyhow::Result;

/// Run the process command: enqueue a video and drive its ingestion.
pub async fn run_process(
    input: &str,
    user: &str,
    title: Option<String>,
    settings: Settings,
) -> Result<()> {
    let youtube_id = extract_video_id(input)
        .ok_or_else(|| anyhow::anyhow!("Invalid YouTube video ID or URL: {}", input))?;
    let title = title.unwrap_or_else(|| youtube_id.clone());

    let orchestrator = Orchestrator::new(&settings)?;
    let video = orchestrator.enqueue_video(user, &youtube_id, &title).await?;
    Output::info(&format!("Queued video {} ({})", video.id, youtube_id));

    let spinner = Output::spinner("Processing transcript...");
    let outcome = orchestrator
        .handle_event(PipelineEvent::TranscriptProcessingRequested { video })
        .await;
    spinner.finish_and_clear();

    match outcome? {
        PipelineOutcome::Completed {
            chunks_indexed,
            collection,
        } => {
            Output::success(&format!(
                "Indexed {} chunks into {}",
                chunks_indexed, collection
            ));
        }
        PipelineOutcome::Failed { reason } => {
            Output::error(&format!("Processing failed: {}", reason));
        }
        PipelineOutcome::Deleted => {}
    }

    Ok(())
}

/// Run the retry command for a failed video.
pub async fn run_retry(video_id: &str, user: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;

    let spinner = Output::spinner("Retrying...");
    let outcome = orchestrator.retry_video(video_id, user).await;
    spinner.finish_and_clear();

    match outcome? {
        PipelineOutcome::Completed { chunks_indexed, .. } => {
            Output::success(&format!("Indexed {} chunks", chunks_indexed));
        }
        PipelineOutcome::Failed { reason } => {
            Output::error(&format!("Processing failed again: {}", reason));
        }
        PipelineOutcome::Deleted => {}
    }

    Ok(())
}

/// Run the delete command for one video.
pub async fn run_delete(video_id: &str, user: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;

    orchestrator
        .handle_event(PipelineEvent::DocumentsDeletionRequested {
            video_id: video_id.to_string(),
            user_id: user.to_string(),
        })
        .await?;

    Output::success(&format!("Deleted video {}", video_id));
    Ok(())
}

/// Run the purge-user command.
pub async fn run_purge_user(user_id: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;

    orchestrator
        .handle_event(PipelineEvent::CollectionDeletionRequested {
            user_id: user_id.to_string(),
        })
        .await?;

    Output::success(&format!("Deleted collection and videos for user {}", user_id));
    Ok(())
}

/// Run the list command.
pub async fn run_list(user: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;
    let videos = orchestrator.store().list_for_user(user).await?;

    if videos.is_empty() {
        Output::info("No videos yet. Use 'viddex process <input>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Videos ({})", videos.len()));
    println!();
    for video in &videos {
        Output::video_info(
            &video.title,
            &video.id,
            video.status.as_str(),
            video.error.as_deref(),
        );
    }

    Ok(())
}

/// Run the status command for one video.
pub async fn run_status(video_id: &str, user: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;

    let Some(video) = orchestrator.store().get(video_id, user).await? else {
        Output::error(&format!("No video {} for user {}", video_id, user));
        return Ok(());
    };

    Output::header(&video.title);
    Output::kv("Video ID", &video.id);
    Output::kv("YouTube ID", &video.youtube_id);
    Output::kv("Status", video.status.as_str());
    if let Some(error) = &video.error {
        Output::kv("Error", error);
    }
    if let Some(collection) = &video.zeroentropy_collection_id {
        Output::kv("Collection", collection);
    }
    Output::kv("Updated", &video.updated_at.to_rfc3339());

    Ok(())
}

/// Run the config command.
pub fn run_config(action: &crate::cli::ConfigAction, settings: &Settings) -> Result<()> {
    match action {
        crate::cli::ConfigAction::Show => {
            let content = toml::to_string_pretty(settings)?;
            println!("{}", content);
        }
        crate::cli::ConfigAction::Path => {
            println!("{}", Settings::default_config_path().display());
        }
    }
    Ok(())
}
