//! Transcript extraction with escalating retries.
//!
//! Transcript sources intermittently reject requests based on client
//! fingerprint or cache staleness, so each retry varies the request shape
//! instead of repeating it: attempt 1 uses the default client without cache,
//! attempt 2 switches client identity, attempt 3 re-enables the cache.

use super::{
    FetchOptions, PlayerClient, TranscriptData, TranscriptError, TranscriptSegment,
    TranscriptSource,
};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Retry and validation policy for transcript extraction.
#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    /// Maximum fetch attempts.
    pub max_retries: u32,
    /// Minimum total transcript length in characters.
    pub min_text_chars: usize,
    /// Minimum total transcript duration in seconds.
    pub min_duration_seconds: f64,
    /// Requested caption language (None = best available).
    pub language: Option<String>,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_text_chars: 50,
            min_duration_seconds: 10.0,
            language: None,
        }
    }
}

impl From<&crate::config::TranscriptSettings> for ExtractionPolicy {
    fn from(settings: &crate::config::TranscriptSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            min_text_chars: settings.min_text_chars,
            min_duration_seconds: settings.min_duration_seconds,
            language: settings.language.clone(),
        }
    }
}

impl ExtractionPolicy {
    /// Fetch configuration for a 1-based attempt number.
    pub fn options_for_attempt(&self, attempt: u32) -> FetchOptions {
        let (player_client, use_cache) = match attempt {
            1 => (PlayerClient::Default, false),
            2 => (PlayerClient::Android, false),
            _ => (PlayerClient::Android, true),
        };

        FetchOptions {
            player_client,
            use_cache,
            language: self.language.clone(),
        }
    }
}

/// Fetch a transcript with escalating retries, then validate and normalize.
///
/// Waits `2^attempt` seconds between attempts. The final attempt's error
/// propagates unchanged.
#[instrument(skip(source, policy), fields(video_id = %youtube_id))]
pub async fn extract_with_retry(
    source: &dyn TranscriptSource,
    youtube_id: &str,
    policy: &ExtractionPolicy,
) -> Result<TranscriptData, TranscriptError> {
    let attempts = policy.max_retries.max(1);
    let mut last_error = TranscriptError::NotAvailable;

    for attempt in 1..=attempts {
        let options = policy.options_for_attempt(attempt);
        debug!(
            attempt,
            client = ?options.player_client,
            cache = options.use_cache,
            "Fetching transcript"
        );

        let result = source
            .fetch(youtube_id, &options)
            .await
            .and_then(|segments| validate_and_normalize(segments, policy));

        match result {
            Ok(data) => {
                debug!(
                    attempt,
                    segments = data.segments.len(),
                    duration = data.total_duration(),
                    "Transcript extracted"
                );
                return Ok(data);
            }
            Err(e) => {
                if attempt < attempts {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Transcript fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Validate minimum transcript quality and normalize segments.
///
/// Offsets are already in seconds at this point; normalization trims text,
/// drops empty segments, and clamps negative offsets.
fn validate_and_normalize(
    segments: Vec<TranscriptSegment>,
    policy: &ExtractionPolicy,
) -> Result<TranscriptData, TranscriptError> {
    if segments.is_empty() {
        return Err(TranscriptError::Empty);
    }

    let language = segments
        .first()
        .map(|s| s.language.clone())
        .unwrap_or_else(|| "en".to_string());

    let segments: Vec<TranscriptSegment> = segments
        .into_iter()
        .filter_map(|seg| {
            let text = seg.text.trim().to_string();
            if text.is_empty() || seg.duration <= 0.0 {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start: seg.start.max(0.0),
                duration: seg.duration,
                language: seg.language,
            })
        })
        .collect();

    let data = TranscriptData { segments, language };

    if data.segments.is_empty() {
        return Err(TranscriptError::Empty);
    }

    let chars = data.total_chars();
    if chars < policy.min_text_chars {
        return Err(TranscriptError::TooShort(chars));
    }

    let duration = data.total_duration();
    if duration < policy.min_duration_seconds {
        return Err(TranscriptError::VideoTooShort(duration));
    }

    Ok(data)
}
