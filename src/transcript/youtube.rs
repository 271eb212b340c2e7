//! YouTube transcript source backed by yt-dlp.
//!
//! Caption tracks are discovered with `yt-dlp --dump-json`; the selected
//! json3 track is then downloaded over HTTP and parsed into segments with
//! offsets normalized from milliseconds to seconds.

use super::{FetchOptions, PlayerClient, TranscriptError, TranscriptSegment};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Extract a YouTube video ID from a URL or bare 11-character ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    static VIDEO_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = VIDEO_ID_REGEX.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    });

    let caps = regex.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// YouTube transcript source using yt-dlp for caption-track discovery.
pub struct YtDlpTranscriptSource {
    ytdlp_path: String,
    http: reqwest::Client,
}

impl YtDlpTranscriptSource {
    pub fn new(ytdlp_path: &str) -> Self {
        Self {
            ytdlp_path: ytdlp_path.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Run yt-dlp and return the parsed metadata JSON.
    async fn fetch_metadata(
        &self,
        video_id: &str,
        options: &FetchOptions,
    ) -> Result<serde_json::Value, TranscriptError> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let mut args = vec![
            "--dump-json".to_string(),
            "--no-download".to_string(),
            "--no-warnings".to_string(),
        ];
        if !options.use_cache {
            args.push("--no-cache-dir".to_string());
        }
        if options.player_client == PlayerClient::Android {
            args.push("--extractor-args".to_string());
            args.push("youtube:player_client=android".to_string());
        }
        args.push(url);

        let output = tokio::process::Command::new(&self.ytdlp_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscriptError::ToolNotFound(self.ytdlp_path.clone())
                } else {
                    TranscriptError::Extraction(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, video_id));
        }

        serde_json::from_str(&String::from_utf8_lossy(&output.stdout))
            .map_err(|e| TranscriptError::Extraction(format!("Failed to parse yt-dlp output: {}", e)))
    }

    /// Download and parse the selected caption track.
    async fn fetch_track(
        &self,
        url: &str,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let body = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TranscriptError::Extraction(format!("Caption download failed: {}", e)))?
            .text()
            .await
            .map_err(|e| TranscriptError::Extraction(format!("Caption download failed: {}", e)))?;

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TranscriptError::Extraction(format!("Invalid caption payload: {}", e)))?;

        Ok(parse_json3(&json, language))
    }
}

#[async_trait]
impl super::TranscriptSource for YtDlpTranscriptSource {
    #[instrument(skip(self), fields(video_id = %youtube_id))]
    async fn fetch(
        &self,
        youtube_id: &str,
        options: &FetchOptions,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let video_id = extract_video_id(youtube_id)
            .ok_or_else(|| TranscriptError::InvalidVideoId(youtube_id.to_string()))?;

        let metadata = self.fetch_metadata(&video_id, options).await?;
        let (track_url, language) = select_track(&metadata, options.language.as_deref())?;

        debug!(language = %language, "Downloading caption track");
        self.fetch_track(&track_url, &language).await
    }
}

/// Map a yt-dlp failure to the extraction error taxonomy.
fn classify_failure(stderr: &str, video_id: &str) -> TranscriptError {
    let lower = stderr.to_lowercase();

    if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("this video has been removed")
    {
        TranscriptError::VideoUnavailable
    } else if lower.contains("429") || lower.contains("too many requests") {
        TranscriptError::RateLimited
    } else if lower.contains("incomplete youtube id") || lower.contains("is not a valid url") {
        TranscriptError::InvalidVideoId(video_id.to_string())
    } else {
        let first_line = stderr.lines().next().unwrap_or("unknown error").trim();
        TranscriptError::Extraction(first_line.to_string())
    }
}

/// Pick a caption track from yt-dlp metadata.
///
/// Manually uploaded subtitles are preferred over automatic captions; within a
/// track list the json3 format is required. With no requested language the
/// selection prefers English, then the alphabetically first available tag so
/// repeated fetches stay deterministic.
fn select_track(
    metadata: &serde_json::Value,
    requested: Option<&str>,
) -> Result<(String, String), TranscriptError> {
    let subtitles = metadata.get("subtitles").and_then(|v| v.as_object());
    let automatic = metadata
        .get("automatic_captions")
        .and_then(|v| v.as_object());

    let has_any = |map: Option<&serde_json::Map<String, serde_json::Value>>| {
        map.is_some_and(|m| !m.is_empty())
    };
    if !has_any(subtitles) && !has_any(automatic) {
        return Err(TranscriptError::CaptionsDisabled);
    }

    let lookup = |language: &str| -> Option<(String, String)> {
        for map in [subtitles, automatic].into_iter().flatten() {
            if let Some(url) = json3_url(map.get(language)) {
                return Some((url, language.to_string()));
            }
        }
        None
    };

    if let Some(language) = requested {
        return lookup(language)
            .ok_or_else(|| TranscriptError::LanguageUnavailable(language.to_string()));
    }

    if let Some(found) = lookup("en") {
        return Ok(found);
    }

    let mut languages: Vec<&String> = subtitles
        .into_iter()
        .chain(automatic)
        .flat_map(|m| m.keys())
        .collect();
    languages.sort();

    languages
        .into_iter()
        .find_map(|language| lookup(language))
        .ok_or(TranscriptError::NotAvailable)
}

/// Find the json3 format URL in a caption track list.
fn json3_url(track: Option<&serde_json::Value>) -> Option<String> {
    track?
        .as_array()?
        .iter()
        .find(|entry| entry.get("ext").and_then(|e| e.as_str()) == Some("json3"))
        .and_then(|entry| entry.get("url").and_then(|u| u.as_str()))
        .map(|u| u.to_string())
}

/// Parse a json3 caption payload into segments with second-based offsets.
fn parse_json3(json: &serde_json::Value, language: &str) -> Vec<TranscriptSegment> {
    let Some(events) = json.get("events").and_then(|e| e.as_array()) else {
        return Vec::new();
    };

    events
        .iter()
        .filter_map(|event| {
            let start_ms = event.get("tStartMs")?.as_f64()?;
            let duration_ms = event.get("dDurationMs").and_then(|d| d.as_f64())?;
            if duration_ms <= 0.0 {
                return None;
            }

            let text: String = event
                .get("segs")?
                .as_array()?
                .iter()
                .filter_map(|seg| seg.get("utf8").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .concat();

            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }

            Some(TranscriptSegment {
                text,
                start: start_ms / 1000.0,
                duration: duration_ms / 1000.0,
                language: language.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("ERROR: Video unavailable", "abc"),
            TranscriptError::VideoUnavailable
        );
        assert_eq!(
            classify_failure("ERROR: Private video. Sign in", "abc"),
            TranscriptError::VideoUnavailable
        );
        assert_eq!(
            classify_failure("HTTP Error 429: Too Many Requests", "abc"),
            TranscriptError::RateLimited
        );
        assert_eq!(
            classify_failure("ERROR: Incomplete YouTube ID abc", "abc"),
            TranscriptError::InvalidVideoId("abc".to_string())
        );
        assert!(matches!(
            classify_failure("ERROR: something else", "abc"),
            TranscriptError::Extraction(_)
        ));
    }

    fn track_entry(ext: &str, url: &str) -> serde_json::Value {
        json!({ "ext": ext, "url": url })
    }

    #[test]
    fn test_select_track_prefers_subtitles_and_requested_language() {
        let metadata = json!({
            "subtitles": {
                "no": [track_entry("json3", "http://subs/no")],
            },
            "automatic_captions": {
                "no": [track_entry("json3", "http://auto/no")],
                "en": [track_entry("json3", "http://auto/en")],
            }
        });

        let (url, language) = select_track(&metadata, Some("no")).unwrap();
        assert_eq!(url, "http://subs/no");
        assert_eq!(language, "no");

        let (url, language) = select_track(&metadata, None).unwrap();
        assert_eq!(url, "http://auto/en");
        assert_eq!(language, "en");
    }

    #[test]
    fn test_select_track_errors() {
        let disabled = json!({ "subtitles": {}, "automatic_captions": {} });
        assert_eq!(
            select_track(&disabled, None),
            Err(TranscriptError::CaptionsDisabled)
        );

        let metadata = json!({
            "automatic_captions": { "de": [track_entry("json3", "http://auto/de")] }
        });
        assert_eq!(
            select_track(&metadata, Some("fr")),
            Err(TranscriptError::LanguageUnavailable("fr".to_string()))
        );

        // Tracks exist but none in json3 format
        let vtt_only = json!({
            "automatic_captions": { "en": [track_entry("vtt", "http://auto/en.vtt")] }
        });
        assert_eq!(select_track(&vtt_only, None), Err(TranscriptError::NotAvailable));
    }

    #[test]
    fn test_select_track_falls_back_to_first_language() {
        let metadata = json!({
            "automatic_captions": {
                "sv": [track_entry("json3", "http://auto/sv")],
                "de": [track_entry("json3", "http://auto/de")],
            }
        });

        let (url, language) = select_track(&metadata, None).unwrap();
        assert_eq!(url, "http://auto/de");
        assert_eq!(language, "de");
    }

    #[test]
    fn test_parse_json3() {
        let payload = json!({
            "events": [
                { "tStartMs": 0, "dDurationMs": 2500, "segs": [{ "utf8": "hello " }, { "utf8": "world" }] },
                { "tStartMs": 2500, "dDurationMs": 1500, "segs": [{ "utf8": "\n" }] },
                { "tStartMs": 4000, "segs": [{ "utf8": "no duration" }] },
                { "tStartMs": 5000, "dDurationMs": 2000, "segs": [{ "utf8": "again" }] },
            ]
        });

        let segments = parse_json3(&payload, "en");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.5);
        assert_eq!(segments[1].text, "again");
        assert_eq!(segments[1].start, 5.0);
        assert_eq!(segments[1].language, "en");
    }

    #[test]
    fn test_parse_json3_empty() {
        assert!(parse_json3(&json!({}), "en").is_empty());
        assert!(parse_json3(&json!({ "events": [] }), "en").is_empty());
    }
}
