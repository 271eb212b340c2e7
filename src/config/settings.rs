//! Configuration settings for Viddex.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcript: TranscriptSettings,
    pub chunking: ChunkingSettings,
    pub indexing: IndexingSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.viddex".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Transcript extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Maximum fetch attempts against the transcript source.
    pub max_retries: u32,
    /// Minimum total transcript length in characters.
    pub min_text_chars: usize,
    /// Minimum total transcript duration in seconds.
    pub min_duration_seconds: f64,
    /// Preferred caption language (None = first available).
    pub language: Option<String>,
    /// Path to the yt-dlp binary.
    pub ytdlp_path: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_text_chars: 50,
            min_duration_seconds: 10.0,
            language: None,
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

/// Chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target estimated tokens per detailed chunk.
    pub target_tokens: usize,
    /// Minimum estimated tokens per detailed chunk.
    pub min_tokens: usize,
    /// Maximum estimated tokens per detailed chunk.
    pub max_tokens: usize,
    /// Fraction of target tokens carried over as overlap between chunks.
    pub overlap_percentage: f64,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            target_tokens: 375,
            min_tokens: 250,
            max_tokens: 500,
            overlap_percentage: 0.20,
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Base URL of the search index service.
    pub base_url: String,
    /// API key (falls back to the ZEROENTROPY_API_KEY environment variable).
    pub api_key: Option<String>,
    /// Maximum concurrent index pushes per batch window.
    pub concurrency: usize,
    /// Per-step start timeout in seconds.
    pub step_timeout_seconds: u64,
    /// Maximum attempts per pipeline step.
    pub step_retries: u32,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.zeroentropy.dev/v1".to_string(),
            api_key: None,
            concurrency: 5,
            step_timeout_seconds: 300,
            step_retries: 3,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ViddexError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to the default configuration file.
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".viddex")
            .join("config.toml")
    }

    /// Expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.general.data_dir).to_string())
    }

    /// Path to the SQLite database holding videos and the step ledger.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("viddex.db")
    }

    /// Resolve the search index API key from settings or environment.
    pub fn index_api_key(&self) -> Option<String> {
        self.indexing
            .api_key
            .clone()
            .or_else(|| std::env::var("ZEROENTROPY_API_KEY").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.target_tokens, 375);
        assert_eq!(settings.chunking.min_tokens, 250);
        assert_eq!(settings.chunking.max_tokens, 500);
        assert_eq!(settings.indexing.concurrency, 5);
        assert_eq!(settings.transcript.max_retries, 3);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chunking]
            target_tokens = 200
            "#,
        )
        .unwrap();

        assert_eq!(settings.chunking.target_tokens, 200);
        assert_eq!(settings.chunking.max_tokens, 500);
        assert_eq!(settings.general.log_level, "info");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.indexing.concurrency = 3;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.indexing.concurrency, 3);
    }
}
