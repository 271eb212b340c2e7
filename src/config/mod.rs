//! Configuration module for Viddex.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, GeneralSettings, IndexingSettings, Settings, TranscriptSettings,
};
