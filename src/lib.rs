//! Viddex - YouTube Transcript Indexing
//!
//! A local-first CLI tool for turning YouTube transcripts into a searchable
//! vector index.
//!
//! # Overview
//!
//! Viddex lets you:
//! - Fetch a video's transcript with escalating retries
//! - Chunk it into token-bounded, overlapping units at two granularities
//! - Index the chunks into a per-user collection of a vector search service
//! - Track each video through a durable, resumable multi-stage lifecycle
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `transcript` - Transcript fetching, retries, and validation
//! - `chunking` - Two-level transcript chunking
//! - `video` - Video records, status state machine, and store
//! - `index` - Search index interface and batch indexing
//! - `pipeline` - Events, durable steps, and the job orchestrator
//!
//! # Example
//!
//! ```rust,no_run
//! use viddex::config::Settings;
//! use viddex::pipeline::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let video = orchestrator
//!         .enqueue_video("user1", "dQw4w9WgXcQ", "A video")
//!         .await?;
//!     let outcome = orchestrator.process_video(&video).await?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod transcript;
pub mod video;

pub use error::{Result, ViddexError};
