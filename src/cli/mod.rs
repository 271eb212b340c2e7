//! CLI module for Viddex.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Viddex - YouTube Transcript Indexing
///
/// A local-first CLI tool that ingests YouTube transcripts, chunks them for
/// search, and indexes them into a per-user vector search collection.
#[derive(Parser, Debug)]
#[command(name = "viddex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest and index a YouTube video's transcript
    Process {
        /// YouTube URL or video ID
        input: String,

        /// Owner user id
        #[arg(short, long)]
        user: String,

        /// Video title stored on the record (defaults to the video ID)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Re-run ingestion for a failed video
    Retry {
        /// Video record id
        video_id: String,

        /// Owner user id
        #[arg(short, long)]
        user: String,
    },

    /// Delete one video's indexed documents and its record
    Delete {
        /// Video record id
        video_id: String,

        /// Owner user id
        #[arg(short, long)]
        user: String,
    },

    /// Delete a user's entire collection and all their video records
    PurgeUser {
        /// User id to purge
        user_id: String,
    },

    /// List a user's videos and their statuses
    List {
        /// Owner user id
        #[arg(short, long)]
        user: String,
    },

    /// Show one video's status and error, if any
    Status {
        /// Video record id
        video_id: String,

        /// Owner user id
        #[arg(short, long)]
        user: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
