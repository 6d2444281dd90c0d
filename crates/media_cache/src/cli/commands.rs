//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// media-cache - inspect and maintain the uploaded-media file_id cache
#[derive(Parser, Debug)]
#[command(name = "media-cache")]
#[command(about = "Inspect and maintain the uploaded-media file_id cache", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the layered media_cache.toml lookup)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which assets are cached, stale or new (no uploads)
    Status,

    /// Print the remote id recorded for an asset
    Lookup {
        /// Asset name relative to the assets root
        name: String,
    },

    /// List every cache entry
    List,

    /// Forget the remote id of one asset so it is uploaded again
    Invalidate {
        /// Asset name relative to the assets root
        name: String,
    },

    /// Forget every remote id and delete the cache file
    Clear,
}
