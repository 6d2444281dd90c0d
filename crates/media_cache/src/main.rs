//! media-cache CLI binary.
//!
//! Network-free maintenance of the file_id cache:
//! - Show which assets still need uploading
//! - Look up, list and invalidate cached remote ids

use clap::Parser;
use media_cache::{MediaCacheConfig, TracingConfig, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, handle_clear, handle_invalidate, handle_list, handle_lookup, handle_status,
    };

    // Load .env before anything reads MEDIA_CACHE_* or RUST_LOG
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    init_tracing(TracingConfig::new(log_level).with_json_logs(cli.json_logs))?;

    let config = match &cli.config {
        Some(path) => MediaCacheConfig::from_file(path)?,
        None => MediaCacheConfig::load()?,
    };

    match cli.command {
        Commands::Status => handle_status(&config).await?,
        Commands::Lookup { name } => handle_lookup(&config, &name).await?,
        Commands::List => handle_list(&config).await?,
        Commands::Invalidate { name } => handle_invalidate(&config, &name).await?,
        Commands::Clear => handle_clear(&config).await?,
    }

    Ok(())
}
