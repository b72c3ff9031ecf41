use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use coverart_cli::config::{ConfigManager, get_config};
use coverart_cli::output::{FetchReport, OutputFormat, render_stats};
use coverart_cli::service::{self, ArtworkService, FetchMode};
use coverart_core::{Artwork, ArtworkKeys, MediaKind, RequestPolicy, derive_key};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "coverart")]
#[command(author, version, about = "Coverart - Tiered artwork fetching and caching", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve artwork through the memory, cover, disk and network tiers
    Fetch {
        /// Media kind (movie, show, anime, book)
        #[arg(value_parser = parse_kind)]
        kind: MediaKind,

        /// Media identifier
        id: u64,

        /// Size variant (e.g. w500, original)
        #[arg(short, long)]
        size: Option<String>,

        /// Explicit artwork URL, overrides the configured template
        #[arg(short, long)]
        url: Option<String>,

        /// Treat the item as a library title and keep a permanent cover
        #[arg(long)]
        library: bool,

        /// Stream the response body instead of buffering it
        #[arg(long)]
        streamed: bool,

        /// Do not read from the memory cache
        #[arg(long)]
        no_memory_read: bool,

        /// Do not read covers or the disk cache
        #[arg(long)]
        no_disk_read: bool,

        /// Do not write covers or the disk cache
        #[arg(long)]
        no_disk_write: bool,

        /// Write the artwork bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Inspect or clear the disk cache and covers
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show disk cache and cover statistics
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove every disk cache entry
    Clear {
        /// Also delete permanent covers
        #[arg(long)]
        covers: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., network.timeout_seconds)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., artwork.url_template)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,

    /// Print the configuration file path
    Path,
}

fn parse_kind(value: &str) -> Result<MediaKind, String> {
    value.parse().map_err(|e: coverart_core::Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Info)
            .filter_module("coverart_core", log::LevelFilter::Debug)
            .filter_module("coverart_cli", log::LevelFilter::Debug)
            .filter_module("coverart", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Fetch {
            kind,
            id,
            size,
            url,
            library,
            streamed,
            no_memory_read,
            no_disk_read,
            no_disk_write,
            output,
            format,
        } => {
            let mut item = Artwork::new(kind, id).with_in_library(library);
            if let Some(url) = url {
                item = item.with_source_url(url);
            }
            let policy = RequestPolicy::default()
                .with_memory_read(!no_memory_read)
                .with_disk_read(!no_disk_read)
                .with_disk_write(!no_disk_write);
            let mode = if streamed {
                FetchMode::Streamed
            } else {
                FetchMode::Buffered
            };
            fetch_command(item, size, policy, mode, output, format).await?;
        }
        Commands::Cache { command } => {
            cache_command(command).await?;
        }
        Commands::Config { command } => {
            config_command(command)?;
        }
    }

    Ok(())
}

async fn fetch_command(
    mut item: Artwork,
    size: Option<String>,
    policy: RequestPolicy,
    mode: FetchMode,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let config = get_config().context("Failed to load configuration")?;
    // An explicit --size always wins over the configured default
    if let Some(size) = size.or_else(|| config.artwork.default_size.clone()) {
        item = item.with_size(size);
    }

    let key = derive_key(&ArtworkKeys, &item, &policy)?;
    let service = ArtworkService::open(&config, mode).await?;

    let start = Instant::now();
    let result = service.fetch(&item, &policy).await?;
    log::info!(
        "Resolved {key} from {} in {:.2?}",
        result.source,
        start.elapsed()
    );

    if let Some(path) = &output {
        tokio::fs::write(path, result.image.data())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!("{}", FetchReport::new(&key, &result, output).render(format)?);
    Ok(())
}

async fn cache_command(command: CacheCommand) -> Result<()> {
    let config = get_config().context("Failed to load configuration")?;
    let disk = ArtworkService::open_disk(&config).await?;

    match command {
        CacheCommand::Stats { format } => {
            let stats = service::storage_stats(&disk, &config.paths.covers_dir).await?;
            println!("{}", render_stats(&stats, format)?);
        }
        CacheCommand::Clear { covers } => {
            let (entries, cover_files) =
                service::clear_storage(&disk, &config.paths.covers_dir, covers).await?;
            eprintln!("{}", format!("Removed {entries} cache entries").green());
            if covers {
                eprintln!("{}", format!("Removed {cover_files} cover files").green());
            }
        }
    }
    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            println!("{}", manager.get(&key)?);
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());

            let mut current_section = None;
            for (key, value) in items {
                let (section, rest) = key.split_once('.').unwrap_or(("general", key.as_str()));
                if current_section != Some(section.to_string()) {
                    println!();
                    println!("[{}]", section.yellow());
                    current_section = Some(section.to_string());
                }
                println!("  {} = {}", rest.cyan(), value);
            }
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }
    Ok(())
}
