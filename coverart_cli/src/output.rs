//! Output formatting for command results

use crate::service::StorageStats;
use anyhow::Result;
use colored::Colorize;
use coverart_core::{CacheKey, FetchResult, ImageFormat};
use serde::Serialize;
use std::path::PathBuf;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Printable outcome of `coverart fetch`
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub key: String,
    pub source: String,
    pub format: ImageFormat,
    pub bytes: u64,
    pub saved_to: Option<PathBuf>,
}

impl FetchReport {
    pub fn new(key: &CacheKey, result: &FetchResult, saved_to: Option<PathBuf>) -> Self {
        Self {
            key: key.to_string(),
            source: result.source.to_string(),
            format: result.image.format(),
            bytes: result.image.byte_size(),
            saved_to,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => {
                let mut lines = vec![
                    format!("{} {}", "Source:".bold(), self.source.green()),
                    format!("{}    {}", "Key:".bold(), self.key),
                    format!("{} {}", "Format:".bold(), self.format.extension()),
                    format!("{}  {}", "Bytes:".bold(), self.bytes),
                ];
                if let Some(path) = &self.saved_to {
                    lines.push(format!("{}  {}", "Saved:".bold(), path.display()));
                }
                Ok(lines.join("\n"))
            }
        }
    }
}

/// Render storage statistics
pub fn render_stats(stats: &StorageStats, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(stats)?),
        OutputFormat::Text => Ok([
            format!("{}", "Disk cache".bold().blue()),
            format!("  Directory: {}", stats.cache_dir.display()),
            format!("  Entries:   {}", stats.cache_entries),
            format!(
                "  Size:      {} / {}",
                human_bytes(stats.cache_bytes),
                human_bytes(stats.cache_max_bytes)
            ),
            format!("{}", "Covers".bold().blue()),
            format!("  Directory: {}", stats.covers_dir.display()),
            format!("  Files:     {}", stats.cover_files),
            format!("  Size:      {}", human_bytes(stats.cover_bytes)),
        ]
        .join("\n")),
    }
}

/// Format a byte count with a binary unit
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
