//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Gallery Renamer - rename photos and videos after their capture time
///
/// Groups every file of a directory by name, reads the capture time of each
/// photo or video and renames the whole group (sidecars included) to a
/// date-based name. Without `--yes` an interactive terminal UI lets you
/// review and pick the groups to rename.
#[derive(Parser, Debug, Default)]
#[command(name = "gallery-renamer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory (or single file) to rename
    pub source: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Dry run mode - show what would be renamed without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Rename every group that has a new name without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// How long (ms) a renamed item stays listed
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Number of threads for metadata reading (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Use file modification time when no capture time is found
    #[arg(long)]
    pub mtime_fallback: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source = Some(source.clone());
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.done_display_delay_ms = delay_ms;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.mtime_fallback {
            config.mtime_fallback = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
