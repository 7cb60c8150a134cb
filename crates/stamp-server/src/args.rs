use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

/// Fields settable from a TOML config file (spec.md §1.4); every field also
/// has a CLI flag, which takes precedence when both are given.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    authority: Option<String>,
    tick_interval_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    small_subtree_threshold: Option<u64>,
    head_queue_depth: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct Args {
    /// Use verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML config file; CLI flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// The authority name stamped into every compact head and proof
    #[arg(long)]
    authority: Option<String>,

    /// How often the scheduler seals a new interval
    #[arg(long)]
    tick_interval_secs: Option<u64>,

    /// How long a cached main-tree node is trusted before being recomputed
    #[arg(long)]
    cache_ttl_secs: Option<u64>,

    /// Subtrees this size or smaller are never written to the node cache
    #[arg(long)]
    small_subtree_threshold: Option<u64>,

    /// How many recent heads a late subscriber can drain on reconnect
    #[arg(long)]
    head_queue_depth: Option<usize>,
}

/// The scheduler's resolved configuration (spec.md §1.4), after merging a
/// config file (if any) with CLI overrides and defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub authority: String,
    pub tick_interval: Duration,
    pub cache_ttl: Duration,
    pub small_subtree_threshold: u64,
    pub head_queue_depth: usize,
}

impl Args {
    pub fn init_tracing(&self) {
        let level_filter = match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level_filter.to_string())),
            )
            .init();
    }

    pub fn resolve_config(&self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        let authority = self
            .authority
            .clone()
            .or(file.authority)
            .context("authority must be set via --authority or the config file")?;

        Ok(Config {
            authority,
            tick_interval: Duration::from_secs(
                self.tick_interval_secs.or(file.tick_interval_secs).unwrap_or(3),
            ),
            cache_ttl: Duration::from_secs(
                self.cache_ttl_secs
                    .or(file.cache_ttl_secs)
                    .unwrap_or(24 * 60 * 60),
            ),
            small_subtree_threshold: self
                .small_subtree_threshold
                .or(file.small_subtree_threshold)
                .unwrap_or(stamp_cache::DEFAULT_SMALL_SUBTREE_THRESHOLD),
            head_queue_depth: self
                .head_queue_depth
                .or(file.head_queue_depth)
                .unwrap_or(stamp_scheduler::DEFAULT_HEAD_QUEUE_DEPTH),
        })
    }
}
