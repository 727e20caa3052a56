use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::{ExecutorConfig, SettleConfig};
use crate::scan::ScanConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "page-context",
    version,
    about = "Scan HTML pages into AI-ready page context and replay actions against them"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: page-context.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan an HTML file and print its page context
    Scan {
        /// HTML file to load
        #[arg(long)]
        html: PathBuf,

        /// Output format: json, natural, openapi
        #[arg(long, default_value = "json")]
        format: String,

        /// Maximum scan depth (overrides config)
        #[arg(long)]
        depth: Option<usize>,

        /// Include hidden elements
        #[arg(long)]
        include_hidden: bool,

        /// Maximum number of elements (overrides config)
        #[arg(long)]
        max_elements: Option<usize>,

        /// URL to report for the document (default: file path)
        #[arg(long)]
        url: Option<String>,
    },

    /// Run a JSON batch of action commands against an HTML file
    Exec {
        /// HTML file to load
        #[arg(long)]
        html: PathBuf,

        /// JSON file with an array of commands (or {"commands": [...]})
        #[arg(long)]
        commands: PathBuf,

        /// Append one JSONL trace line per executed command
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Format of the context printed after the batch
        #[arg(long, default_value = "json")]
        format: String,

        /// URL to report for the document (default: file path)
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the tool catalog as JSON
    Tools,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `page-context.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub executor: ExecutorSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSettings {
    #[serde(default = "default_debounce_ms")]
    pub settle_debounce_ms: u64,

    #[serde(default = "default_ceiling_ms")]
    pub settle_ceiling_ms: u64,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            settle_debounce_ms: default_debounce_ms(),
            settle_ceiling_ms: default_ceiling_ms(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl ExecutorSettings {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            settle: SettleConfig {
                debounce: Duration::from_millis(self.settle_debounce_ms),
                ceiling: Duration::from_millis(self.settle_ceiling_ms),
            },
            batch_delay: Duration::from_millis(self.batch_delay_ms),
        }
    }
}

// Serde default helpers
fn default_debounce_ms() -> u64 { 100 }
fn default_ceiling_ms() -> u64 { 300 }
fn default_batch_delay_ms() -> u64 { 50 }

// ============================================================================
// Config File Loading
// ============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "page-context.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load config from a YAML file. A missing default file yields defaults; an
/// explicitly named file must exist. Malformed YAML is always an error.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let explicit = path.is_some();
    let config_path = Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH));

    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Apply CLI overrides on top of the config file's scan section.
pub fn build_scan_config(
    base: &ScanConfig,
    depth: Option<usize>,
    include_hidden: bool,
    max_elements: Option<usize>,
) -> ScanConfig {
    let mut config = base.clone();
    if let Some(depth) = depth {
        config.depth = depth;
    }
    if include_hidden {
        config.include_hidden = true;
    }
    if let Some(max) = max_elements {
        config.max_elements = max;
    }
    config
}
