//! Configuration for the textanchor engine.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (TEXTANCHOR_SETTLE_DELAY_MS, TEXTANCHOR_NOTIFICATION_MS)
//! 2. Config file (.textanchor/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - TEXTANCHOR_CONFIG names the file explicitly
//! - Otherwise searches current directory and parents for .textanchor/config.yaml
//! - Finally falls back to the user config dir (textanchor/config.yaml)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::anchor::MatchSettings;
use crate::core::{DEFAULT_JOURNAL_CAPACITY, DEFAULT_SETTLE_DELAY_MS};
use crate::highlight::{MarkerClasses, DEFAULT_NOTIFICATION_MS, MAX_QUERY_MARKS};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const CONFIG_ENV: &str = "TEXTANCHOR_CONFIG";
pub const SETTLE_DELAY_ENV: &str = "TEXTANCHOR_SETTLE_DELAY_MS";
pub const NOTIFICATION_ENV: &str = "TEXTANCHOR_NOTIFICATION_MS";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub matching: Option<MatchSettings>,
    #[serde(default)]
    pub markers: Option<MarkerClasses>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Pause before resolving a highlight request
    pub settle_delay_ms: Option<u64>,
    /// Lifetime of the notification overlay
    pub notification_ms: Option<u64>,
    /// Cap on wrapped occurrences in query mode
    pub max_query_marks: Option<usize>,
    /// Journal events kept in memory
    pub journal_capacity: Option<usize>,
}

/// Resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub settle_delay_ms: u64,
    pub notification_ms: u64,
    pub max_query_marks: usize,
    pub journal_capacity: usize,
    pub matching: MatchSettings,
    pub classes: MarkerClasses,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            notification_ms: DEFAULT_NOTIFICATION_MS,
            max_query_marks: MAX_QUERY_MARKS,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            matching: MatchSettings::default(),
            classes: MarkerClasses::default(),
        }
    }
}

/// Find config file: explicit env path, then cwd and parents, then user config dir
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(explicit));
    }

    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".textanchor").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("textanchor").join("config.yaml"))
        .filter(|path| path.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a millisecond override from the environment
fn env_millis(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    env(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a whole number of milliseconds, got {:?}", name, raw))
        })
        .transpose()
}

/// Merge a parsed file, environment lookups and defaults
fn resolve(
    file: Option<ConfigFile>,
    config_file: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let defaults = ResolvedConfig::default();
    let (engine, matching, classes) = match file {
        Some(file) => (
            file.engine,
            file.matching.unwrap_or(defaults.matching),
            file.markers.unwrap_or(defaults.classes),
        ),
        None => (EngineConfig::default(), defaults.matching, defaults.classes),
    };

    if !(0.0..=1.0).contains(&matching.fuzzy_threshold) {
        anyhow::bail!(
            "matching.fuzzy_threshold must be within [0, 1], got {}",
            matching.fuzzy_threshold
        );
    }

    let settle_delay_ms = env_millis(&env, SETTLE_DELAY_ENV)?
        .or(engine.settle_delay_ms)
        .unwrap_or(defaults.settle_delay_ms);
    let notification_ms = env_millis(&env, NOTIFICATION_ENV)?
        .or(engine.notification_ms)
        .unwrap_or(defaults.notification_ms);

    Ok(ResolvedConfig {
        config_file,
        settle_delay_ms,
        notification_ms,
        max_query_marks: engine.max_query_marks.unwrap_or(defaults.max_query_marks),
        journal_capacity: engine.journal_capacity.unwrap_or(defaults.journal_capacity),
        matching,
        classes,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };
    resolve(file, config_file, |name| std::env::var(name).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
