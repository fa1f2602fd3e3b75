//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.kindling/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::prefetch::PrefetchMode;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct KindlingConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub log: Option<bool>,
    pub prefetch: Option<PrefetchMode>,
    pub page_transitions: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub prefetch_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

/// Pause before re-running prefetch, so scripts that just ran can render links.
pub const DEFAULT_PREFETCH_DELAY_MS: u64 = 200;
pub const DEFAULT_USER_AGENT: &str = concat!("kindling/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RouterOptions {
    pub log: bool,
    pub prefetch: PrefetchMode,
    pub page_transitions: bool,
    pub prefetch_delay: Duration,
    pub user_agent: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            log: false,
            prefetch: PrefetchMode::None,
            page_transitions: false,
            prefetch_delay: Duration::from_millis(DEFAULT_PREFETCH_DELAY_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub log: Option<bool>,
    pub prefetch: Option<PrefetchMode>,
    pub page_transitions: Option<bool>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.kindling/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kindling").join("config.toml"))
}

/// Load config from `~/.kindling/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `KindlingConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<KindlingConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(KindlingConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(KindlingConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: KindlingConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Kindling Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# log = false                        # Verbose navigation logging (KINDLING_LOG)
# prefetch = "none"                  # "visible", "hover" or "none" (KINDLING_PREFETCH)
# page_transitions = false           # Wrap body swaps in view transitions (KINDLING_PAGE_TRANSITIONS)

# [network]
# prefetch_delay_ms = 200            # Pause before re-running prefetch after a navigation
# user_agent = "kindling/0.1.0"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        warn!("Ignoring {name}={raw:?}: expected a boolean");
    }
    parsed
}

fn env_prefetch() -> Option<PrefetchMode> {
    let raw = std::env::var("KINDLING_PREFETCH").ok()?;
    match raw.parse() {
        Ok(mode) => Some(mode),
        Err(e) => {
            warn!("Ignoring KINDLING_PREFETCH: {e}");
            None
        }
    }
}

/// Resolve the final options by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &KindlingConfig, cli: &CliOverrides) -> RouterOptions {
    let defaults = RouterOptions::default();

    // Log: CLI → env → config → default
    let log = cli
        .log
        .or_else(|| env_bool("KINDLING_LOG"))
        .or(config.general.log)
        .unwrap_or(defaults.log);

    // Prefetch: CLI → env → config → default
    let prefetch = cli
        .prefetch
        .or_else(env_prefetch)
        .or(config.general.prefetch)
        .unwrap_or(defaults.prefetch);

    // Page transitions: CLI → env → config → default
    let page_transitions = cli
        .page_transitions
        .or_else(|| env_bool("KINDLING_PAGE_TRANSITIONS"))
        .or(config.general.page_transitions)
        .unwrap_or(defaults.page_transitions);

    RouterOptions {
        log,
        prefetch,
        page_transitions,
        prefetch_delay: config
            .network
            .prefetch_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.prefetch_delay),
        user_agent: config
            .network
            .user_agent
            .clone()
            .unwrap_or(defaults.user_agent),
    }
}
