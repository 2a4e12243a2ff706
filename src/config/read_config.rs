//! Configuration file reading and parsing.
//!
//! This module handles locating, reading, and parsing INI-format configuration files,
//! with support for layered overrides.

use std::env;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

use super::{
    ByteSize, Config, DatabaseConfig, LoggingConfig, OpenAqConfig, SchedulerConfig, ServerConfig,
};

// =============================================================================
// Constants - Default Values
// =============================================================================

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5174,http://127.0.0.1:5174";
const DEFAULT_DATABASE_PATH: &str = "./data/airsafe-db";
const DEFAULT_DATABASE_MAP_SIZE: u64 = 1024 * 1024 * 1024; // 1GB
const DEFAULT_OPENAQ_BASE_URL: &str = "https://api.openaq.org/v3";
const DEFAULT_OPENAQ_COUNTRY: &str = "GH";
const DEFAULT_OPENAQ_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OPENAQ_LOCATION_DELAY_MS: u64 = 2000;
const DEFAULT_OPENAQ_PAGE_DELAY_MS: u64 = 1000;
const DEFAULT_OPENAQ_PARAMETER_CACHE_SIZE: usize = 1024;
const DEFAULT_SCHEDULER_ENABLED: bool = true;
const DEFAULT_SCHEDULER_INTERVAL_MINUTES: u64 = 120;
const DEFAULT_SCHEDULER_LOCATION_LIMIT: usize = 1000;
const MAX_SCHEDULER_INTERVAL_MINUTES: u64 = 60 * 24 * 365;
const DEFAULT_LOGGING_FILTER: &str = "info";

const ENV_CONFIG_FILE: &str = "AIRSAFE_CONFIG_FILE";
const ENV_OPENAQ_API_KEY: &str = "OPENAQ_API_KEY";
const ENV_DATABASE_PATH: &str = "AIRSAFE_DATABASE_PATH";
const DEFAULT_CONFIG_FILENAME: &str = ".airsafe.ini";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid byte size '{value}': {message}")]
    InvalidByteSize { value: String, message: String },

    #[error("invalid integer '{value}' for key '{key}'")]
    InvalidInteger { key: String, value: String },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid value '{value}' for key '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("invalid override key '{key}': {message}")]
    InvalidOverrideKey { key: String, message: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// ConfigSource
// =============================================================================

/// Specifies how to locate and layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Explicit config file path from CLI. If specified and doesn't exist, error.
    /// If None, fall back to AIRSAFE_CONFIG_FILE env var, then ~/.airsafe.ini.
    pub config_file: Option<PathBuf>,

    /// Additional override config file (layered on top of base config).
    pub override_file: Option<PathBuf>,

    /// Individual key=value overrides (applied last).
    /// Keys use dot-notation: "server.port", "openaq.api_key"
    pub overrides: Vec<(String, String)>,
}

// =============================================================================
// ByteSize Parsing
// =============================================================================

impl ByteSize {
    /// Parse a byte size from a string like "100MB", "1GB", "500KB", or plain "1024".
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::InvalidByteSize {
                value: s.to_string(),
                message: "empty string".to_string(),
            });
        }

        let num_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());

        if num_end == 0 {
            return Err(ConfigError::InvalidByteSize {
                value: s.to_string(),
                message: "no numeric value".to_string(),
            });
        }

        let num_str = &s[..num_end];
        let suffix = s[num_end..].trim().to_uppercase();

        let base: u64 = num_str.parse().map_err(|e| ConfigError::InvalidByteSize {
            value: s.to_string(),
            message: format!("invalid number: {}", e),
        })?;

        let multiplier: u64 = match suffix.as_str() {
            "" | "B" => 1,
            "K" | "KB" => 1024,
            "M" | "MB" => 1024 * 1024,
            "G" | "GB" => 1024 * 1024 * 1024,
            "T" | "TB" => 1024 * 1024 * 1024 * 1024,
            _ => {
                return Err(ConfigError::InvalidByteSize {
                    value: s.to_string(),
                    message: format!("unknown suffix '{}'", suffix),
                });
            }
        };

        Ok(ByteSize(base.saturating_mul(multiplier)))
    }
}

// =============================================================================
// Value Parsing
// =============================================================================

fn parse_bool_value(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_int_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInteger {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Parse a comma-separated string into a Vec of trimmed strings.
fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Treat an empty value as "unset".
fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// =============================================================================
// Config File Resolution
// =============================================================================

/// Information about how the config file was resolved.
#[derive(Debug)]
struct ResolvedConfigFile {
    path: Option<PathBuf>,
    /// Warning message if env var pointed to nonexistent file.
    warning: Option<String>,
}

/// Resolve which config file to use based on the ConfigSource and environment.
fn resolve_config_file(
    source: &ConfigSource,
    env_var: &dyn Fn(&str) -> Option<String>,
) -> Result<ResolvedConfigFile> {
    if let Some(ref path) = source.config_file {
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path.clone()),
                warning: None,
            });
        } else {
            return Err(ConfigError::FileNotFound(path.clone()));
        }
    }

    if let Some(env_path) = env_var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path),
                warning: None,
            });
        } else {
            return Ok(ResolvedConfigFile {
                path: None,
                warning: Some(format!(
                    "config file specified by {} does not exist: {}",
                    ENV_CONFIG_FILE, env_path
                )),
            });
        }
    }

    if let Some(home) = env_var("HOME").map(PathBuf::from) {
        let default_path = home.join(DEFAULT_CONFIG_FILENAME);
        if default_path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(default_path),
                warning: None,
            });
        }
    }

    Ok(ResolvedConfigFile {
        path: None,
        warning: None,
    })
}

// =============================================================================
// Default Config
// =============================================================================

/// Create a Config with all default values.
pub fn default_config() -> Config {
    Config {
        server: ServerConfig {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            cors_origins: parse_comma_separated(DEFAULT_CORS_ORIGINS),
        },
        database: DatabaseConfig {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
            map_size: ByteSize(DEFAULT_DATABASE_MAP_SIZE),
        },
        openaq: OpenAqConfig {
            base_url: DEFAULT_OPENAQ_BASE_URL.to_string(),
            api_key: None,
            country: DEFAULT_OPENAQ_COUNTRY.to_string(),
            timeout_secs: DEFAULT_OPENAQ_TIMEOUT_SECS,
            location_delay_ms: DEFAULT_OPENAQ_LOCATION_DELAY_MS,
            page_delay_ms: DEFAULT_OPENAQ_PAGE_DELAY_MS,
            parameter_cache_size: DEFAULT_OPENAQ_PARAMETER_CACHE_SIZE,
        },
        scheduler: SchedulerConfig {
            enabled: DEFAULT_SCHEDULER_ENABLED,
            interval_minutes: DEFAULT_SCHEDULER_INTERVAL_MINUTES,
            location_limit: DEFAULT_SCHEDULER_LOCATION_LIMIT,
        },
        logging: LoggingConfig {
            filter: DEFAULT_LOGGING_FILTER.to_string(),
        },
    }
}

// =============================================================================
// Setting Application
// =============================================================================

/// Apply one `section.key = value` setting to the config.
///
/// Both INI files and command-line overrides go through here, so the two
/// accept exactly the same keys.
fn apply_setting(config: &mut Config, section: &str, param: &str, value: &str) -> Result<()> {
    let key = format!("{}.{}", section, param);
    match (section, param) {
        ("server", "host") => config.server.host = value.trim().to_string(),
        ("server", "port") => config.server.port = parse_int_value(&key, value)?,
        ("server", "cors_origins") => config.server.cors_origins = parse_comma_separated(value),

        ("database", "path") => config.database.path = PathBuf::from(value.trim()),
        ("database", "map_size") => config.database.map_size = ByteSize::parse(value)?,

        ("openaq", "base_url") => {
            config.openaq.base_url = value.trim().trim_end_matches('/').to_string()
        }
        ("openaq", "api_key") => config.openaq.api_key = non_empty(value),
        ("openaq", "country") => config.openaq.country = value.trim().to_uppercase(),
        ("openaq", "timeout_secs") => config.openaq.timeout_secs = parse_int_value(&key, value)?,
        ("openaq", "location_delay_ms") => {
            config.openaq.location_delay_ms = parse_int_value(&key, value)?
        }
        ("openaq", "page_delay_ms") => config.openaq.page_delay_ms = parse_int_value(&key, value)?,
        ("openaq", "parameter_cache_size") => {
            config.openaq.parameter_cache_size = parse_int_value(&key, value)?
        }

        ("scheduler", "enabled") => config.scheduler.enabled = parse_bool_value(&key, value)?,
        ("scheduler", "interval_minutes") => {
            let minutes: u64 = parse_int_value(&key, value)?;
            if !(1..=MAX_SCHEDULER_INTERVAL_MINUTES).contains(&minutes) {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                    message: format!(
                        "interval must be between 1 and {} minutes",
                        MAX_SCHEDULER_INTERVAL_MINUTES
                    ),
                });
            }
            config.scheduler.interval_minutes = minutes;
        }
        ("scheduler", "location_limit") => {
            config.scheduler.location_limit = parse_int_value(&key, value)?
        }

        ("logging", "filter") => config.logging.filter = value.trim().to_string(),

        _ => {
            return Err(ConfigError::InvalidOverrideKey {
                key,
                message: "unknown parameter".to_string(),
            })
        }
    }
    Ok(())
}

/// Apply an INI file's contents to a Config, layering on top of existing values.
fn apply_ini_to_config(config: &mut Config, ini: &Ini) -> Result<()> {
    let Some(map) = ini.get_map() else {
        return Ok(());
    };

    // Sorted so errors are reported deterministically
    let mut sections: Vec<_> = map.into_iter().collect();
    sections.sort_by(|a, b| a.0.cmp(&b.0));

    for (section, entries) in sections {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (param, value) in entries {
            if let Some(value) = value {
                apply_setting(config, &section, &param, &value)?;
            }
        }
    }

    Ok(())
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

/// Apply a single dot-notation `key=value` override to the config.
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key.split_once('.') {
        Some((section, param)) if !section.is_empty() && !param.is_empty() => {
            apply_setting(config, section, param, value)
        }
        _ => Err(ConfigError::InvalidOverrideKey {
            key: key.to_string(),
            message: "unrecognized key format".to_string(),
        }),
    }
}

/// Apply settings that come from well-known environment variables.
fn apply_env(config: &mut Config, env_var: &dyn Fn(&str) -> Option<String>) {
    if let Some(key) = env_var(ENV_OPENAQ_API_KEY).and_then(|v| non_empty(&v)) {
        config.openaq.api_key = Some(key);
    }
    if let Some(path) = env_var(ENV_DATABASE_PATH).and_then(|v| non_empty(&v)) {
        config.database.path = PathBuf::from(path);
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Result of reading configuration, including any warnings.
#[derive(Debug)]
pub struct ConfigResult {
    /// The parsed configuration.
    pub config: Config,
    /// Any warnings generated during config loading.
    pub warnings: Vec<String>,
}

/// Read and parse configuration from the specified sources.
///
/// Configuration is layered in this order:
/// 1. Built-in defaults
/// 2. Base config file (from CLI, env var, or ~/.airsafe.ini)
/// 3. Override config file (if specified)
/// 4. Environment variables (OPENAQ_API_KEY, AIRSAFE_DATABASE_PATH)
/// 5. Individual overrides (applied last)
pub fn read_config(source: &ConfigSource) -> Result<ConfigResult> {
    read_config_with_env(source, &|name| env::var(name).ok())
}

fn read_config_with_env(
    source: &ConfigSource,
    env_var: &dyn Fn(&str) -> Option<String>,
) -> Result<ConfigResult> {
    let mut warnings = Vec::new();
    let mut config = default_config();

    let resolved = resolve_config_file(source, env_var)?;
    if let Some(warning) = resolved.warning {
        warnings.push(warning);
    }
    if let Some(ref path) = resolved.path {
        let ini = load_ini(path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    if let Some(ref override_path) = source.override_file {
        if !override_path.exists() {
            return Err(ConfigError::FileNotFound(override_path.clone()));
        }
        let ini = load_ini(override_path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    apply_env(&mut config, env_var);

    for (key, value) in &source.overrides {
        apply_override(&mut config, key, value)?;
    }

    Ok(ConfigResult { config, warnings })
}

// =============================================================================
// Tests
// =============================================================================
