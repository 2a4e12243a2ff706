//! Configuration types for airsafe.
//!
//! This module defines the structures used to represent application configuration
//! as parsed from an INI-format config file.

use std::path::PathBuf;

// =============================================================================
// Primitive Types
// =============================================================================

/// A byte size that can be parsed from strings like "100MB", "1GB", etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

// =============================================================================
// Config Sections
// =============================================================================

/// [server] section - HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS, with credentials.
    pub cors_origins: Vec<String>,
}

/// [database] section - embedded store location.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub map_size: ByteSize,
}

/// [openaq] section - upstream API access.
#[derive(Debug, Clone)]
pub struct OpenAqConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// ISO country code used for location listings and scheduled refreshes.
    pub country: String,
    pub timeout_secs: u64,
    /// Pause between locations during a full refresh.
    pub location_delay_ms: u64,
    /// Pause between pages during backfills.
    pub page_delay_ms: u64,
    pub parameter_cache_size: usize,
}

/// [scheduler] section - periodic refresh of latest measurements.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub location_limit: usize,
}

/// [logging] section.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// A `tracing_subscriber::EnvFilter` directive string.
    pub filter: String,
}

// =============================================================================
// Top-Level Config
// =============================================================================

/// Complete application configuration as parsed from config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub openaq: OpenAqConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}
