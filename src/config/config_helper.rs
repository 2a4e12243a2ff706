//! Configuration helper for interpreting config values.
//!
//! The `ConfigHelper` wraps a `Config` and derives the runtime values other
//! components need (socket addresses, durations).

use std::time::Duration;

use super::Config;

/// Helper for interpreting configuration values.
#[derive(Debug, Clone)]
pub struct ConfigHelper {
    config: Config,
}

impl ConfigHelper {
    /// Create a new ConfigHelper wrapping the given config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get a reference to the underlying config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The `host:port` the HTTP server binds to, with optional overrides
    /// for either half.
    pub fn bind_address(&self, host: Option<&str>, port: Option<u16>) -> String {
        format!(
            "{}:{}",
            host.unwrap_or(&self.config.server.host),
            port.unwrap_or(self.config.server.port)
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.openaq.timeout_secs)
    }

    pub fn location_delay(&self) -> Duration {
        Duration::from_millis(self.config.openaq.location_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.config.openaq.page_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.config.scheduler.interval_minutes.saturating_mul(60))
    }
}
