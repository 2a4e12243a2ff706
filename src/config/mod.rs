//! Configuration module.

mod config_helper;
mod read_config;
mod types;

pub use config_helper::ConfigHelper;
pub use read_config::{ConfigError, ConfigResult, ConfigSource, default_config, read_config};
pub use types::{
    ByteSize, Config, DatabaseConfig, LoggingConfig, OpenAqConfig, SchedulerConfig, ServerConfig,
};
