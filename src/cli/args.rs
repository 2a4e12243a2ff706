//! Command-line argument definitions and helpers.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::app::AppContext;
use crate::config::ConfigSource;

use super::Result;

// =============================================================================
// Global Arguments
// =============================================================================

/// Global arguments that apply to all commands.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to the main configuration file.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to the configuration overrides file.
    #[arg(long = "config-file-overrides", global = true)]
    pub config_file_overrides: Option<PathBuf>,

    /// Configuration overrides in the form section.key=value.
    #[arg(long = "config", value_parser = parse_config_override, global = true)]
    pub config_overrides: Vec<(String, String)>,

    /// Format output as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Keep all data in memory instead of opening the database.
    #[arg(long = "in-memory", global = true)]
    pub in_memory: bool,
}

impl GlobalArgs {
    /// Convert to a ConfigSource for reading configuration.
    pub fn to_config_source(&self) -> ConfigSource {
        ConfigSource {
            config_file: self.config_file.clone(),
            override_file: self.config_file_overrides.clone(),
            overrides: self.config_overrides.clone(),
        }
    }

    /// Convert to an AppContext for creating an App.
    pub fn to_app_context(&self) -> AppContext {
        AppContext {
            config_source: self.to_config_source(),
            in_memory: self.in_memory,
            on_config: None,
        }
    }
}

/// Parse a config override from "name=value" format.
fn parse_config_override(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid config override '{}': expected name=value", s))?;
    Ok((name.to_string(), value.to_string()))
}

// =============================================================================
// Output
// =============================================================================

/// Write a command's result to stdout: pretty JSON with `--json`, otherwise
/// the text produced by `text`.
pub async fn write_output<T: Serialize>(
    global: &GlobalArgs,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<()> {
    let output = if global.json {
        serde_json::to_string_pretty(value)?
    } else {
        text(value)
    };
    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.trim_end().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_override() {
        assert_eq!(
            parse_config_override("server.port=9000").unwrap(),
            ("server.port".to_string(), "9000".to_string())
        );
        assert_eq!(
            parse_config_override("a.b=x=y").unwrap(),
            ("a.b".to_string(), "x=y".to_string())
        );
        assert!(parse_config_override("server.port").is_err());
    }
}
