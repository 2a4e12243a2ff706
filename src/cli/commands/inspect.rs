//! Inspect subcommands.

use clap::{Args, Subcommand};

use crate::app::App;
use crate::cli::{write_output, GlobalArgs, Result};

/// Inspect subcommands.
#[derive(Subcommand, Debug)]
pub enum InspectCommand {
    /// Summarise the pm25 history stored for a location.
    Location(InspectLocationArgs),
}

impl InspectCommand {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        match self {
            InspectCommand::Location(args) => args.run(app, global).await,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectLocationArgs {
    /// Location id.
    pub id: u64,
}

impl InspectLocationArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        let inspection = app.inspect_location(self.id).await?;
        write_output(global, &inspection, |i| {
            let mut out = format!(
                "location {} ({})\n",
                i.location_id,
                i.name.as_deref().unwrap_or("unnamed")
            );
            out.push_str(&format!("pm25 measurements: {}\n", i.pm25_count));
            if let (Some(oldest), Some(newest)) = (i.oldest, i.newest) {
                out.push_str(&format!("range: {} .. {}\n", oldest.to_rfc3339(), newest.to_rfc3339()));
            }
            if !i.recent.is_empty() {
                out.push_str("most recent:\n");
                for (ts, value) in &i.recent {
                    out.push_str(&format!("  {}  {:.2}\n", ts.to_rfc3339(), value));
                }
            }
            out
        })
        .await
    }
}
