//! The `refresh` command.

use clap::Args;

use crate::app::App;
use crate::cli::{write_output, GlobalArgs, Result};

/// Arguments for the refresh command.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Refresh only this location.
    #[arg(long)]
    pub location: Option<u64>,
}

impl RefreshArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        match self.location {
            Some(id) => {
                let summary = app.ingestor().refresh_location(id).await?;
                write_output(global, &summary, |s| {
                    format!(
                        "location {}: fetched {}, saved {}, skipped {}",
                        s.location_id, s.fetched, s.saved, s.skipped
                    )
                })
                .await
            }
            None => {
                let summary = app.ingestor().refresh_all(None).await?;
                write_output(global, &summary, |s| {
                    format!(
                        "refreshed {}/{} locations ({} with data, {} failed)",
                        s.refreshed, s.locations, s.with_data, s.failed
                    )
                })
                .await
            }
        }
    }
}
