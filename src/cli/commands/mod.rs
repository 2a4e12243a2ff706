mod backfill;
mod inspect;
mod refresh;
mod serve;

pub use backfill::BackfillCommand;
pub use inspect::InspectCommand;
pub use refresh::RefreshArgs;
pub use serve::ServeArgs;

use crate::app::App;
use crate::cli::{write_output, GlobalArgs, Result};

/// The `stats` command.
pub async fn run_stats(app: &App, global: &GlobalArgs) -> Result<()> {
    let stats = app.store().stats().await?;
    write_output(global, &stats, |s| {
        format!(
            "locations: {}\nsensors: {}\nmeasurements: {}\nparameters: {}\nlast updated: {}",
            s.locations,
            s.sensors,
            s.measurements,
            s.parameters_measured,
            s.last_updated
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        )
    })
    .await
}
