//! Backfill subcommands.

use clap::{Args, Subcommand};

use crate::app::App;
use crate::cli::{write_output, GlobalArgs, Result};

// =============================================================================
// Backfill Subcommands
// =============================================================================

/// Backfill subcommands.
#[derive(Subcommand, Debug)]
pub enum BackfillCommand {
    /// Store every location (and its sensors) of a country.
    Locations(LocationsArgs),

    /// Store recent pages of one sensor's measurements.
    Sensor(SensorArgs),

    /// Store the pm25 history of a stored location.
    History(HistoryArgs),
}

impl BackfillCommand {
    /// Run the backfill subcommand.
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        match self {
            BackfillCommand::Locations(args) => args.run(app, global).await,
            BackfillCommand::Sensor(args) => args.run(app, global).await,
            BackfillCommand::History(args) => args.run(app, global).await,
        }
    }
}

// =============================================================================
// Locations
// =============================================================================

#[derive(Args, Debug)]
pub struct LocationsArgs {
    /// ISO country code (defaults to openaq.country).
    #[arg(long)]
    pub country: Option<String>,

    #[arg(long = "page-size", default_value_t = 100)]
    pub page_size: u32,
}

impl LocationsArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        let country = self
            .country
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| app.config().config().openaq.country.clone());
        let summary = app
            .ingestor()
            .backfill_locations(&country, self.page_size)
            .await?;
        write_output(global, &summary, |s| {
            format!(
                "stored {} locations and {} sensors from {} pages",
                s.locations, s.sensors, s.pages
            )
        })
        .await
    }
}

// =============================================================================
// Sensor
// =============================================================================

#[derive(Args, Debug)]
pub struct SensorArgs {
    /// OpenAQ sensor id.
    pub sensor: u64,

    /// Location to record the measurements against.
    #[arg(long)]
    pub location: Option<u64>,

    #[arg(long, default_value_t = 5)]
    pub pages: u32,

    #[arg(long = "page-size", default_value_t = 100)]
    pub page_size: u32,
}

impl SensorArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        let summary = app
            .ingestor()
            .backfill_sensor(self.sensor, self.location, self.pages, self.page_size)
            .await?;
        write_output(global, &summary, |s| {
            format!(
                "sensor {}: fetched {}, saved {}, skipped {} ({} pages)",
                s.sensor_id, s.fetched, s.saved, s.skipped, s.pages
            )
        })
        .await
    }
}

// =============================================================================
// History
// =============================================================================

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Stored location id.
    pub location: u64,

    #[arg(long, default_value_t = 180)]
    pub days: u32,
}

impl HistoryArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        let summary = app
            .ingestor()
            .backfill_history(self.location, self.days)
            .await?;
        write_output(global, &summary, |s| {
            let mut out = format!(
                "location {}: {} measurements over {} days\n",
                s.location_id, s.total, s.days
            );
            for sensor in &s.sensors {
                out.push_str(&format!("  sensor {}: {}\n", sensor.sensor_id, sensor.saved));
            }
            out
        })
        .await
    }
}
