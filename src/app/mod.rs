//! Application-level services.

#[allow(clippy::module_inception)]
mod app;
mod reports;

pub use app::{App, AppContext, AppError, Result};
pub use reports::{Forecast, LatestReading, LocationDetail, LocationInspection, SensorLatest};
