//! Persistent record store built on the key-value layer.

mod keys;
mod records;
#[allow(clippy::module_inception)]
mod store;

pub use records::{
    Coordinates, LocationQuery, LocationRecord, MeasurementRecord, NewWeather, SearchHit,
    SearchQuery, SensorRecord, StoreStats, Upserted, WeatherRecord,
};
pub use store::{Result, Store, StoreError};
