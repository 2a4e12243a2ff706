//! Read models the App assembles from the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::forecast::{CurrentConditions, ForecastPoint};
use crate::store::{LocationRecord, MeasurementRecord, SensorRecord};

#[derive(Debug, Clone)]
pub struct SensorLatest {
    pub sensor: SensorRecord,
    pub latest: Option<MeasurementRecord>,
}

#[derive(Debug, Clone)]
pub struct LocationDetail {
    pub location: LocationRecord,
    pub sensors: Vec<SensorLatest>,
}

#[derive(Debug, Clone)]
pub struct LatestReading {
    pub sensor: SensorRecord,
    pub measurement: MeasurementRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub location_id: u64,
    pub generated_at: DateTime<Utc>,
    pub forecast: Vec<ForecastPoint>,
    pub current_conditions: CurrentConditions,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationInspection {
    pub location_id: u64,
    pub name: Option<String>,
    pub pm25_count: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Newest first.
    pub recent: Vec<(DateTime<Utc>, f64)>,
}
