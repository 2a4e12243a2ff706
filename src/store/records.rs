//! Records persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A monitoring location, as last reported by OpenAQ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: u64,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default)]
    pub is_monitor: bool,
    pub first_measurement: Option<DateTime<Utc>>,
    pub last_measurement: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw: Value,
}

/// A sensor attached to a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub id: u64,
    pub location_id: u64,
    pub name: Option<String>,
    pub parameter_id: Option<u64>,
    pub parameter_name: Option<String>,
    pub parameter_unit: Option<String>,
    #[serde(default)]
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One observation of one sensor. Unique per `(sensor_id, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub sensor_id: u64,
    pub location_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub parameter_name: Option<String>,
    pub value: Option<f64>,
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub raw: Value,
}

/// Weather observation fields supplied by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWeather {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub humidity: Option<f64>,
    pub ozone: Option<f64>,
    pub pm25: Option<f64>,
}

/// A stored weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub humidity: Option<f64>,
    pub ozone: Option<f64>,
    pub pm25: Option<f64>,
}

impl WeatherRecord {
    pub(crate) fn from_new(id: u64, new: NewWeather) -> Self {
        Self {
            id,
            timestamp: new.timestamp,
            lat: new.lat,
            lon: new.lon,
            temperature: new.temperature,
            wind_speed: new.wind_speed,
            wind_direction: new.wind_direction,
            humidity: new.humidity,
            ozone: new.ozone,
            pm25: new.pm25,
        }
    }
}

/// Whether an upsert created a new record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Updated,
}

/// Filter and paging for location listings.
#[derive(Debug, Clone, Default)]
pub struct LocationQuery {
    pub country_code: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Filters for location search. All given filters must match.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring of the name or the city.
    pub q: Option<String>,
    pub city: Option<String>,
    /// Case-insensitive substring of any sensor's parameter name.
    pub parameter: Option<String>,
    /// Only locations with a measurement at or after this instant.
    pub recent_since: Option<DateTime<Utc>>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub location: LocationRecord,
    pub sensor_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub locations: u64,
    pub sensors: u64,
    pub measurements: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub parameters_measured: u64,
}
