//! JSON shapes of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{LatestReading, SensorLatest};
use crate::store::{Coordinates, LocationRecord, MeasurementRecord, SearchHit, SensorRecord};

pub const DEFAULT_LAT: f64 = 5.58389;
pub const DEFAULT_LON: f64 = -0.19968;

fn default_lat() -> f64 {
    DEFAULT_LAT
}

fn default_lon() -> f64 {
    DEFAULT_LON
}

fn default_limit() -> usize {
    100
}

fn default_search_limit() -> usize {
    50
}

fn default_page() -> usize {
    1
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LocationsParams {
    pub country: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_page")]
    pub page: usize,
}

#[derive(Debug, Deserialize)]
pub struct MeasurementsParams {
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub city: Option<String>,
    pub parameter: Option<String>,
    pub has_recent_data: Option<bool>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lon")]
    pub lon: f64,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct WeatherRangeParams {
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lon")]
    pub lon: f64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ParameterOut {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LatestValue {
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SensorSummary {
    pub sensor_id: u64,
    pub name: Option<String>,
    pub parameter: ParameterOut,
    pub latest: Option<LatestValue>,
}

impl SensorSummary {
    pub fn new(sensor: &SensorRecord, latest: Option<&MeasurementRecord>) -> Self {
        Self {
            sensor_id: sensor.id,
            name: sensor.name.clone(),
            parameter: ParameterOut {
                id: sensor.parameter_id,
                name: sensor.parameter_name.clone(),
                units: sensor.parameter_unit.clone(),
            },
            latest: latest.map(|m| LatestValue {
                value: m.value,
                timestamp: m.timestamp,
            }),
        }
    }
}

impl From<&SensorLatest> for SensorSummary {
    fn from(s: &SensorLatest) -> Self {
        Self::new(&s.sensor, s.latest.as_ref())
    }
}

/// Location coordinates; a known latitude is enough to report them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCoordinates {
    pub latitude: f64,
    pub longitude: Option<f64>,
}

fn coordinates_of(location: &LocationRecord) -> Option<LocationCoordinates> {
    location.latitude.map(|latitude| LocationCoordinates {
        latitude,
        longitude: location.longitude,
    })
}

#[derive(Debug, Serialize)]
pub struct LocationOut {
    pub id: u64,
    pub name: Option<String>,
    pub locality: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub coordinates: Option<LocationCoordinates>,
    #[serde(rename = "isMobile")]
    pub is_mobile: bool,
    #[serde(rename = "isMonitor")]
    pub is_monitor: bool,
    pub sensors: Vec<SensorSummary>,
    pub first_measurement: Option<DateTime<Utc>>,
    pub last_measurement: Option<DateTime<Utc>>,
}

impl LocationOut {
    pub fn new(location: &LocationRecord, sensors: Vec<SensorSummary>) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            locality: None,
            city: location.city.clone(),
            country: location.country.clone(),
            country_code: location.country_code.clone(),
            coordinates: coordinates_of(location),
            is_mobile: location.is_mobile,
            is_monitor: location.is_monitor,
            sensors,
            first_measurement: location.first_measurement,
            last_measurement: location.last_measurement,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeasurementOut {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
    pub parameter: ParameterOut,
    pub sensor_id: u64,
    pub location_id: Option<u64>,
    pub coordinates: Option<Coordinates>,
    pub flag_info: Option<Value>,
}

impl MeasurementOut {
    /// `sensor` fills in parameter details the measurement lacks.
    pub fn new(m: MeasurementRecord, sensor: Option<&SensorRecord>) -> Self {
        let flag_info = m.raw.get("flagInfo").filter(|v| !v.is_null()).cloned();
        Self {
            timestamp: m.timestamp,
            value: m.value,
            parameter: ParameterOut {
                id: sensor.and_then(|s| s.parameter_id),
                name: m
                    .parameter_name
                    .or_else(|| sensor.and_then(|s| s.parameter_name.clone())),
                units: sensor.and_then(|s| s.parameter_unit.clone()),
            },
            sensor_id: m.sensor_id,
            location_id: m.location_id,
            coordinates: m.coordinates,
            flag_info,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LatestOut {
    pub sensor_id: u64,
    pub parameter_name: Option<String>,
    pub parameter_units: Option<String>,
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub coordinates: Option<Coordinates>,
}

impl From<LatestReading> for LatestOut {
    fn from(r: LatestReading) -> Self {
        Self {
            sensor_id: r.sensor.id,
            parameter_name: r.sensor.parameter_name.or(r.measurement.parameter_name),
            parameter_units: r.sensor.parameter_unit,
            value: r.measurement.value,
            timestamp: r.measurement.timestamp,
            coordinates: r.measurement.coordinates,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocationLatestOut {
    pub location_id: u64,
    pub latest_measurements: Vec<LatestOut>,
}

#[derive(Debug, Serialize)]
pub struct SearchHitOut {
    pub id: u64,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub coordinates: Option<LocationCoordinates>,
    pub sensor_count: usize,
}

impl From<SearchHit> for SearchHitOut {
    fn from(hit: SearchHit) -> Self {
        Self {
            coordinates: coordinates_of(&hit.location),
            id: hit.location.id,
            name: hit.location.name,
            city: hit.location.city,
            country_code: hit.location.country_code,
            sensor_count: hit.sensor_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub message: String,
}

impl MessageOut {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location() -> LocationRecord {
        LocationRecord {
            id: 42,
            name: Some("Kumasi".to_string()),
            city: None,
            country: Some("Ghana".to_string()),
            country_code: Some("GH".to_string()),
            latitude: Some(6.7),
            longitude: None,
            is_mobile: true,
            is_monitor: false,
            first_measurement: None,
            last_measurement: None,
            raw: Value::Null,
        }
    }

    #[test]
    fn test_coordinates_need_latitude() {
        let mut record = location();
        record.latitude = None;
        record.longitude = Some(-1.6);
        let out = serde_json::to_value(LocationOut::new(&record, Vec::new())).unwrap();
        assert_eq!(out["coordinates"], Value::Null);
    }

    #[test]
    fn test_location_json_shape() {
        let out = serde_json::to_value(LocationOut::new(&location(), Vec::new())).unwrap();
        assert_eq!(out["id"], 42);
        assert_eq!(out["locality"], Value::Null);
        assert_eq!(out["coordinates"], json!({"latitude": 6.7, "longitude": null}));
        assert_eq!(out["isMobile"], true);
        assert_eq!(out["isMonitor"], false);
        assert_eq!(out["sensors"], json!([]));
    }

    #[test]
    fn test_measurement_falls_back_to_sensor_parameter() {
        let sensor = SensorRecord {
            id: 7,
            location_id: 42,
            name: None,
            parameter_id: Some(2),
            parameter_name: Some("pm25".to_string()),
            parameter_unit: Some("µg/m³".to_string()),
            raw: Value::Null,
        };
        let m = MeasurementRecord {
            sensor_id: 7,
            location_id: Some(42),
            timestamp: "2024-01-01T00:00:00Z".parse().unwrap(),
            parameter_name: None,
            value: Some(3.5),
            coordinates: None,
            raw: json!({"flagInfo": {"hasFlags": false}}),
        };
        let out = serde_json::to_value(MeasurementOut::new(m, Some(&sensor))).unwrap();
        assert_eq!(out["parameter"], json!({"id": 2, "name": "pm25", "units": "µg/m³"}));
        assert_eq!(out["flag_info"], json!({"hasFlags": false}));
        assert_eq!(out["timestamp"], "2024-01-01T00:00:00Z");
    }
}
