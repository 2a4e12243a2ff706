//! OpenAQ v3 payloads and their conversion into store records.
//!
//! Every payload keeps the raw JSON it was decoded from, so the store can
//! persist exactly what upstream reported.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::store::{Coordinates, LocationRecord, MeasurementRecord, SensorRecord};

/// Parameter name assumed for sensor measurements that don't name one.
pub const DEFAULT_PARAMETER: &str = "pm25";

// =============================================================================
// Wire Types
// =============================================================================

/// The `{meta, results}` envelope every v3 endpoint answers with.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CountryField {
    Object {
        code: Option<String>,
        name: Option<String>,
    },
    Name(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateTimeField {
    Object { utc: Option<String> },
    Plain(String),
}

impl DateTimeField {
    fn utc(&self) -> Option<DateTime<Utc>> {
        match self {
            DateTimeField::Object { utc } => utc.as_deref().and_then(parse_timestamp),
            DateTimeField::Plain(s) => parse_timestamp(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoordinatesWire {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl CoordinatesWire {
    fn complete(&self) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationWire {
    id: u64,
    name: Option<String>,
    city: Option<String>,
    country: Option<CountryField>,
    #[serde(alias = "country_code")]
    country_code: Option<String>,
    coordinates: Option<CoordinatesWire>,
    is_mobile: Option<bool>,
    is_monitor: Option<bool>,
    #[serde(default)]
    sensors: Vec<Value>,
    datetime_first: Option<DateTimeField>,
    datetime_last: Option<DateTimeField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParameterWire {
    id: Option<u64>,
    name: Option<String>,
    units: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SensorWire {
    id: u64,
    name: Option<String>,
    parameter: Option<ParameterWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestWire {
    sensors_id: Option<u64>,
    locations_id: Option<u64>,
    datetime: Option<DateTimeField>,
    value: Option<f64>,
    coordinates: Option<CoordinatesWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodWire {
    datetime_from: Option<DateTimeField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocationRef {
    Object { id: Option<u64> },
    Id(u64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementWire {
    period: Option<PeriodWire>,
    value: Option<f64>,
    parameter: Option<ParameterWire>,
    coordinates: Option<CoordinatesWire>,
    location: Option<LocationRef>,
    #[serde(alias = "location_id")]
    location_id: Option<u64>,
}

// =============================================================================
// Timestamps
// =============================================================================

/// Parse an upstream timestamp: RFC 3339, a naive date-time taken as UTC, or
/// a plain date at midnight UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Public Payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ApiParameter {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub units: Option<String>,
    pub display_name: Option<String>,
}

impl From<ParameterWire> for ApiParameter {
    fn from(wire: ParameterWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            units: wire.units,
            display_name: wire.display_name,
        }
    }
}

/// A sensor as described by `/sensors/{id}` or embedded in a location.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSensor {
    pub id: u64,
    pub name: Option<String>,
    pub parameter: Option<ApiParameter>,
    pub raw: Value,
}

impl ApiSensor {
    pub fn from_json(raw: Value) -> serde_json::Result<Self> {
        let wire: SensorWire = serde_json::from_value(raw.clone())?;
        Ok(Self {
            id: wire.id,
            name: wire.name,
            parameter: wire.parameter.map(ApiParameter::from),
            raw,
        })
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn to_record(&self, location_id: u64) -> SensorRecord {
        let parameter = self.parameter.as_ref();
        SensorRecord {
            id: self.id,
            location_id,
            name: self.name.clone(),
            parameter_id: parameter.and_then(|p| p.id),
            parameter_name: parameter.and_then(|p| p.name.clone()),
            parameter_unit: parameter.and_then(|p| p.units.clone()),
            raw: self.raw.clone(),
        }
    }
}

/// A location with the sensors embedded in its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiLocation {
    pub record: LocationRecord,
    pub sensors: Vec<ApiSensor>,
}

impl ApiLocation {
    pub fn from_json(raw: Value) -> serde_json::Result<Self> {
        let wire: LocationWire = serde_json::from_value(raw.clone())?;

        let (country, mut country_code) = match wire.country {
            Some(CountryField::Object { code, name }) => (name, code),
            Some(CountryField::Name(name)) => (Some(name), None),
            None => (None, None),
        };
        if country_code.is_none() {
            country_code = wire.country_code;
        }

        // Sensors that don't decode are left out rather than failing the location
        let sensors = wire
            .sensors
            .into_iter()
            .filter_map(|s| ApiSensor::from_json(s).ok())
            .collect();

        let (latitude, longitude) = match &wire.coordinates {
            Some(c) => (c.latitude, c.longitude),
            None => (None, None),
        };

        Ok(Self {
            record: LocationRecord {
                id: wire.id,
                name: wire.name,
                city: wire.city,
                country,
                country_code,
                latitude,
                longitude,
                is_mobile: wire.is_mobile.unwrap_or(false),
                is_monitor: wire.is_monitor.unwrap_or(false),
                first_measurement: wire.datetime_first.as_ref().and_then(DateTimeField::utc),
                last_measurement: wire.datetime_last.as_ref().and_then(DateTimeField::utc),
                raw,
            },
            sensors,
        })
    }
}

/// One entry of `/locations/{id}/latest`.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestResult {
    pub sensor_id: Option<u64>,
    pub location_id: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub coordinates: Option<Coordinates>,
    pub raw: Value,
}

impl LatestResult {
    /// Decode leniently: fields that are missing or malformed come back as `None`.
    pub fn from_json(raw: Value) -> Self {
        let wire: Option<LatestWire> = serde_json::from_value(raw.clone()).ok();
        match wire {
            Some(wire) => Self {
                sensor_id: wire.sensors_id,
                location_id: wire.locations_id,
                timestamp: wire.datetime.as_ref().and_then(DateTimeField::utc),
                value: wire.value,
                coordinates: wire.coordinates.as_ref().and_then(CoordinatesWire::complete),
                raw,
            },
            None => Self {
                sensor_id: None,
                location_id: None,
                timestamp: None,
                value: None,
                coordinates: None,
                raw,
            },
        }
    }
}

/// One entry of `/sensors/{id}/measurements`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMeasurement {
    pub location_id: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub parameter_name: String,
    pub coordinates: Option<Coordinates>,
    pub raw: Value,
}

impl SensorMeasurement {
    pub fn from_json(raw: Value) -> serde_json::Result<Self> {
        let wire: MeasurementWire = serde_json::from_value(raw.clone())?;
        let location_id = match wire.location {
            Some(LocationRef::Object { id }) => id,
            Some(LocationRef::Id(id)) => Some(id),
            None => None,
        }
        .or(wire.location_id);

        Ok(Self {
            location_id,
            timestamp: wire
                .period
                .as_ref()
                .and_then(|p| p.datetime_from.as_ref())
                .and_then(DateTimeField::utc),
            value: wire.value,
            parameter_name: wire
                .parameter
                .and_then(|p| p.name)
                .unwrap_or_else(|| DEFAULT_PARAMETER.to_string()),
            coordinates: wire.coordinates.as_ref().and_then(CoordinatesWire::complete),
            raw,
        })
    }

    /// Build the store record, or `None` when upstream gave no usable timestamp.
    pub fn to_record(&self, sensor_id: u64, default_location: Option<u64>) -> Option<MeasurementRecord> {
        Some(MeasurementRecord {
            sensor_id,
            location_id: self.location_id.or(default_location),
            timestamp: self.timestamp?,
            parameter_name: Some(self.parameter_name.clone()),
            value: self.value,
            coordinates: self.coordinates,
            raw: self.raw.clone(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_location_from_json() {
        let raw = json!({
            "id": 9764,
            "name": "US Diplomatic Post: Accra",
            "locality": null,
            "country": {"id": 152, "code": "GH", "name": "Ghana"},
            "coordinates": {"latitude": 5.58389, "longitude": -0.19968},
            "isMobile": false,
            "isMonitor": true,
            "sensors": [
                {"id": 21, "name": "pm25 µg/m³", "parameter": {"id": 2, "name": "pm25", "units": "µg/m³", "displayName": "PM2.5"}},
                {"name": "no id"}
            ],
            "datetimeFirst": {"utc": "2020-01-01T00:00:00Z", "local": "2020-01-01T00:00:00+00:00"},
            "datetimeLast": {"utc": "2024-05-01T12:00:00Z", "local": "2024-05-01T12:00:00+00:00"}
        });
        let location = ApiLocation::from_json(raw.clone()).unwrap();

        assert_eq!(location.record.id, 9764);
        assert_eq!(location.record.country.as_deref(), Some("Ghana"));
        assert_eq!(location.record.country_code.as_deref(), Some("GH"));
        assert_eq!(location.record.latitude, Some(5.58389));
        assert!(location.record.is_monitor);
        assert_eq!(
            location.record.last_measurement,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(location.sensors.len(), 1);
        assert_eq!(location.sensors[0].parameter_name(), Some("pm25"));
        assert_eq!(location.record.raw, raw);

        let sensor = location.sensors[0].to_record(9764);
        assert_eq!(sensor.parameter_unit.as_deref(), Some("µg/m³"));
        assert_eq!(sensor.parameter_id, Some(2));
    }

    #[test]
    fn test_latest_result_is_lenient() {
        let ok = LatestResult::from_json(json!({
            "datetime": {"utc": "2024-05-01T10:00:00Z", "local": "2024-05-01T10:00:00+00:00"},
            "value": 18.2,
            "coordinates": {"latitude": 5.6, "longitude": -0.2},
            "sensorsId": 21,
            "locationsId": 9764
        }));
        assert_eq!(ok.sensor_id, Some(21));
        assert_eq!(ok.value, Some(18.2));
        assert!(ok.timestamp.is_some());

        let bad = LatestResult::from_json(json!({"value": 1.0, "datetime": {"utc": "not a time"}}));
        assert_eq!(bad.sensor_id, None);
        assert_eq!(bad.timestamp, None);
    }

    #[test]
    fn test_measurement_timestamp_shapes_and_default_parameter() {
        let object = SensorMeasurement::from_json(json!({
            "value": 12.0,
            "parameter": {"id": 2, "name": "pm25", "units": "µg/m³"},
            "period": {"datetimeFrom": {"utc": "2024-05-01T10:00:00Z"}},
            "flagInfo": {"hasFlags": false}
        }))
        .unwrap();
        assert_eq!(
            object.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );

        let plain = SensorMeasurement::from_json(json!({
            "value": 3.0,
            "period": {"datetimeFrom": "2024-05-01T11:00:00"}
        }))
        .unwrap();
        assert_eq!(plain.parameter_name, "pm25");
        assert_eq!(
            plain.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap())
        );

        let record = plain.to_record(21, Some(3)).unwrap();
        assert_eq!(record.location_id, Some(3));
        assert_eq!(record.sensor_id, 21);

        let untimed = SensorMeasurement::from_json(json!({"value": 3.0})).unwrap();
        assert!(untimed.to_record(21, None).is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00+01:00").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
