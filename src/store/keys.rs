//! Key layout of the store.
//!
//! Numbers are written as fixed-width decimal so that bytewise key order
//! matches numeric order. Timestamps are epoch milliseconds with the sign bit
//! flipped, which keeps instants before 1970 ordered correctly.

use chrono::{DateTime, Utc};

pub const LOCATION_PREFIX: &str = "location/";
pub const SENSOR_PREFIX: &str = "sensor/";
pub const MEASUREMENT_PREFIX: &str = "measurement/";
pub const PARAMETER_PREFIX: &str = "parameter/";
pub const WEATHER_PREFIX: &str = "weather/";
pub const WEATHER_SEQ: &str = "meta/weather-seq";
pub const LATEST_MEASUREMENT: &str = "meta/latest-measurement";

fn num(n: u64) -> String {
    format!("{:020}", n)
}

fn ts(t: DateTime<Utc>) -> String {
    let biased = (t.timestamp_millis() as u64) ^ (1u64 << 63);
    num(biased)
}

pub fn location(id: u64) -> Vec<u8> {
    format!("{}{}", LOCATION_PREFIX, num(id)).into_bytes()
}

pub fn sensor(id: u64) -> Vec<u8> {
    format!("{}{}", SENSOR_PREFIX, num(id)).into_bytes()
}

pub fn location_sensors(location_id: u64) -> Vec<u8> {
    format!("location-sensor/{}/", num(location_id)).into_bytes()
}

pub fn location_sensor(location_id: u64, sensor_id: u64) -> Vec<u8> {
    let mut key = location_sensors(location_id);
    key.extend_from_slice(num(sensor_id).as_bytes());
    key
}

/// Recover the sensor id from a `location_sensor` key.
pub fn sensor_id_of_location_sensor(key: &[u8]) -> Option<u64> {
    let key = std::str::from_utf8(key).ok()?;
    key.rsplit('/').next()?.parse().ok()
}

pub fn measurements(sensor_id: u64) -> Vec<u8> {
    format!("{}{}/", MEASUREMENT_PREFIX, num(sensor_id)).into_bytes()
}

pub fn measurement(sensor_id: u64, timestamp: DateTime<Utc>) -> Vec<u8> {
    let mut key = measurements(sensor_id);
    key.extend_from_slice(ts(timestamp).as_bytes());
    key
}

pub fn location_measurements(location_id: u64) -> Vec<u8> {
    format!("location-measurement/{}/", num(location_id)).into_bytes()
}

pub fn location_measurement(location_id: u64, timestamp: DateTime<Utc>, sensor_id: u64) -> Vec<u8> {
    let mut key = location_measurements(location_id);
    key.extend_from_slice(format!("{}/{}", ts(timestamp), num(sensor_id)).as_bytes());
    key
}

pub fn parameter(name: &str) -> Vec<u8> {
    format!("{}{}", PARAMETER_PREFIX, name).into_bytes()
}

pub fn weather(id: u64) -> Vec<u8> {
    format!("{}{}", WEATHER_PREFIX, num(id)).into_bytes()
}
