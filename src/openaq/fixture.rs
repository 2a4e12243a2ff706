//! An in-process `OpenAqApi` serving canned JSON, intended for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::client::{MeasurementsQuery, OpenAqApi, OpenAqError, Result};
use super::types::{ApiLocation, ApiSensor, LatestResult, SensorMeasurement};

/// Serves locations, latest results, sensors and measurements from memory.
///
/// Payloads are raw v3 JSON and go through the same decoding as the HTTP
/// client. Paging slices the configured lists.
#[derive(Default)]
pub struct FixtureOpenAqClient {
    locations: Vec<Value>,
    latest: HashMap<u64, Vec<Value>>,
    sensors: HashMap<u64, Value>,
    measurements: HashMap<u64, Vec<Value>>,
    failing_locations: HashSet<u64>,
    sensor_lookups: AtomicUsize,
}

impl FixtureOpenAqClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, raw: Value) -> Self {
        self.locations.push(raw);
        self
    }

    pub fn with_latest(mut self, location_id: u64, results: Vec<Value>) -> Self {
        self.latest.insert(location_id, results);
        self
    }

    pub fn with_sensor(mut self, sensor_id: u64, raw: Value) -> Self {
        self.sensors.insert(sensor_id, raw);
        self
    }

    pub fn with_measurements(mut self, sensor_id: u64, results: Vec<Value>) -> Self {
        self.measurements.insert(sensor_id, results);
        self
    }

    /// Make every request about this location fail with a server error.
    pub fn with_failing_location(mut self, location_id: u64) -> Self {
        self.failing_locations.insert(location_id);
        self
    }

    /// Number of `sensor` calls served so far.
    pub fn sensor_lookups(&self) -> usize {
        self.sensor_lookups.load(Ordering::SeqCst)
    }

    fn check_location(&self, id: u64) -> Result<()> {
        if self.failing_locations.contains(&id) {
            return Err(OpenAqError::Status {
                url: format!("fixture://locations/{}", id),
                status: 500,
            });
        }
        Ok(())
    }
}

fn page_of<T: Clone>(items: &[T], limit: u32, page: u32) -> Vec<T> {
    let limit = limit as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);
    items.iter().skip(start).take(limit).cloned().collect()
}

fn fixture_decode_error(e: serde_json::Error) -> OpenAqError {
    OpenAqError::Decode {
        url: "fixture://".to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl OpenAqApi for FixtureOpenAqClient {
    async fn locations(
        &self,
        country: Option<&str>,
        limit: u32,
        page: u32,
    ) -> Result<Vec<ApiLocation>> {
        let mut matching = Vec::new();
        for raw in &self.locations {
            let location = ApiLocation::from_json(raw.clone()).map_err(fixture_decode_error)?;
            let wanted = match country.filter(|c| !c.is_empty()) {
                Some(code) => location.record.country_code.as_deref() == Some(code),
                None => true,
            };
            if wanted {
                matching.push(location);
            }
        }
        Ok(page_of(&matching, limit, page))
    }

    async fn location(&self, id: u64) -> Result<ApiLocation> {
        self.check_location(id)?;
        for raw in &self.locations {
            let location = ApiLocation::from_json(raw.clone()).map_err(fixture_decode_error)?;
            if location.record.id == id {
                return Ok(location);
            }
        }
        Err(OpenAqError::NotFound(format!("fixture://locations/{}", id)))
    }

    async fn location_latest(&self, id: u64) -> Result<Vec<LatestResult>> {
        self.check_location(id)?;
        Ok(self
            .latest
            .get(&id)
            .map(|results| results.iter().cloned().map(LatestResult::from_json).collect())
            .unwrap_or_default())
    }

    async fn sensor(&self, id: u64) -> Result<ApiSensor> {
        self.sensor_lookups.fetch_add(1, Ordering::SeqCst);
        match self.sensors.get(&id) {
            Some(raw) => ApiSensor::from_json(raw.clone()).map_err(fixture_decode_error),
            None => Err(OpenAqError::NotFound(format!("fixture://sensors/{}", id))),
        }
    }

    async fn sensor_measurements(
        &self,
        id: u64,
        query: &MeasurementsQuery,
    ) -> Result<Vec<SensorMeasurement>> {
        let all = self.measurements.get(&id).cloned().unwrap_or_default();
        page_of(&all, query.limit, query.page)
            .into_iter()
            .map(|raw| SensorMeasurement::from_json(raw).map_err(fixture_decode_error))
            .collect()
    }
}
