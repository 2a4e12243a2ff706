//! Typed storage of locations, sensors, measurements and weather records.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::caches::{KeyValueDb, KeyValueDbError, KeyValueDbWrites};

use super::keys;
use super::records::{
    LocationQuery, LocationRecord, MeasurementRecord, NewWeather, SearchHit, SearchQuery,
    SensorRecord, StoreStats, Upserted, WeatherRecord,
};

const PM25: &str = "pm25";

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] KeyValueDbError),

    #[error("failed to encode or decode record: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

// =============================================================================
// Store
// =============================================================================

/// The application's record store.
///
/// Values are JSON; keys follow the layout in [`keys`]. Every mutation holds
/// the writer lock for its read-modify-write cycle, so secondary indexes stay
/// in step with the records they point at.
pub struct Store {
    db: Arc<dyn KeyValueDb>,
    write_lock: Mutex<()>,
}

impl Store {
    pub fn new(db: Arc<dyn KeyValueDb>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    // -------------------------------------------------------------------------
    // Encoding helpers
    // -------------------------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.db.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_json<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>> {
        self.db
            .list_entries(prefix)
            .await?
            .iter()
            .map(|entry| serde_json::from_slice(&entry.value).map_err(StoreError::from))
            .collect()
    }

    fn set_json<T: Serialize>(
        writes: &mut Box<dyn KeyValueDbWrites + Send>,
        key: Vec<u8>,
        value: &T,
    ) -> Result<()> {
        writes.set(key, serde_json::to_vec(value)?);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Locations and sensors
    // -------------------------------------------------------------------------

    pub async fn upsert_location(&self, record: &LocationRecord) -> Result<Upserted> {
        let _guard = self.write_lock.lock().await;
        let key = keys::location(record.id);
        let existed = self.db.exists(&key).await?;

        let mut writes = self.db.write().await?;
        Self::set_json(&mut writes, key, record)?;
        writes.flush().await?;

        Ok(if existed {
            Upserted::Updated
        } else {
            Upserted::Inserted
        })
    }

    pub async fn upsert_sensor(&self, record: &SensorRecord) -> Result<Upserted> {
        let _guard = self.write_lock.lock().await;
        let key = keys::sensor(record.id);
        let previous: Option<SensorRecord> = self.get_json(&key).await?;

        let mut writes = self.db.write().await?;
        if let Some(prev) = &previous {
            if prev.location_id != record.location_id {
                writes.del(keys::location_sensor(prev.location_id, prev.id));
            }
        }
        Self::set_json(&mut writes, key, record)?;
        writes.set(
            keys::location_sensor(record.location_id, record.id),
            Vec::new(),
        );
        writes.flush().await?;

        Ok(if previous.is_some() {
            Upserted::Updated
        } else {
            Upserted::Inserted
        })
    }

    pub async fn location(&self, id: u64) -> Result<Option<LocationRecord>> {
        self.get_json(&keys::location(id)).await
    }

    pub async fn sensor(&self, id: u64) -> Result<Option<SensorRecord>> {
        self.get_json(&keys::sensor(id)).await
    }

    /// Sensors of a location, ordered by sensor id.
    pub async fn sensors_by_location(&self, location_id: u64) -> Result<Vec<SensorRecord>> {
        let entries = self
            .db
            .list_entries(&keys::location_sensors(location_id))
            .await?;
        let mut sensors = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(sensor_id) = keys::sensor_id_of_location_sensor(&entry.key) else {
                continue;
            };
            if let Some(sensor) = self.sensor(sensor_id).await? {
                sensors.push(sensor);
            }
        }
        Ok(sensors)
    }

    /// Locations ordered by most recent measurement (locations that never
    /// reported come last), then by id.
    pub async fn locations(&self, query: &LocationQuery) -> Result<Vec<LocationRecord>> {
        let mut locations: Vec<LocationRecord> =
            self.list_json(keys::LOCATION_PREFIX.as_bytes()).await?;

        if let Some(code) = &query.country_code {
            locations.retain(|l| l.country_code.as_deref() == Some(code.as_str()));
        }
        locations.sort_by(compare_by_last_measurement);

        Ok(locations
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    pub async fn search_locations(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let q = query.q.as_deref().map(str::to_lowercase);
        let city = query.city.as_deref().map(str::to_lowercase);
        let parameter = query.parameter.as_deref().map(str::to_lowercase);

        let locations: Vec<LocationRecord> =
            self.list_json(keys::LOCATION_PREFIX.as_bytes()).await?;
        let mut hits = Vec::new();

        for location in locations {
            if hits.len() >= query.limit {
                break;
            }
            if let Some(q) = &q {
                if !contains_ci(&location.name, q) && !contains_ci(&location.city, q) {
                    continue;
                }
            }
            if let Some(city) = &city {
                if !contains_ci(&location.city, city) {
                    continue;
                }
            }

            let sensors = self.sensors_by_location(location.id).await?;
            if let Some(parameter) = &parameter {
                if !sensors
                    .iter()
                    .any(|s| contains_ci(&s.parameter_name, parameter))
                {
                    continue;
                }
            }
            if let Some(since) = query.recent_since {
                let newest = self
                    .db
                    .last_entry(&keys::location_measurements(location.id))
                    .await?;
                let recent = match newest {
                    Some(entry) => {
                        let m: MeasurementRecord = serde_json::from_slice(&entry.value)?;
                        m.timestamp >= since
                    }
                    None => false,
                };
                if !recent {
                    continue;
                }
            }

            hits.push(SearchHit {
                sensor_count: sensors.len(),
                location,
            });
        }

        Ok(hits)
    }

    // -------------------------------------------------------------------------
    // Measurements
    // -------------------------------------------------------------------------

    /// Insert a measurement, or replace the one already stored for the same
    /// sensor and timestamp.
    pub async fn upsert_measurement(&self, record: &MeasurementRecord) -> Result<Upserted> {
        let _guard = self.write_lock.lock().await;
        let key = keys::measurement(record.sensor_id, record.timestamp);
        let previous: Option<MeasurementRecord> = self.get_json(&key).await?;
        let latest: Option<DateTime<Utc>> = self
            .get_json(keys::LATEST_MEASUREMENT.as_bytes())
            .await?;

        let mut writes = self.db.write().await?;
        if let Some(prev_location) = previous.as_ref().and_then(|p| p.location_id) {
            if Some(prev_location) != record.location_id {
                writes.del(keys::location_measurement(
                    prev_location,
                    record.timestamp,
                    record.sensor_id,
                ));
            }
        }

        let value = serde_json::to_vec(record)?;
        if let Some(location_id) = record.location_id {
            writes.set(
                keys::location_measurement(location_id, record.timestamp, record.sensor_id),
                value.clone(),
            );
        }
        writes.set(key, value);

        if let Some(name) = &record.parameter_name {
            writes.set(keys::parameter(name), Vec::new());
        }
        if latest.map_or(true, |l| record.timestamp > l) {
            Self::set_json(
                &mut writes,
                keys::LATEST_MEASUREMENT.as_bytes().to_vec(),
                &record.timestamp,
            )?;
        }
        writes.flush().await?;

        Ok(if previous.is_some() {
            Upserted::Updated
        } else {
            Upserted::Inserted
        })
    }

    /// Measurements of a sensor within the inclusive bounds, newest first.
    pub async fn measurements_by_sensor(
        &self,
        sensor_id: u64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<MeasurementRecord>> {
        let all: Vec<MeasurementRecord> = self.list_json(&keys::measurements(sensor_id)).await?;
        Ok(all
            .into_iter()
            .rev()
            .filter(|m| start.map_or(true, |s| m.timestamp >= s))
            .filter(|m| end.map_or(true, |e| m.timestamp <= e))
            .take(limit)
            .collect())
    }

    pub async fn latest_measurement(&self, sensor_id: u64) -> Result<Option<MeasurementRecord>> {
        match self.db.last_entry(&keys::measurements(sensor_id)).await? {
            Some(entry) => Ok(Some(serde_json::from_slice(&entry.value)?)),
            None => Ok(None),
        }
    }

    /// Measurements recorded against a location, newest first.
    pub async fn location_measurements(
        &self,
        location_id: u64,
        parameter: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<MeasurementRecord>> {
        let all: Vec<MeasurementRecord> = self
            .list_json(&keys::location_measurements(location_id))
            .await?;
        Ok(all
            .into_iter()
            .rev()
            .filter(|m| parameter.map_or(true, |p| m.parameter_name.as_deref() == Some(p)))
            .filter(|m| since.map_or(true, |s| m.timestamp >= s))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn location_measurement_count(&self, location_id: u64) -> Result<u64> {
        Ok(self
            .db
            .count_prefix(&keys::location_measurements(location_id))
            .await?)
    }

    /// Every pm25 value reported by the location's sensors, oldest first.
    pub async fn pm25_series(&self, location_id: u64) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let mut series = Vec::new();
        for sensor in self.sensors_by_location(location_id).await? {
            let measurements: Vec<MeasurementRecord> =
                self.list_json(&keys::measurements(sensor.id)).await?;
            series.extend(measurements.into_iter().filter_map(|m| {
                if m.parameter_name.as_deref() == Some(PM25) {
                    m.value.map(|v| (m.timestamp, v))
                } else {
                    None
                }
            }));
        }
        series.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(series)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            locations: self.db.count_prefix(keys::LOCATION_PREFIX.as_bytes()).await?,
            sensors: self.db.count_prefix(keys::SENSOR_PREFIX.as_bytes()).await?,
            measurements: self
                .db
                .count_prefix(keys::MEASUREMENT_PREFIX.as_bytes())
                .await?,
            last_updated: self
                .get_json(keys::LATEST_MEASUREMENT.as_bytes())
                .await?,
            parameters_measured: self
                .db
                .count_prefix(keys::PARAMETER_PREFIX.as_bytes())
                .await?,
        })
    }

    // -------------------------------------------------------------------------
    // Weather
    // -------------------------------------------------------------------------

    /// Store a weather observation under the next id.
    pub async fn create_weather(&self, new: NewWeather) -> Result<WeatherRecord> {
        let _guard = self.write_lock.lock().await;
        let seq: u64 = self
            .get_json(keys::WEATHER_SEQ.as_bytes())
            .await?
            .unwrap_or(0);
        let record = WeatherRecord::from_new(seq + 1, new);

        let mut writes = self.db.write().await?;
        Self::set_json(&mut writes, keys::WEATHER_SEQ.as_bytes().to_vec(), &record.id)?;
        Self::set_json(&mut writes, keys::weather(record.id), &record)?;
        writes.flush().await?;

        Ok(record)
    }

    pub async fn weather_by_id(&self, id: u64) -> Result<Option<WeatherRecord>> {
        self.get_json(&keys::weather(id)).await
    }

    pub async fn delete_weather(&self, id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = keys::weather(id);
        if !self.db.exists(&key).await? {
            return Ok(false);
        }
        let mut writes = self.db.write().await?;
        writes.del(key);
        writes.flush().await?;
        Ok(true)
    }

    /// Weather records at exactly these coordinates, newest first.
    async fn weather_at(&self, lat: f64, lon: f64) -> Result<Vec<WeatherRecord>> {
        let mut records: Vec<WeatherRecord> = self
            .list_json(keys::WEATHER_PREFIX.as_bytes())
            .await?;
        records.retain(|w| w.lat == lat && w.lon == lon);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    pub async fn latest_weather(&self, lat: f64, lon: f64) -> Result<Option<WeatherRecord>> {
        Ok(self.weather_at(lat, lon).await?.into_iter().next())
    }

    pub async fn weather_history(
        &self,
        lat: f64,
        lon: f64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<WeatherRecord>> {
        Ok(self
            .weather_at(lat, lon)
            .await?
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    pub async fn weather_in_range(
        &self,
        lat: f64,
        lon: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<WeatherRecord>> {
        Ok(self
            .weather_at(lat, lon)
            .await?
            .into_iter()
            .filter(|w| w.timestamp >= start && w.timestamp <= end)
            .skip(skip)
            .take(limit)
            .collect())
    }
}

fn compare_by_last_measurement(a: &LocationRecord, b: &LocationRecord) -> Ordering {
    match (a.last_measurement, b.last_measurement) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.id.cmp(&b.id))
}

fn contains_ci(field: &Option<String>, needle_lower: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|value| value.to_lowercase().contains(needle_lower))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caches::{LmdbKeyValueDb, MemoryKeyValueDb};
    use crate::store::Coordinates;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn memory_store() -> Store {
        Store::new(Arc::new(MemoryKeyValueDb::new()))
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn location(id: u64, code: &str, last: Option<DateTime<Utc>>) -> LocationRecord {
        LocationRecord {
            id,
            name: Some(format!("Station {}", id)),
            city: Some("Accra".to_string()),
            country: Some("Ghana".to_string()),
            country_code: Some(code.to_string()),
            latitude: Some(5.6),
            longitude: Some(-0.2),
            is_mobile: false,
            is_monitor: true,
            first_measurement: None,
            last_measurement: last,
            raw: json!({"id": id}),
        }
    }

    fn sensor(id: u64, location_id: u64, parameter: &str) -> SensorRecord {
        SensorRecord {
            id,
            location_id,
            name: Some(format!("{} µg/m³", parameter)),
            parameter_id: Some(2),
            parameter_name: Some(parameter.to_string()),
            parameter_unit: Some("µg/m³".to_string()),
            raw: json!({}),
        }
    }

    fn measurement(sensor_id: u64, location_id: u64, ts: DateTime<Utc>, value: f64) -> MeasurementRecord {
        MeasurementRecord {
            sensor_id,
            location_id: Some(location_id),
            timestamp: ts,
            parameter_name: Some("pm25".to_string()),
            value: Some(value),
            coordinates: Some(Coordinates {
                latitude: 5.6,
                longitude: -0.2,
            }),
            raw: json!({"value": value}),
        }
    }

    fn weather(ts: DateTime<Utc>, lat: f64, lon: f64) -> NewWeather {
        NewWeather {
            timestamp: ts,
            lat,
            lon,
            temperature: Some(29.5),
            wind_speed: None,
            wind_direction: None,
            humidity: Some(80.0),
            ozone: None,
            pm25: None,
        }
    }

    #[tokio::test]
    async fn test_measurement_upsert_is_unique_per_sensor_and_timestamp() {
        let store = memory_store();
        let first = measurement(10, 1, at(8), 12.0);
        assert_eq!(store.upsert_measurement(&first).await.unwrap(), Upserted::Inserted);

        let second = measurement(10, 1, at(8), 20.0);
        assert_eq!(store.upsert_measurement(&second).await.unwrap(), Upserted::Updated);

        let stored = store.measurements_by_sensor(10, None, None, 100).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, Some(20.0));
        assert_eq!(store.location_measurement_count(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_measurement_moving_location_moves_index() {
        let store = memory_store();
        store.upsert_measurement(&measurement(10, 1, at(8), 12.0)).await.unwrap();
        store.upsert_measurement(&measurement(10, 2, at(8), 12.0)).await.unwrap();

        assert_eq!(store.location_measurement_count(1).await.unwrap(), 0);
        assert_eq!(store.location_measurement_count(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_measurements_by_sensor_bounds_and_order() {
        let store = memory_store();
        for hour in 0..6 {
            store
                .upsert_measurement(&measurement(10, 1, at(hour), hour as f64))
                .await
                .unwrap();
        }

        let ms = store
            .measurements_by_sensor(10, Some(at(1)), Some(at(4)), 100)
            .await
            .unwrap();
        let hours: Vec<_> = ms.iter().map(|m| m.value.unwrap() as u32).collect();
        assert_eq!(hours, vec![4, 3, 2, 1]);

        let limited = store.measurements_by_sensor(10, None, None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].timestamp, at(5));

        let latest = store.latest_measurement(10).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, at(5));
        assert!(store.latest_measurement(11).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_locations_order_and_filter() {
        let store = memory_store();
        store.upsert_location(&location(1, "GH", Some(at(1)))).await.unwrap();
        store.upsert_location(&location(2, "GH", None)).await.unwrap();
        store.upsert_location(&location(3, "GH", Some(at(5)))).await.unwrap();
        store.upsert_location(&location(4, "NG", Some(at(9)))).await.unwrap();

        let query = LocationQuery {
            country_code: Some("GH".to_string()),
            limit: 100,
            offset: 0,
        };
        let ids: Vec<_> = store
            .locations(&query)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);

        let paged = LocationQuery {
            country_code: None,
            limit: 2,
            offset: 1,
        };
        let ids: Vec<_> = store
            .locations(&paged)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_sensor_relocation() {
        let store = memory_store();
        store.upsert_sensor(&sensor(10, 1, "pm25")).await.unwrap();
        store.upsert_sensor(&sensor(11, 1, "pm10")).await.unwrap();
        assert_eq!(
            store.upsert_sensor(&sensor(10, 2, "pm25")).await.unwrap(),
            Upserted::Updated
        );

        let at_one: Vec<_> = store
            .sensors_by_location(1)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(at_one, vec![11]);
        assert_eq!(store.sensors_by_location(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search() {
        let store = memory_store();
        let mut kumasi = location(2, "GH", None);
        kumasi.name = Some("KNUST Campus".to_string());
        kumasi.city = Some("Kumasi".to_string());
        store.upsert_location(&location(1, "GH", None)).await.unwrap();
        store.upsert_location(&kumasi).await.unwrap();
        store.upsert_sensor(&sensor(10, 1, "pm25")).await.unwrap();
        store.upsert_sensor(&sensor(20, 2, "temperature")).await.unwrap();
        store.upsert_sensor(&sensor(21, 2, "relativehumidity")).await.unwrap();
        store.upsert_measurement(&measurement(10, 1, at(8), 3.0)).await.unwrap();

        let hits = store
            .search_locations(&SearchQuery {
                q: Some("knust".to_string()),
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].location.id, 2);
        assert_eq!(hits[0].sensor_count, 2);

        let hits = store
            .search_locations(&SearchQuery {
                parameter: Some("PM2".to_string()),
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].location.id, 1);

        let hits = store
            .search_locations(&SearchQuery {
                recent_since: Some(at(8)),
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store
            .search_locations(&SearchQuery {
                recent_since: Some(at(9)),
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_pm25_series_and_stats() {
        let store = memory_store();
        store.upsert_location(&location(1, "GH", None)).await.unwrap();
        store.upsert_sensor(&sensor(10, 1, "pm25")).await.unwrap();
        store.upsert_sensor(&sensor(11, 1, "pm25")).await.unwrap();
        store.upsert_measurement(&measurement(10, 1, at(3), 30.0)).await.unwrap();
        store.upsert_measurement(&measurement(11, 1, at(1), 10.0)).await.unwrap();
        store.upsert_measurement(&measurement(10, 1, at(2), 20.0)).await.unwrap();
        let mut temp = measurement(11, 1, at(4), 31.0);
        temp.parameter_name = Some("temperature".to_string());
        store.upsert_measurement(&temp).await.unwrap();

        let values: Vec<_> = store
            .pm25_series(1)
            .await
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.locations, 1);
        assert_eq!(stats.sensors, 2);
        assert_eq!(stats.measurements, 4);
        assert_eq!(stats.last_updated, Some(at(4)));
        assert_eq!(stats.parameters_measured, 2);

        let pm25_recent = store
            .location_measurements(1, Some("pm25"), Some(at(2)), None)
            .await
            .unwrap();
        assert_eq!(pm25_recent.len(), 2);
        assert_eq!(pm25_recent[0].timestamp, at(3));
    }

    #[tokio::test]
    async fn test_weather_records() {
        let store = memory_store();
        let a = store.create_weather(weather(at(1), 5.58389, -0.19968)).await.unwrap();
        let b = store.create_weather(weather(at(3), 5.58389, -0.19968)).await.unwrap();
        store.create_weather(weather(at(5), 6.0, -1.0)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let latest = store.latest_weather(5.58389, -0.19968).await.unwrap().unwrap();
        assert_eq!(latest.id, 2);

        let history = store.weather_history(5.58389, -0.19968, 1, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, 1);

        let range = store
            .weather_in_range(5.58389, -0.19968, at(2), at(2) + Duration::hours(1), 0, 10)
            .await
            .unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range[0].id, 2);

        assert!(store.delete_weather(1).await.unwrap());
        assert!(!store.delete_weather(1).await.unwrap());
        assert!(store.weather_by_id(1).await.unwrap().is_none());

        let c = store.create_weather(weather(at(6), 1.0, 1.0)).await.unwrap();
        assert_eq!(c.id, 4);
    }

    #[tokio::test]
    async fn test_lmdb_backed_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db = LmdbKeyValueDb::new(temp_dir.path(), 64 * 1024 * 1024).unwrap();
        let store = Store::new(Arc::new(db));

        store.upsert_location(&location(1, "GH", Some(at(2)))).await.unwrap();
        store.upsert_measurement(&measurement(10, 1, at(2), 7.5)).await.unwrap();

        assert_eq!(store.location(1).await.unwrap().unwrap().id, 1);
        assert_eq!(
            store.latest_measurement(10).await.unwrap().unwrap().value,
            Some(7.5)
        );
    }
}
