//! Top-level application component.
//!
//! The [`App`] owns all global services and is the root for the application's functionality.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::assessment::{assess, Assessment, Reading};
use crate::caches::{KeyValueDb, KeyValueDbError, LmdbKeyValueDb, MemoryKeyValueDb};
use crate::config::{read_config, Config, ConfigError, ConfigHelper, ConfigSource};
use crate::forecast::{CurrentConditions, ForecastError, ModelRegistry, Predictor, TrainingReport};
use crate::ingest::{IngestError, IngestSettings, Ingestor};
use crate::openaq::{HttpOpenAqClient, OpenAqApi, OpenAqError};
use crate::store::{Store, StoreError};

use super::reports::{Forecast, LatestReading, LocationDetail, LocationInspection, SensorLatest};

const PM25: &str = "pm25";
const RECENT_WINDOW_HOURS: i64 = 24;
const RECENT_LIMIT: usize = 100;
const INSPECT_SAMPLES: usize = 5;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during App operations.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open database: {0}")]
    Database(#[from] KeyValueDbError),

    #[error(transparent)]
    OpenAq(#[from] OpenAqError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Location not found")]
    LocationNotFound(u64),

    #[error("No PM2.5 sensors found for this location")]
    NoPm25Sensors(u64),
}

/// Result type for App operations.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Context Types
// =============================================================================

/// Context for creating an App.
#[derive(Default)]
pub struct AppContext {
    /// Source for configuration files.
    pub config_source: ConfigSource,
    /// Keep all data in memory instead of opening the configured database.
    pub in_memory: bool,
    /// Called with the resolved configuration before config warnings are logged.
    pub on_config: Option<fn(&Config)>,
}

// =============================================================================
// App
// =============================================================================

/// The top-level application component.
///
/// Owns the resolved configuration, the store, the OpenAQ client, the
/// ingestor and the trained forecast models.
pub struct App {
    config: ConfigHelper,
    store: Arc<Store>,
    ingestor: Arc<Ingestor>,
    models: ModelRegistry,
}

impl App {
    /// Create a new App with the given context.
    pub fn new(ctx: AppContext) -> Result<Self> {
        let config_result = read_config(&ctx.config_source)?;
        if let Some(on_config) = ctx.on_config {
            on_config(&config_result.config);
        }
        for warning in &config_result.warnings {
            warn!("{}", warning);
        }
        Self::open(ConfigHelper::new(config_result.config), ctx.in_memory)
    }

    /// Open the configured database unless `in_memory` is set.
    fn open(config: ConfigHelper, in_memory: bool) -> Result<Self> {
        let db: Arc<dyn KeyValueDb> = if in_memory {
            info!("using in-memory database");
            Arc::new(MemoryKeyValueDb::new())
        } else {
            let database = &config.config().database;
            info!(path = %database.path.display(), "opening database");
            Arc::new(LmdbKeyValueDb::new(&database.path, database.map_size.0)?)
        };
        let api = Arc::new(HttpOpenAqClient::new(&config)?);

        Ok(Self::from_parts(config, db, api))
    }

    /// Assemble an App from already-built services.
    pub fn from_parts(
        config: ConfigHelper,
        db: Arc<dyn KeyValueDb>,
        api: Arc<dyn OpenAqApi>,
    ) -> Self {
        let store = Arc::new(Store::new(db));
        let ingestor = Arc::new(Ingestor::new(
            store.clone(),
            api,
            IngestSettings::from(&config),
        ));
        Self {
            config,
            store,
            ingestor,
            models: ModelRegistry::new(),
        }
    }

    /// An App over a fresh in-memory database.
    pub fn in_memory(config: ConfigHelper, api: Arc<dyn OpenAqApi>) -> Self {
        Self::from_parts(config, Arc::new(MemoryKeyValueDb::new()), api)
    }

    /// Get the configuration helper.
    pub fn config(&self) -> &ConfigHelper {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn ingestor(&self) -> &Arc<Ingestor> {
        &self.ingestor
    }

    /// A stored location with each sensor's most recent measurement.
    pub async fn location_detail(&self, location_id: u64) -> Result<LocationDetail> {
        let location = self
            .store
            .location(location_id)
            .await?
            .ok_or(AppError::LocationNotFound(location_id))?;

        let mut sensors = Vec::new();
        for sensor in self.store.sensors_by_location(location_id).await? {
            let latest = self.store.latest_measurement(sensor.id).await?;
            sensors.push(SensorLatest { sensor, latest });
        }
        Ok(LocationDetail { location, sensors })
    }

    /// The most recent measurement of every sensor that has one.
    pub async fn latest_readings(&self, location_id: u64) -> Result<Vec<LatestReading>> {
        let mut readings = Vec::new();
        for sensor in self.store.sensors_by_location(location_id).await? {
            if let Some(measurement) = self.store.latest_measurement(sensor.id).await? {
                readings.push(LatestReading {
                    sensor,
                    measurement,
                });
            }
        }
        Ok(readings)
    }

    /// Health assessment of a location's latest readings.
    pub async fn assess_location(&self, location_id: u64) -> Result<Assessment> {
        if self.store.location(location_id).await?.is_none() {
            return Err(AppError::LocationNotFound(location_id));
        }

        let readings: Vec<Reading> = self
            .latest_readings(location_id)
            .await?
            .into_iter()
            .filter_map(|r| {
                let value = r.measurement.value?;
                let parameter = r
                    .sensor
                    .parameter_name
                    .or(r.measurement.parameter_name)?;
                Some(Reading {
                    parameter,
                    value,
                    units: r.sensor.parameter_unit,
                })
            })
            .collect();
        Ok(assess(&readings))
    }

    /// Recent pm25 statistics for a location with at least one pm25 sensor.
    pub async fn current_conditions(
        &self,
        location_id: u64,
        now: DateTime<Utc>,
    ) -> Result<CurrentConditions> {
        let has_pm25 = self
            .store
            .sensors_by_location(location_id)
            .await?
            .iter()
            .any(|s| s.parameter_name.as_deref() == Some(PM25));
        if !has_pm25 {
            return Err(AppError::NoPm25Sensors(location_id));
        }

        let since = now - Duration::hours(RECENT_WINDOW_HOURS);
        let values: Vec<f64> = self
            .store
            .location_measurements(location_id, Some(PM25), Some(since), Some(RECENT_LIMIT))
            .await?
            .into_iter()
            .filter_map(|m| m.value)
            .collect();
        Ok(CurrentConditions::from_recent(&values))
    }

    /// Train (or retrain) the forecaster for a location.
    pub async fn train_model(&self, location_id: u64) -> Result<TrainingReport> {
        let series = self.store.pm25_series(location_id).await?;
        let predictor = Predictor::train(&series)?;
        let report = predictor.report().clone();
        info!(
            location_id,
            mae = report.mae,
            rmse = report.rmse,
            samples = series.len(),
            "trained forecast model"
        );
        self.models.insert(location_id, predictor).await;
        Ok(report)
    }

    /// 24-hour forecast from a previously trained model.
    pub async fn forecast(&self, location_id: u64, now: DateTime<Utc>) -> Result<Forecast> {
        let predictor = self
            .models
            .get(location_id)
            .await
            .ok_or(ForecastError::NotTrained)?;
        let current_conditions = self.current_conditions(location_id, now).await?;
        let forecast = predictor.forecast(&current_conditions, now);
        Ok(Forecast {
            location_id,
            generated_at: now,
            forecast,
            current_conditions,
        })
    }

    /// Summary of the pm25 history stored for a location.
    pub async fn inspect_location(&self, location_id: u64) -> Result<LocationInspection> {
        let location = self.store.location(location_id).await?;
        let series = self.store.pm25_series(location_id).await?;
        let recent = series
            .iter()
            .rev()
            .take(INSPECT_SAMPLES)
            .copied()
            .collect();
        Ok(LocationInspection {
            location_id,
            name: location.and_then(|l| l.name),
            pm25_count: series.len(),
            oldest: series.first().map(|(t, _)| *t),
            newest: series.last().map(|(t, _)| *t),
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering as AtomicOrdering};

    use crate::config::default_config;
    use crate::openaq::FixtureOpenAqClient;
    use crate::store::{LocationRecord, MeasurementRecord, SensorRecord};
    use chrono::TimeZone;
    use serde_json::Value;

    fn app() -> App {
        App::in_memory(
            ConfigHelper::new(default_config()),
            Arc::new(FixtureOpenAqClient::new()),
        )
    }

    fn location(id: u64) -> LocationRecord {
        LocationRecord {
            id,
            name: Some("Accra Central".to_string()),
            city: Some("Accra".to_string()),
            country: Some("Ghana".to_string()),
            country_code: Some("GH".to_string()),
            latitude: Some(5.55),
            longitude: Some(-0.2),
            is_mobile: false,
            is_monitor: true,
            first_measurement: None,
            last_measurement: None,
            raw: Value::Null,
        }
    }

    fn sensor(id: u64, location_id: u64, parameter: &str) -> SensorRecord {
        SensorRecord {
            id,
            location_id,
            name: Some(format!("{} µg/m³", parameter)),
            parameter_id: None,
            parameter_name: Some(parameter.to_string()),
            parameter_unit: Some("µg/m³".to_string()),
            raw: Value::Null,
        }
    }

    fn measurement(sensor_id: u64, location_id: u64, ts: DateTime<Utc>, value: f64) -> MeasurementRecord {
        MeasurementRecord {
            sensor_id,
            location_id: Some(location_id),
            timestamp: ts,
            parameter_name: Some(PM25.to_string()),
            value: Some(value),
            coordinates: None,
            raw: Value::Null,
        }
    }

    static CONFIGURED_PORT: AtomicU16 = AtomicU16::new(0);

    fn record_port(config: &Config) {
        CONFIGURED_PORT.store(config.server.port, AtomicOrdering::SeqCst);
    }

    #[tokio::test]
    async fn test_new_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airsafe.ini");
        std::fs::write(&path, "[openaq]\ncountry = ng\n\n[server]\nport = 9000\n").unwrap();

        let app = App::new(AppContext {
            config_source: ConfigSource {
                config_file: Some(path),
                ..Default::default()
            },
            in_memory: true,
            on_config: Some(record_port),
        })
        .unwrap();
        assert_eq!(CONFIGURED_PORT.load(AtomicOrdering::SeqCst), 9000);
        assert_eq!(app.config().config().openaq.country, "NG");
        assert_eq!(app.ingestor().settings().country, "NG");
        assert_eq!(app.config().config().server.port, 9000);
        assert_eq!(app.store().stats().await.unwrap().locations, 0);
    }

    #[test]
    fn test_new_with_missing_config_file() {
        let result = App::new(AppContext {
            config_source: ConfigSource {
                config_file: Some("/nonexistent/airsafe.ini".into()),
                ..Default::default()
            },
            in_memory: true,
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Config(ConfigError::FileNotFound(_)))));
    }

    #[tokio::test]
    async fn test_missing_location() {
        let app = app();
        assert!(matches!(
            app.location_detail(9).await,
            Err(AppError::LocationNotFound(9))
        ));
        assert!(matches!(
            app.assess_location(9).await,
            Err(AppError::LocationNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_assessment_uses_latest_readings() {
        let app = app();
        let store = app.store();
        store.upsert_location(&location(1)).await.unwrap();
        store.upsert_sensor(&sensor(10, 1, PM25)).await.unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store
            .upsert_measurement(&measurement(10, 1, t0, 80.0))
            .await
            .unwrap();
        store
            .upsert_measurement(&measurement(10, 1, t0 + Duration::hours(1), 8.0))
            .await
            .unwrap();

        let assessment = app.assess_location(1).await.unwrap();
        assert_eq!(assessment.overall_quality, crate::assessment::Level::Good);
        assert_eq!(assessment.data_confidence, "medium");
    }

    #[tokio::test]
    async fn test_current_conditions_requires_pm25_sensor() {
        let app = app();
        let store = app.store();
        store.upsert_location(&location(1)).await.unwrap();
        store.upsert_sensor(&sensor(11, 1, "temperature")).await.unwrap();

        let now = Utc::now();
        assert!(matches!(
            app.current_conditions(1, now).await,
            Err(AppError::NoPm25Sensors(1))
        ));

        store.upsert_sensor(&sensor(10, 1, PM25)).await.unwrap();
        let conditions = app.current_conditions(1, now).await.unwrap();
        assert_eq!(conditions.current, 10.0);

        store
            .upsert_measurement(&measurement(10, 1, now - Duration::hours(30), 99.0))
            .await
            .unwrap();
        store
            .upsert_measurement(&measurement(10, 1, now - Duration::hours(2), 20.0))
            .await
            .unwrap();
        store
            .upsert_measurement(&measurement(10, 1, now - Duration::hours(1), 30.0))
            .await
            .unwrap();
        let conditions = app.current_conditions(1, now).await.unwrap();
        assert_eq!(conditions.current, 30.0);
        assert_eq!(conditions.avg_24h, 25.0);
        assert_eq!(conditions.ago_24h, 20.0);
    }

    #[tokio::test]
    async fn test_train_then_forecast() {
        let app = app();
        let store = app.store();
        store.upsert_location(&location(1)).await.unwrap();
        store.upsert_sensor(&sensor(10, 1, PM25)).await.unwrap();

        let now = Utc::now();
        assert!(matches!(
            app.forecast(1, now).await,
            Err(AppError::Forecast(ForecastError::NotTrained))
        ));

        let start = now - Duration::hours(150);
        for i in 0..150 {
            let value = 15.0 + f64::from(i % 24);
            store
                .upsert_measurement(&measurement(10, 1, start + Duration::hours(i64::from(i)), value))
                .await
                .unwrap();
        }

        let report = app.train_model(1).await.unwrap();
        assert_eq!(report.training_samples + report.test_samples, 125);

        let forecast = app.forecast(1, now).await.unwrap();
        assert_eq!(forecast.location_id, 1);
        assert_eq!(forecast.forecast.len(), 24);
        assert!(forecast.forecast.iter().all(|p| p.predicted_pm25 >= 0.0));
    }

    #[tokio::test]
    async fn test_train_with_too_little_data() {
        let app = app();
        let err = app.train_model(5).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Forecast(ForecastError::InsufficientData { samples: 0 })
        ));
    }

    #[tokio::test]
    async fn test_inspect_location() {
        let app = app();
        let store = app.store();
        store.upsert_location(&location(1)).await.unwrap();
        store.upsert_sensor(&sensor(10, 1, PM25)).await.unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for i in 0..8 {
            store
                .upsert_measurement(&measurement(10, 1, t0 + Duration::hours(i), i as f64))
                .await
                .unwrap();
        }

        let inspection = app.inspect_location(1).await.unwrap();
        assert_eq!(inspection.pm25_count, 8);
        assert_eq!(inspection.oldest, Some(t0));
        assert_eq!(inspection.newest, Some(t0 + Duration::hours(7)));
        assert_eq!(inspection.recent.len(), 5);
        assert_eq!(inspection.recent[0].1, 7.0);
    }
}
