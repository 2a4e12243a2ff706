//! Pulling OpenAQ data into the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use crate::config::ConfigHelper;
use crate::openaq::{ApiSensor, MeasurementsQuery, OpenAqApi};
use crate::store::{LocationQuery, MeasurementRecord, Store};

use super::parameters::ParameterResolver;
use super::{IngestError, Result};

const PM25: &str = "pm25";
const HISTORY_PAGE_SIZE: u32 = 1000;

// =============================================================================
// Settings and Summaries
// =============================================================================

/// Knobs for the ingestor, normally derived from the config.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub country: String,
    pub location_limit: usize,
    pub location_delay: Duration,
    pub page_delay: Duration,
    pub parameter_cache_size: usize,
}

impl From<&ConfigHelper> for IngestSettings {
    fn from(helper: &ConfigHelper) -> Self {
        let config = helper.config();
        Self {
            country: config.openaq.country.clone(),
            location_limit: config.scheduler.location_limit,
            location_delay: helper.location_delay(),
            page_delay: helper.page_delay(),
            parameter_cache_size: config.openaq.parameter_cache_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub location_id: u64,
    pub fetched: usize,
    pub saved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshAllSummary {
    pub locations: usize,
    pub refreshed: usize,
    pub with_data: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillLocationsSummary {
    pub pages: usize,
    pub locations: usize,
    pub sensors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSensorSummary {
    pub sensor_id: u64,
    pub pages: usize,
    pub fetched: usize,
    pub saved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorHistory {
    pub sensor_id: u64,
    pub saved: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub location_id: u64,
    pub days: u32,
    pub sensors: Vec<SensorHistory>,
    pub total: usize,
}

// =============================================================================
// Ingestor
// =============================================================================

pub struct Ingestor {
    store: Arc<Store>,
    api: Arc<dyn OpenAqApi>,
    parameters: ParameterResolver,
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(store: Arc<Store>, api: Arc<dyn OpenAqApi>, settings: IngestSettings) -> Self {
        Self {
            parameters: ParameterResolver::new(settings.parameter_cache_size),
            store,
            api,
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Fetch a location's latest results from OpenAQ and store them.
    ///
    /// A failing API call fails the whole refresh; a result that can't be
    /// stored is logged and counted as skipped.
    pub async fn refresh_location(&self, location_id: u64) -> Result<RefreshSummary> {
        let results = self.api.location_latest(location_id).await?;
        let mut summary = RefreshSummary {
            location_id,
            fetched: results.len(),
            ..Default::default()
        };
        if results.is_empty() {
            tracing::warn!(location_id, "no latest results returned");
            return Ok(summary);
        }

        for result in results {
            let Some(sensor_id) = result.sensor_id else {
                tracing::warn!(location_id, "latest result without sensor id, skipping");
                summary.skipped += 1;
                continue;
            };
            let Some(timestamp) = result.timestamp else {
                tracing::warn!(location_id, sensor_id, "latest result without timestamp, skipping");
                summary.skipped += 1;
                continue;
            };

            let parameter_name = self
                .parameters
                .resolve(sensor_id, &self.store, self.api.as_ref())
                .await;
            let record = MeasurementRecord {
                sensor_id,
                location_id: Some(location_id),
                timestamp,
                parameter_name: Some(parameter_name),
                value: result.value,
                coordinates: result.coordinates,
                raw: result.raw,
            };

            match self.store.upsert_measurement(&record).await {
                Ok(_) => summary.saved += 1,
                Err(e) => {
                    tracing::error!(location_id, sensor_id, error = %e, "failed to store measurement");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            location_id,
            saved = summary.saved,
            fetched = summary.fetched,
            "refreshed location"
        );
        Ok(summary)
    }

    /// Refresh every stored location of the configured country.
    ///
    /// Stops between locations once `shutdown` flips to true.
    pub async fn refresh_all(
        &self,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> Result<RefreshAllSummary> {
        let locations = self
            .store
            .locations(&LocationQuery {
                country_code: Some(self.settings.country.clone()),
                limit: self.settings.location_limit,
                offset: 0,
            })
            .await?;
        tracing::info!(count = locations.len(), "refreshing locations");

        let mut summary = RefreshAllSummary {
            locations: locations.len(),
            ..Default::default()
        };
        if locations.is_empty() {
            tracing::warn!(country = %self.settings.country, "no locations in store");
            return Ok(summary);
        }

        for (i, location) in locations.iter().enumerate() {
            if i > 0 && !pause(self.settings.location_delay, &mut shutdown).await {
                summary.cancelled = true;
                break;
            }

            match self.refresh_location(location.id).await {
                Ok(_) => summary.refreshed += 1,
                Err(e) => {
                    tracing::error!(location_id = location.id, error = %e, "failed to refresh location");
                    summary.failed += 1;
                }
            }

            match self.store.location_measurement_count(location.id).await {
                Ok(0) => tracing::warn!(location_id = location.id, "location has no measurements"),
                Ok(_) => summary.with_data += 1,
                Err(e) => tracing::warn!(location_id = location.id, error = %e, "failed to count measurements"),
            }
        }

        tracing::info!(
            refreshed = summary.refreshed,
            locations = summary.locations,
            with_data = summary.with_data,
            failed = summary.failed,
            "refresh complete"
        );
        Ok(summary)
    }

    /// Page through a country's locations, storing each one and its sensors.
    pub async fn backfill_locations(
        &self,
        country: &str,
        page_size: u32,
    ) -> Result<BackfillLocationsSummary> {
        let mut summary = BackfillLocationsSummary::default();
        let mut page = 1;

        loop {
            let locations = self.api.locations(Some(country), page_size, page).await?;
            if locations.is_empty() {
                break;
            }
            tracing::info!(page, count = locations.len(), "fetched locations");
            summary.pages += 1;

            for location in locations {
                self.store.upsert_location(&location.record).await?;
                summary.locations += 1;

                let sensors = if location.sensors.is_empty() {
                    self.sensors_from_detail(location.record.id).await
                } else {
                    location.sensors
                };
                for sensor in &sensors {
                    self.store
                        .upsert_sensor(&sensor.to_record(location.record.id))
                        .await?;
                    summary.sensors += 1;
                }
            }

            page += 1;
            tokio::time::sleep(self.settings.page_delay).await;
        }

        Ok(summary)
    }

    async fn sensors_from_detail(&self, location_id: u64) -> Vec<ApiSensor> {
        match self.api.location(location_id).await {
            Ok(detail) => detail.sensors,
            Err(e) => {
                tracing::warn!(location_id, error = %e, "failed to fetch location sensors");
                Vec::new()
            }
        }
    }

    /// Store up to `pages` pages of a sensor's measurements.
    pub async fn backfill_sensor(
        &self,
        sensor_id: u64,
        location_id: Option<u64>,
        pages: u32,
        page_size: u32,
    ) -> Result<BackfillSensorSummary> {
        let location_id = match location_id {
            Some(id) => Some(id),
            None => self.store.sensor(sensor_id).await?.map(|s| s.location_id),
        };
        let mut summary = BackfillSensorSummary {
            sensor_id,
            ..Default::default()
        };

        for page in 1..=pages {
            if page > 1 {
                tokio::time::sleep(self.settings.page_delay).await;
            }
            let query = MeasurementsQuery {
                limit: page_size,
                page,
                ..Default::default()
            };
            let measurements = self.api.sensor_measurements(sensor_id, &query).await?;
            if measurements.is_empty() {
                break;
            }
            summary.pages += 1;
            summary.fetched += measurements.len();

            for measurement in measurements {
                let Some(record) = measurement.to_record(sensor_id, location_id) else {
                    summary.skipped += 1;
                    continue;
                };
                self.store.upsert_measurement(&record).await?;
                summary.saved += 1;
            }
        }

        tracing::info!(sensor_id, saved = summary.saved, pages = summary.pages, "backfilled sensor");
        Ok(summary)
    }

    /// Store the last `days` days of pm25 measurements for each pm25 sensor
    /// of a stored location.
    pub async fn backfill_history(&self, location_id: u64, days: u32) -> Result<HistorySummary> {
        if self.store.location(location_id).await?.is_none() {
            return Err(IngestError::LocationNotFound(location_id));
        }

        let end = Utc::now();
        let start = end - chrono::Duration::days(i64::from(days));
        let sensors: Vec<_> = self
            .store
            .sensors_by_location(location_id)
            .await?
            .into_iter()
            .filter(|s| s.parameter_name.as_deref() == Some(PM25))
            .collect();
        tracing::info!(location_id, sensors = sensors.len(), days, "backfilling pm25 history");

        let mut summary = HistorySummary {
            location_id,
            days,
            ..Default::default()
        };

        for sensor in sensors {
            let mut saved = 0;
            let mut page = 1;
            loop {
                let query = MeasurementsQuery {
                    limit: HISTORY_PAGE_SIZE,
                    page,
                    datetime_from: Some(start),
                    datetime_to: Some(end),
                };
                let measurements = match self.api.sensor_measurements(sensor.id, &query).await {
                    Ok(measurements) => measurements,
                    Err(e) => {
                        tracing::warn!(sensor_id = sensor.id, page, error = %e, "history page failed");
                        break;
                    }
                };
                if measurements.is_empty() {
                    break;
                }

                for measurement in measurements {
                    let Some(record) = measurement.to_record(sensor.id, Some(location_id)) else {
                        continue;
                    };
                    match self.store.upsert_measurement(&record).await {
                        Ok(_) => saved += 1,
                        Err(e) => tracing::warn!(sensor_id = sensor.id, error = %e, "save failed"),
                    }
                }

                page += 1;
                tokio::time::sleep(self.settings.page_delay).await;
            }

            tracing::info!(sensor_id = sensor.id, saved, "backfilled sensor history");
            summary.total += saved;
            summary.sensors.push(SensorHistory {
                sensor_id: sensor.id,
                saved,
            });
        }

        Ok(summary)
    }
}

/// Sleep for `duration`. Returns false if shutdown was requested first.
async fn pause(duration: Duration, shutdown: &mut Option<watch::Receiver<bool>>) -> bool {
    let Some(rx) = shutdown else {
        tokio::time::sleep(duration).await;
        return true;
    };
    if *rx.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = rx.changed() => {}
    }
    !*rx.borrow()
}

// =============================================================================
// Tests
// =============================================================================
