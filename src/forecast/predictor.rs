use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::features::{features_at, training_rows};
use super::model::LinearModel;
use super::{ForecastError, Result};

const MIN_SAMPLES: usize = 100;
const MIN_ROWS: usize = 50;
/// One row in five is held out for evaluation.
const TEST_DIVISOR: usize = 5;
const FORECAST_HOURS: i64 = 24;
const DEFAULT_PM25: f64 = 10.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A concentration fit for output: rounded, and positive zero for anything
/// that isn't above zero.
fn predicted_concentration(value: f64) -> f64 {
    let rounded = round2(value);
    if rounded > 0.0 {
        rounded
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub mae: f64,
    pub rmse: f64,
    pub training_samples: usize,
    pub test_samples: usize,
}

/// A model trained for one location.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: LinearModel,
    report: TrainingReport,
}

impl Predictor {
    /// Train on a chronologically ordered pm25 series.
    pub fn train(series: &[(DateTime<Utc>, f64)]) -> Result<Self> {
        if series.len() < MIN_SAMPLES {
            return Err(ForecastError::InsufficientData {
                samples: series.len(),
            });
        }

        let (rows, targets) = training_rows(series);
        if rows.len() < MIN_ROWS {
            return Err(ForecastError::NotEnoughRows { rows: rows.len() });
        }

        let test_len = rows.len().div_ceil(TEST_DIVISOR);
        let split = rows.len() - test_len;

        let model = LinearModel::fit(&rows[..split], &targets[..split])
            .ok_or(ForecastError::Singular)?;

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (row, actual) in rows[split..].iter().zip(&targets[split..]) {
            let err = model.predict(row) - actual;
            abs_sum += err.abs();
            sq_sum += err * err;
        }
        let n = test_len as f64;

        Ok(Self {
            model,
            report: TrainingReport {
                mae: round2(abs_sum / n),
                rmse: round2((sq_sum / n).sqrt()),
                training_samples: split,
                test_samples: test_len,
            },
        })
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    /// Hourly predictions for the 24 hours after `now`.
    pub fn forecast(&self, conditions: &CurrentConditions, now: DateTime<Utc>) -> Vec<ForecastPoint> {
        (1..=FORECAST_HOURS)
            .map(|hours| {
                let time = now + Duration::hours(hours);
                let features = features_at(
                    time,
                    conditions.avg_6h,
                    conditions.avg_24h,
                    conditions.current,
                    conditions.ago_6h,
                    conditions.ago_24h,
                );
                ForecastPoint {
                    timestamp: time,
                    predicted_pm25: predicted_concentration(self.model.predict(&features)),
                    confidence: "medium",
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted_pm25: f64,
    pub confidence: &'static str,
}

/// Recent pm25 statistics that seed a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub current: f64,
    #[serde(rename = "6h_avg")]
    pub avg_6h: f64,
    #[serde(rename = "24h_avg")]
    pub avg_24h: f64,
    #[serde(rename = "6h_ago")]
    pub ago_6h: f64,
    #[serde(rename = "24h_ago")]
    pub ago_24h: f64,
}

impl CurrentConditions {
    /// From recent values, newest first.
    pub fn from_recent(values: &[f64]) -> Self {
        let (Some(newest), Some(oldest)) = (values.first(), values.last()) else {
            return Self {
                current: DEFAULT_PM25,
                avg_6h: DEFAULT_PM25,
                avg_24h: DEFAULT_PM25,
                ago_6h: DEFAULT_PM25,
                ago_24h: DEFAULT_PM25,
            };
        };
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;

        Self {
            current: *newest,
            avg_6h: mean(&values[..values.len().min(6)]),
            avg_24h: mean(values),
            ago_6h: values.get(6).copied().unwrap_or(*oldest),
            ago_24h: *oldest,
        }
    }
}

/// Trained predictors by location id. Retraining replaces the entry.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: Arc<RwLock<HashMap<u64, Arc<Predictor>>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, location_id: u64, predictor: Predictor) {
        self.models
            .write()
            .await
            .insert(location_id, Arc::new(predictor));
    }

    pub async fn get(&self, location_id: u64) -> Option<Arc<Predictor>> {
        self.models.read().await.get(&location_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly(n: usize, f: impl Fn(usize) -> f64) -> Vec<(DateTime<Utc>, f64)> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| (start + Duration::hours(i as i64), f(i)))
            .collect()
    }

    #[test]
    fn test_minimum_samples() {
        let err = Predictor::train(&hourly(99, |_| 10.0)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { samples: 99 }));
    }

    #[test]
    fn test_train_split_and_metrics() {
        // 150 samples -> 125 rows -> 25 test, 100 training
        let series = hourly(150, |i| 20.0 + (i % 24) as f64);
        let predictor = Predictor::train(&series).unwrap();
        let report = predictor.report();
        assert_eq!(report.test_samples, 25);
        assert_eq!(report.training_samples, 100);
        assert!(report.mae >= 0.0);
        assert!(report.rmse >= report.mae);
    }

    #[test]
    fn test_forecast_is_hourly_and_non_negative() {
        let series = hourly(200, |i| if i % 2 == 0 { 0.0 } else { 50.0 });
        let predictor = Predictor::train(&series).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let conditions = CurrentConditions::from_recent(&[0.0; 3]);

        let points = predictor.forecast(&conditions, now);
        assert_eq!(points.len(), 24);
        assert_eq!(points[0].timestamp, now + Duration::hours(1));
        assert_eq!(points[23].timestamp, now + Duration::hours(24));
        for p in &points {
            assert!(p.predicted_pm25 >= 0.0);
            assert_eq!(p.confidence, "medium");
            assert_eq!(p.predicted_pm25, round2(p.predicted_pm25));
        }
    }

    #[test]
    fn test_predicted_concentration_has_no_negative_zero() {
        assert_eq!(predicted_concentration(12.345_6), 12.35);
        assert_eq!(predicted_concentration(-0.001).to_bits(), 0.0_f64.to_bits());
        assert_eq!(predicted_concentration(-7.5).to_bits(), 0.0_f64.to_bits());
        assert_eq!(predicted_concentration(f64::NAN), 0.0);
        assert_eq!(
            serde_json::to_string(&predicted_concentration(-0.001)).unwrap(),
            "0.0"
        );
    }

    #[test]
    fn test_current_conditions() {
        let empty = CurrentConditions::from_recent(&[]);
        assert_eq!(empty.current, 10.0);
        assert_eq!(empty.ago_24h, 10.0);

        let few = CurrentConditions::from_recent(&[4.0, 2.0, 6.0]);
        assert_eq!(few.current, 4.0);
        assert_eq!(few.avg_6h, 4.0);
        assert_eq!(few.avg_24h, 4.0);
        assert_eq!(few.ago_6h, 6.0);
        assert_eq!(few.ago_24h, 6.0);

        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let many = CurrentConditions::from_recent(&values);
        assert_eq!(many.avg_6h, 3.5);
        assert_eq!(many.avg_24h, 4.5);
        assert_eq!(many.ago_6h, 7.0);
        assert_eq!(many.ago_24h, 8.0);

        let json = serde_json::to_value(&many).unwrap();
        assert_eq!(json["6h_avg"], 3.5);
        assert_eq!(json["24h_ago"], 8.0);
    }

    #[tokio::test]
    async fn test_registry_replaces_on_retrain() {
        let registry = ModelRegistry::new();
        assert!(registry.get(7).await.is_none());

        registry
            .insert(7, Predictor::train(&hourly(120, |_| 5.0)).unwrap())
            .await;
        registry
            .insert(7, Predictor::train(&hourly(160, |_| 5.0)).unwrap())
            .await;

        let predictor = registry.get(7).await.unwrap();
        // 160 samples -> 135 rows -> 27 test
        assert_eq!(predictor.report().test_samples, 27);
    }
}
