//! Feature engineering for the PM2.5 forecaster.

use chrono::{DateTime, Datelike, Timelike, Utc};

pub const FEATURE_COUNT: usize = 9;

/// Rows need this much history before they have every lag.
const MAX_LAG: usize = 24;

pub type Features = [f64; FEATURE_COUNT];

/// Calendar features followed by trend and lag features, in model order:
/// hour, day of week (Monday 0), month, weekend flag, 6-sample mean,
/// 24-sample mean, lag 1, lag 6, lag 24.
pub fn features_at(
    time: DateTime<Utc>,
    avg_6: f64,
    avg_24: f64,
    lag_1: f64,
    lag_6: f64,
    lag_24: f64,
) -> Features {
    let day_of_week = time.weekday().num_days_from_monday();
    [
        f64::from(time.hour()),
        f64::from(day_of_week),
        f64::from(time.month()),
        if day_of_week >= 5 { 1.0 } else { 0.0 },
        avg_6,
        avg_24,
        lag_1,
        lag_6,
        lag_24,
    ]
}

fn trailing_mean(values: &[f64], end: usize, window: usize) -> f64 {
    let start = (end + 1).saturating_sub(window);
    let slice = &values[start..=end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Training rows from a chronologically ordered series.
///
/// Each row's target is the value that follows it. Rows without a full set of
/// lags, and the final row (which has no target), are dropped.
pub fn training_rows(series: &[(DateTime<Utc>, f64)]) -> (Vec<Features>, Vec<f64>) {
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let mut rows = Vec::new();
    let mut targets = Vec::new();

    if values.len() <= MAX_LAG + 1 {
        return (rows, targets);
    }

    for i in MAX_LAG..values.len() - 1 {
        rows.push(features_at(
            series[i].0,
            trailing_mean(&values, i, 6),
            trailing_mean(&values, i, 24),
            values[i - 1],
            values[i - 6],
            values[i - 24],
        ));
        targets.push(values[i + 1]);
    }

    (rows, targets)
}
