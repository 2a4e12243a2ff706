//! Ridge-regularised linear regression on standardised features.

use super::features::{Features, FEATURE_COUNT};

const RIDGE_PENALTY: f64 = 1.0;
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    means: Features,
    scales: Features,
    weights: Features,
    intercept: f64,
}

impl LinearModel {
    /// Fit on `rows` and `targets`, which must be the same non-zero length.
    ///
    /// Returns `None` if the normal equations can't be solved.
    pub fn fit(rows: &[Features], targets: &[f64]) -> Option<Self> {
        if rows.is_empty() || rows.len() != targets.len() {
            return None;
        }
        let n = rows.len() as f64;

        let mut means = [0.0; FEATURE_COUNT];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scales = [0.0; FEATURE_COUNT];
        for row in rows {
            for j in 0..FEATURE_COUNT {
                scales[j] += (row[j] - means[j]).powi(2) / n;
            }
        }
        for s in scales.iter_mut() {
            *s = s.sqrt();
            // Constant columns carry no signal; leave them unscaled
            if *s < PIVOT_EPSILON {
                *s = 1.0;
            }
        }

        let target_mean = targets.iter().sum::<f64>() / n;

        // Normal equations (XᵀX + λI) w = Xᵀy on centred data
        let mut a = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];
        let mut b = [0.0; FEATURE_COUNT];
        for (row, y) in rows.iter().zip(targets) {
            let z = standardise(row, &means, &scales);
            let yc = y - target_mean;
            for i in 0..FEATURE_COUNT {
                b[i] += z[i] * yc;
                for j in 0..FEATURE_COUNT {
                    a[i][j] += z[i] * z[j];
                }
            }
        }
        for (i, row) in a.iter_mut().enumerate() {
            row[i] += RIDGE_PENALTY;
        }

        let weights = solve(a, b)?;
        Some(Self {
            means,
            scales,
            weights,
            intercept: target_mean,
        })
    }

    pub fn predict(&self, features: &Features) -> f64 {
        let z = standardise(features, &self.means, &self.scales);
        self.intercept + z.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>()
    }
}

fn standardise(row: &Features, means: &Features, scales: &Features) -> Features {
    let mut z = [0.0; FEATURE_COUNT];
    for j in 0..FEATURE_COUNT {
        z[j] = (row[j] - means[j]) / scales[j];
    }
    z
}

/// Gaussian elimination with partial pivoting.
fn solve(
    mut a: [[f64; FEATURE_COUNT]; FEATURE_COUNT],
    mut b: [f64; FEATURE_COUNT],
) -> Option<Features> {
    for col in 0..FEATURE_COUNT {
        let pivot = (col..FEATURE_COUNT).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..FEATURE_COUNT {
            let factor = a[row][col] / a[col][col];
            for k in col..FEATURE_COUNT {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; FEATURE_COUNT];
    for row in (0..FEATURE_COUNT).rev() {
        let tail: f64 = (row + 1..FEATURE_COUNT).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lag_1: f64, hour: f64) -> Features {
        [hour, 2.0, 5.0, 0.0, lag_1, lag_1, lag_1, lag_1, lag_1]
    }

    #[test]
    fn test_recovers_linear_trend() {
        let rows: Vec<Features> = (0..200).map(|i| row(f64::from(i % 50), f64::from(i % 24))).collect();
        let targets: Vec<f64> = rows.iter().map(|r| 2.0 * r[6] + 3.0).collect();

        let model = LinearModel::fit(&rows, &targets).unwrap();
        let prediction = model.predict(&row(20.0, 5.0));
        assert!((prediction - 43.0).abs() < 1.0, "prediction was {}", prediction);
    }

    #[test]
    fn test_constant_target() {
        let rows: Vec<Features> = (0..20).map(|i| row(f64::from(i), 0.0)).collect();
        let targets = vec![7.0; 20];
        let model = LinearModel::fit(&rows, &targets).unwrap();
        assert!((model.predict(&row(3.0, 0.0)) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_mismatched_input() {
        assert!(LinearModel::fit(&[], &[]).is_none());
        assert!(LinearModel::fit(&[row(1.0, 1.0)], &[1.0, 2.0]).is_none());
    }
}
