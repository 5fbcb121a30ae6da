//! Per-column standardisation to zero mean and unit variance.

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::features::FeatureMismatch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}
impl StandardScaler {
    /// Fits column means and population standard deviations. A constant column is given a scale of 1.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, anyhow::Error> {
        let Some(first) = rows.first() else {
            bail!("cannot fit a scaler to an empty sample");
        };
        let cols = first.len();
        if rows.iter().any(|row| row.len() != cols) {
            bail!("all rows must have {cols} columns");
        }
        let samples = rows.len() as f64;
        let mut means = vec![0.; cols];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= samples;
        }
        let mut scales = vec![0.; cols];
        for row in rows {
            for (col, value) in row.iter().enumerate() {
                scales[col] += (value - means[col]).powi(2);
            }
        }
        for scale in &mut scales {
            *scale = (*scale / samples).sqrt();
            if *scale == 0. || !scale.is_finite() {
                *scale = 1.;
            }
        }
        Ok(Self { means, scales })
    }

    pub fn cols(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, FeatureMismatch> {
        if row.len() != self.cols() {
            return Err(FeatureMismatch::Length {
                expected: self.cols(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect())
    }
}
