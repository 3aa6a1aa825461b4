//! Small statistics helpers shared by the forecaster and anomaly detector

use serde::Serialize;

/// Running mean and standard deviation of a group of amounts (Welford)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Baseline {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Baseline {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut baseline = Self::default();
        for value in values {
            baseline.push(value);
        }
        baseline
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation (n - 1); 0 for fewer than two observations
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }
}

/// Least-squares line through `(index, value)` points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 1.0 when the values never vary
    pub r_squared: f64,
}

impl LinearFit {
    /// Fit `values[i]` against `i`. Needs at least two points.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let n = values.len();
        if n < 2 {
            return None;
        }

        let n_f = n as f64;
        let mean_x = (n_f - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n_f;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (i, y) in values.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxx += dx * dx;
            sxy += dx * (y - mean_y);
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (i, y) in values.iter().enumerate() {
            let predicted = intercept + slope * i as f64;
            ss_res += (y - predicted).powi(2);
            ss_tot += (y - mean_y).powi(2);
        }

        let r_squared = if ss_tot == 0.0 {
            1.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}
