use crate::prelude::{AnalysisError, AnalysisResult};
use serde::Serialize;

const MIN_FIT_POINTS: usize = 2;

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    /// Number of (x, y) pairs that entered the fit.
    pub points: usize,
}

impl Trend {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub struct TrendFitter;

impl TrendFitter {
    /// Ordinary least squares over the pairs where both coordinates are finite.
    pub fn fit(xs: &[f64], ys: &[f64]) -> AnalysisResult<Trend> {
        let pairs: Vec<(f64, f64)> = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let n = pairs.len();
        if n < MIN_FIT_POINTS {
            return Err(AnalysisError::InsufficientData {
                required: MIN_FIT_POINTS,
                found: n,
            });
        }

        let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
        let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;
        let (sxx, sxy) = pairs.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });
        if sxx == 0.0 {
            return Err(AnalysisError::ConstantAbscissa { points: n });
        }

        let slope = sxy / sxx;
        Ok(Trend {
            slope,
            intercept: mean_y - slope * mean_x,
            points: n,
        })
    }

    /// Fit against the 0-based sample index, treating epochs as equally spaced.
    pub fn fit_indexed(values: &[f64]) -> AnalysisResult<Trend> {
        let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        Self::fit(&xs, values)
    }
}
