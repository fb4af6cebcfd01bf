use crate::math::stats::StatsHelper;

/// IQR multiplier for the per-station velocity maps.
pub const STATION_MAP_IQR_FACTOR: f64 = 1.5;
/// IQR multiplier for the regional map, which spans a wider area and
/// tolerates more spread.
pub const REGIONAL_MAP_IQR_FACTOR: f64 = 2.0;

/// Points that survived the IQR fence, with their velocities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredVelocities {
    /// Positions in the input, ascending.
    pub indices: Vec<usize>,
    pub velocities: Vec<f64>,
}

impl FilteredVelocities {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Tukey fence on a velocity distribution: keeps `[Q1 - k*IQR, Q3 + k*IQR]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    factor: f64,
}

impl OutlierFilter {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn station_map() -> Self {
        Self::new(STATION_MAP_IQR_FACTOR)
    }

    pub fn regional_map() -> Self {
        Self::new(REGIONAL_MAP_IQR_FACTOR)
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Inclusive acceptance interval, or `None` without finite velocities.
    pub fn bounds(&self, velocities: &[f64]) -> Option<(f64, f64)> {
        let mut sorted: Vec<f64> = velocities.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        let q1 = StatsHelper::quantile(&sorted, 0.25)?;
        let q3 = StatsHelper::quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some((q1 - self.factor * iqr, q3 + self.factor * iqr))
    }

    pub fn apply(&self, velocities: &[f64]) -> FilteredVelocities {
        let Some((lower, upper)) = self.bounds(velocities) else {
            return FilteredVelocities::default();
        };
        let (indices, kept): (Vec<usize>, Vec<f64>) = velocities
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= lower && v <= upper)
            .map(|(idx, &v)| (idx, v))
            .unzip();
        FilteredVelocities {
            indices,
            velocities: kept,
        }
    }
}
