use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MIN_TEMPORAL_COHERENCE: f64 = 0.7;
pub const DEFAULT_INSAR_RADIUS_METERS: u32 = 500;

/// Numerical settings shared by every analysis component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// InSAR points below this coherence are discarded before matching.
    pub min_temporal_coherence: f64,
    /// Inclusive matching radius around each station.
    pub insar_radius_meters: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_temporal_coherence: DEFAULT_MIN_TEMPORAL_COHERENCE,
            insar_radius_meters: DEFAULT_INSAR_RADIUS_METERS,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(0.0..=1.0).contains(&self.min_temporal_coherence) {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_temporal_coherence must lie in [0, 1], got {}",
                self.min_temporal_coherence
            )));
        }
        if self.insar_radius_meters == 0 {
            return Err(AnalysisError::InvalidConfig(
                "insar_radius_meters must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn radius_meters(&self) -> f64 {
        f64::from(self.insar_radius_meters)
    }
}

/// Common error type for loading and analysis.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv failure in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("missing column `{column}` in {path}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("malformed epoch column `{0}` (expected YYYYMMDD)")]
    MalformedEpoch(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("empty dataset: {0}")]
    EmptyDataset(String),
    #[error("insufficient data: need at least {required} valid points, found {found}")]
    InsufficientData { required: usize, found: usize },
    #[error("cannot fit a trend: all {points} x values are identical")]
    ConstantAbscissa { points: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.min_temporal_coherence, 0.7);
        assert_eq!(cfg.insar_radius_meters, 500);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cfg = AnalysisConfig {
            min_temporal_coherence: 1.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(AnalysisError::InvalidConfig(_))));

        let cfg = AnalysisConfig {
            insar_radius_meters: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
