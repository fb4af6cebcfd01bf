use crate::dataset::{InsarDataset, Station};
use crate::geodesy::haversine_distances;
use crate::prelude::{AnalysisConfig, DEFAULT_INSAR_RADIUS_METERS};

/// Selects the InSAR points lying within a fixed radius of a station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMatcher {
    radius_m: f64,
}

impl Default for SpatialMatcher {
    fn default() -> Self {
        Self::new(f64::from(DEFAULT_INSAR_RADIUS_METERS))
    }
}

impl SpatialMatcher {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.radius_meters())
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Row indices of points at distance <= radius, in dataset order.
    pub fn match_indices(&self, latitude: f64, longitude: f64, dataset: &InsarDataset) -> Vec<usize> {
        let distances = haversine_distances(
            latitude,
            longitude,
            dataset.latitudes(),
            dataset.longitudes(),
        );
        distances
            .iter()
            .enumerate()
            .filter(|(_, &d)| d <= self.radius_m)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Points around `station`; an empty result means no coverage at this stage.
    pub fn select(&self, station: &Station, dataset: &InsarDataset) -> InsarDataset {
        let indices = self.match_indices(station.latitude, station.longitude, dataset);
        dataset.select(&indices)
    }
}
