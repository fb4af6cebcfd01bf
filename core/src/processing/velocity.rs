use crate::dataset::{InsarDataset, Station};
use crate::math::stats::StatsHelper;
use crate::processing::averager::TemporalAverager;
use crate::processing::matcher::SpatialMatcher;
use crate::processing::outlier::OutlierFilter;

/// Per-point velocities that passed an outlier fence, with their positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocityField {
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    pub velocity: Vec<f64>,
}

impl VelocityField {
    /// Velocities of every point in `dataset`, fenced by `filter`.
    pub fn from_dataset(dataset: &InsarDataset, filter: &OutlierFilter) -> Self {
        let velocities = TemporalAverager::point_velocities(dataset);
        let kept = filter.apply(&velocities);
        let lons = dataset.longitudes();
        let lats = dataset.latitudes();
        Self {
            longitude: kept.indices.iter().map(|&i| lons[i]).collect(),
            latitude: kept.indices.iter().map(|&i| lats[i]).collect(),
            velocity: kept.velocities,
        }
    }

    /// Velocities of the points matched around `station`.
    pub fn around_station(
        matcher: &SpatialMatcher,
        station: &Station,
        dataset: &InsarDataset,
        filter: &OutlierFilter,
    ) -> Self {
        Self::from_dataset(&matcher.select(station, dataset), filter)
    }

    pub fn len(&self) -> usize {
        self.velocity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocity.is_empty()
    }

    pub fn mean(&self) -> f64 {
        StatsHelper::mean(&self.velocity)
    }

    pub fn std(&self) -> f64 {
        StatsHelper::sample_std(&self.velocity)
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let min = self.velocity.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.velocity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Epoch, PointRecord};

    fn dataset() -> InsarDataset {
        let epochs = vec![
            Epoch::parse("20200101").unwrap(),
            Epoch::parse("20200201").unwrap(),
        ];
        let rows = [
            (40.0, -3.0, [1.0, 1.0]),
            (40.001, -3.0, [2.0, 2.0]),
            (40.002, -3.0, [3.0, 3.0]),
            (40.003, -3.0, [4.0, 4.0]),
            (40.004, -3.0, [99.0, 101.0]),
            (45.0, 5.0, [2.5, 2.5]),
        ];
        let points: Vec<PointRecord> = rows
            .iter()
            .map(|&(latitude, longitude, values)| PointRecord {
                latitude,
                longitude,
                temporal_coherence: 0.9,
                displacement: values.to_vec(),
            })
            .collect();
        InsarDataset::from_points(epochs, &points).unwrap()
    }

    #[test]
    fn station_field_fences_local_outliers() {
        let station = Station {
            name: "MAD1".into(),
            latitude: 40.0,
            longitude: -3.0,
        };
        let field = VelocityField::around_station(
            &SpatialMatcher::new(500.0),
            &station,
            &dataset(),
            &OutlierFilter::station_map(),
        );
        assert_eq!(field.velocity, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(field.latitude, vec![40.0, 40.001, 40.002, 40.003]);
        assert_eq!(field.range(), Some((1.0, 4.0)));
    }

    #[test]
    fn regional_field_keeps_positions_aligned() {
        let field = VelocityField::from_dataset(&dataset(), &OutlierFilter::regional_map());
        assert_eq!(field.len(), 5);
        assert_eq!(field.longitude[4], 5.0);
        assert_eq!(field.velocity[4], 2.5);
        assert!((field.mean() - 2.5).abs() < 1e-12);
    }
}
