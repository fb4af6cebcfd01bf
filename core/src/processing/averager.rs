use crate::dataset::{Epoch, InsarDataset};
use crate::math::stats::StatsHelper;
use ndarray::Axis;

/// Mean displacement per epoch over a set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSeries {
    pub epochs: Vec<Epoch>,
    /// One value per epoch; NaN where no point reported a value.
    pub values: Vec<f64>,
}

impl EpochSeries {
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn has_data(&self) -> bool {
        self.valid_count() > 0
    }
}

pub struct TemporalAverager;

impl TemporalAverager {
    /// Averages each epoch column over the points that have a value for it.
    pub fn average(dataset: &InsarDataset) -> EpochSeries {
        let values = dataset
            .displacement()
            .axis_iter(Axis(1))
            .map(|column| StatsHelper::nan_mean(column.iter().copied()))
            .collect();
        EpochSeries {
            epochs: dataset.epochs().to_vec(),
            values,
        }
    }

    /// Per-point mean over all present epochs, used as the point velocity.
    pub fn point_velocities(dataset: &InsarDataset) -> Vec<f64> {
        dataset
            .displacement()
            .axis_iter(Axis(0))
            .map(|row| StatsHelper::nan_mean(row.iter().copied()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PointRecord;

    fn epochs() -> Vec<Epoch> {
        ["20200101", "20200201", "20200301"]
            .iter()
            .map(|id| Epoch::parse(id).unwrap())
            .collect()
    }

    fn point(values: Vec<f64>) -> PointRecord {
        PointRecord {
            latitude: 40.0,
            longitude: -3.0,
            temporal_coherence: 0.9,
            displacement: values,
        }
    }

    #[test]
    fn single_point_series_is_returned_unchanged() {
        let data = InsarDataset::from_points(epochs(), &[point(vec![1.5, -2.0, 7.25])]).unwrap();
        let series = TemporalAverager::average(&data);
        assert_eq!(series.values, vec![1.5, -2.0, 7.25]);
        assert_eq!(series.epochs, epochs());
    }

    #[test]
    fn missing_values_are_excluded_from_the_mean() {
        let data = InsarDataset::from_points(
            epochs(),
            &[
                point(vec![1.0, f64::NAN, 3.0]),
                point(vec![3.0, 4.0, f64::NAN]),
            ],
        )
        .unwrap();
        let series = TemporalAverager::average(&data);
        assert_eq!(series.values, vec![2.0, 4.0, 3.0]);
        assert_eq!(series.valid_count(), 3);
    }

    #[test]
    fn empty_subset_yields_nan_everywhere() {
        let data = InsarDataset::from_points(epochs(), &[point(vec![1.0, 2.0, 3.0])]).unwrap();
        let series = TemporalAverager::average(&data.select(&[]));
        assert_eq!(series.values.len(), 3);
        assert!(series.values.iter().all(|v| v.is_nan()));
        assert!(!series.has_data());
    }

    #[test]
    fn point_velocities_average_each_row() {
        let data = InsarDataset::from_points(
            epochs(),
            &[
                point(vec![1.0, 2.0, 3.0]),
                point(vec![f64::NAN, 4.0, 8.0]),
                point(vec![f64::NAN; 3]),
            ],
        )
        .unwrap();
        let velocities = TemporalAverager::point_velocities(&data);
        assert_eq!(velocities[0], 2.0);
        assert_eq!(velocities[1], 6.0);
        assert!(velocities[2].is_nan());
    }
}
