use crate::dataset::{GnssSeries, InsarDataset, Station};
use crate::prelude::AnalysisResult;
use crate::processing::averager::{EpochSeries, TemporalAverager};
use crate::processing::matcher::SpatialMatcher;
use crate::processing::trend::{Trend, TrendFitter};
use log::debug;

/// Averaged InSAR series around a station and its index-based trend.
#[derive(Debug, Clone)]
pub struct SeriesFit {
    pub matched_points: usize,
    pub series: EpochSeries,
    /// `None` when fewer than two epochs carry data.
    pub trend: Option<Trend>,
}

impl SeriesFit {
    pub fn compute(matcher: &SpatialMatcher, station: &Station, dataset: &InsarDataset) -> Self {
        let subset = matcher.select(station, dataset);
        let series = TemporalAverager::average(&subset);
        let trend = match TrendFitter::fit_indexed(&series.values) {
            Ok(trend) => Some(trend),
            Err(err) => {
                debug!("No InSAR trend for station {}: {}", station.name, err);
                None
            }
        };
        Self {
            matched_points: subset.len(),
            series,
            trend,
        }
    }

    pub fn has_data(&self) -> bool {
        self.matched_points > 0 && self.series.has_data()
    }
}

/// InSAR before and after plane alignment, matched to one station.
#[derive(Debug, Clone)]
pub struct StationComparison {
    pub station: Station,
    pub before: SeriesFit,
    pub after: SeriesFit,
}

impl StationComparison {
    pub fn compute(
        matcher: &SpatialMatcher,
        station: &Station,
        before: &InsarDataset,
        after: &InsarDataset,
    ) -> Self {
        Self {
            station: station.clone(),
            before: SeriesFit::compute(matcher, station, before),
            after: SeriesFit::compute(matcher, station, after),
        }
    }

    pub fn has_insar_data(&self) -> bool {
        self.before.has_data() || self.after.has_data()
    }
}

/// LOS trend of a GNSS series against calendar time in decimal years.
pub fn gnss_trend(series: &GnssSeries) -> AnalysisResult<Trend> {
    TrendFitter::fit(&series.decimal_years(), &series.los())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Epoch, PointRecord};
    use crate::prelude::AnalysisError;
    use std::path::Path;

    fn epochs() -> Vec<Epoch> {
        ["20200101", "20200201", "20200301"]
            .iter()
            .map(|id| Epoch::parse(id).unwrap())
            .collect()
    }

    fn station() -> Station {
        Station {
            name: "MAD1".into(),
            latitude: 40.0,
            longitude: -3.0,
        }
    }

    #[test]
    fn colocated_point_gives_unit_slope() {
        let data = InsarDataset::from_points(
            epochs(),
            &[PointRecord {
                latitude: 40.0,
                longitude: -3.0,
                temporal_coherence: 0.9,
                displacement: vec![1.0, 2.0, 3.0],
            }],
        )
        .unwrap();
        let matcher = SpatialMatcher::new(500.0);
        let fit = SeriesFit::compute(&matcher, &station(), &data);
        assert_eq!(fit.matched_points, 1);
        assert_eq!(fit.series.values, vec![1.0, 2.0, 3.0]);
        let trend = fit.trend.unwrap();
        assert!((trend.slope - 1.0).abs() < 1e-12);
        assert!((trend.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distant_points_leave_station_without_data() {
        let data = InsarDataset::from_points(
            epochs(),
            &[PointRecord {
                latitude: 41.0,
                longitude: -3.0,
                temporal_coherence: 0.9,
                displacement: vec![1.0, 2.0, 3.0],
            }],
        )
        .unwrap();
        let comparison =
            StationComparison::compute(&SpatialMatcher::default(), &station(), &data, &data);
        assert!(!comparison.has_insar_data());
        assert!(comparison.before.trend.is_none());
        assert!(comparison.before.series.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn gnss_trend_uses_decimal_years() {
        let text = "58849.0 2020-01-01 00:00:00 0 0 0 1.0\n\
                    59214.25 2020-12-31 06:00:00 0 0 0 4.0\n\
                    59579.5 2021-12-31 12:00:00 0 0 0 7.0\n";
        let series = GnssSeries::parse(text, Path::new("x")).unwrap();
        let trend = gnss_trend(&series).unwrap();
        assert!((trend.slope - 3.0).abs() < 1e-9);
        assert!((trend.intercept - 1.0).abs() < 1e-9);

        let single = GnssSeries::parse("58849.0 2020-01-01 00:00:00 0 0 0 1.0\n", Path::new("x"))
            .unwrap();
        assert!(matches!(
            gnss_trend(&single),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }
}
