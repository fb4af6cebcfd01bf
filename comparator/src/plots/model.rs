use crate::plots::palette::{ColorScale, Palette};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use insarcore::dataset::{GnssSeries, PlaneCorrection, Station};
use insarcore::math::StatsHelper;
use insarcore::processing::{SeriesFit, Trend, VelocityField};

/// Days since 0001-01-01 (day 1), the x unit of time-series plots.
pub fn date_day(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

pub fn datetime_day(instant: NaiveDateTime) -> f64 {
    date_day(instant.date()) + f64::from(instant.time().num_seconds_from_midnight()) / 86_400.0
}

pub fn format_day(day: f64) -> String {
    if !day.is_finite() {
        return String::new();
    }
    NaiveDate::from_num_days_from_ce_opt(day.floor() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// A scatter of samples plus an optional fitted line, in plot coordinates.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub label: String,
    pub samples: Vec<(f64, f64)>,
    pub trend_line: Vec<(f64, f64)>,
    pub slope: Option<f64>,
}

impl TimeSeries {
    /// InSAR series; `None` when no epoch carries data.
    pub fn from_fit(label: &str, fit: &SeriesFit) -> Option<Self> {
        if !fit.has_data() {
            return None;
        }
        let xs: Vec<f64> = fit.series.epochs.iter().map(|e| date_day(e.date)).collect();
        let samples = xs
            .iter()
            .zip(&fit.series.values)
            .filter(|(_, v)| v.is_finite())
            .map(|(&x, &v)| (x, v))
            .collect();
        let trend_line = fit
            .trend
            .map(|trend| {
                xs.iter()
                    .enumerate()
                    .map(|(idx, &x)| (x, trend.evaluate(idx as f64)))
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            label: label.to_string(),
            samples,
            trend_line,
            slope: fit.trend.map(|t| t.slope),
        })
    }

    /// GNSS LOS series; the trend is evaluated at each sample's decimal year.
    pub fn from_gnss(label: &str, series: &GnssSeries, trend: Option<Trend>) -> Self {
        let xs: Vec<f64> = series.timestamps().into_iter().map(datetime_day).collect();
        let samples = xs.iter().copied().zip(series.los()).collect();
        let trend_line = trend
            .map(|trend| {
                xs.iter()
                    .zip(series.decimal_years())
                    .map(|(&x, year)| (x, trend.evaluate(year)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            label: label.to_string(),
            samples,
            trend_line,
            slope: trend.map(|t| t.slope),
        }
    }

    fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.samples.iter().chain(self.trend_line.iter())
    }
}

/// Two stacked panels: InSAR before alignment, then InSAR after alignment
/// together with GNSS.
#[derive(Debug, Clone)]
pub struct CombinedPlot {
    pub station: String,
    pub before: Option<TimeSeries>,
    pub after: Option<TimeSeries>,
    pub gnss: Option<TimeSeries>,
}

impl CombinedPlot {
    pub fn series(&self) -> impl Iterator<Item = &TimeSeries> {
        [&self.before, &self.after, &self.gnss]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.series().next().is_none()
    }

    /// Shared time axis covering every series.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        extent(self.series().flat_map(|s| s.points().map(|p| p.0)))
    }

    pub fn date_range(&self) -> Option<(String, String)> {
        self.x_range()
            .map(|(start, end)| (format_day(start), format_day(end)))
    }
}

/// Min and max of the finite values, `None` if there are none.
pub fn extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Widens a range by `fraction` of its span on both sides; zero spans get a
/// unit margin.
pub fn pad_range((lo, hi): (f64, f64), fraction: f64) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - span * fraction, hi + span * fraction)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationMarker {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl From<&Station> for StationMarker {
    fn from(station: &Station) -> Self {
        Self {
            name: station.name.clone(),
            longitude: station.longitude,
            latitude: station.latitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScatterPanel {
    pub title: String,
    /// `(longitude, latitude, value)`
    pub points: Vec<(f64, f64, f64)>,
    pub scale: ColorScale,
    pub colorbar_label: String,
}

impl ScatterPanel {
    pub fn from_field(title: &str, field: &VelocityField, scale: ColorScale) -> Self {
        let points = field
            .longitude
            .iter()
            .zip(&field.latitude)
            .zip(&field.velocity)
            .map(|((&lon, &lat), &v)| (lon, lat, v))
            .collect();
        Self {
            title: title.to_string(),
            points,
            scale,
            colorbar_label: "Velocity (mm/year)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    Stacked,
    SideBySide,
}

#[derive(Debug, Clone)]
pub struct MapPlot {
    pub title: String,
    pub panels: Vec<ScatterPanel>,
    pub stations: Vec<StationMarker>,
    pub layout: PanelLayout,
    pub point_size: u32,
}

impl MapPlot {
    /// Before, after and correction-plane panels over the whole region,
    /// sharing one velocity colour range.
    pub fn regional(
        before: &VelocityField,
        after: &VelocityField,
        plane: &PlaneCorrection,
        stations: &[Station],
    ) -> Self {
        let (lo, hi) = shared_velocity_range(before, after);
        let velocity_scale = ColorScale::new(lo, hi, Palette::Diverging);

        let correction: Vec<f64> = before
            .longitude
            .iter()
            .zip(&before.latitude)
            .map(|(&lon, &lat)| plane.evaluate(lon, lat))
            .collect();
        let (plane_lo, plane_hi) = extent(correction.iter().copied()).unwrap_or((-1.0, 1.0));
        let plane_panel = ScatterPanel {
            title: "Velocity Correction Plane".to_string(),
            points: before
                .longitude
                .iter()
                .zip(&before.latitude)
                .zip(&correction)
                .map(|((&lon, &lat), &c)| (lon, lat, c))
                .collect(),
            scale: ColorScale::new(plane_lo, plane_hi, Palette::Sequential),
            colorbar_label: "Correction Value (mm/year)".to_string(),
        };

        Self {
            title: "Regional Velocity Map".to_string(),
            panels: vec![
                ScatterPanel::from_field("Before Alignment", before, velocity_scale),
                ScatterPanel::from_field("After Alignment", after, velocity_scale),
                plane_panel,
            ],
            stations: stations.iter().map(StationMarker::from).collect(),
            layout: PanelLayout::Stacked,
            point_size: 1,
        }
    }

    /// Before/after velocities around one station, each on its own scale.
    pub fn station(station: &Station, before: &VelocityField, after: &VelocityField) -> Self {
        let scale = |field: &VelocityField| {
            let (lo, hi) = field.range().unwrap_or((-1.0, 1.0));
            ColorScale::new(lo, hi, Palette::Sequential)
        };
        Self {
            title: format!("Velocity Map for Station {}", station.name),
            panels: vec![
                ScatterPanel::from_field("Before Alignment", before, scale(before)),
                ScatterPanel::from_field("After Alignment", after, scale(after)),
            ],
            stations: vec![StationMarker::from(station)],
            layout: PanelLayout::SideBySide,
            point_size: 4,
        }
    }

    /// Longitude and latitude ranges covering all points and stations.
    pub fn extent(&self) -> ((f64, f64), (f64, f64)) {
        let lons = self
            .panels
            .iter()
            .flat_map(|p| p.points.iter().map(|pt| pt.0))
            .chain(self.stations.iter().map(|s| s.longitude));
        let lats = self
            .panels
            .iter()
            .flat_map(|p| p.points.iter().map(|pt| pt.1))
            .chain(self.stations.iter().map(|s| s.latitude));
        let lon = extent(lons).map(|r| pad_range(r, 0.05)).unwrap_or((-1.0, 1.0));
        let lat = extent(lats).map(|r| pad_range(r, 0.05)).unwrap_or((-1.0, 1.0));
        (lon, lat)
    }
}

/// Mean of the two field means plus/minus three times the mean of their
/// sample standard deviations. Fields without a finite statistic are ignored.
pub fn shared_velocity_range(before: &VelocityField, after: &VelocityField) -> (f64, f64) {
    let finite = |values: [f64; 2]| -> Vec<f64> {
        values.into_iter().filter(|v| v.is_finite()).collect()
    };
    let mean = StatsHelper::mean(&finite([before.mean(), after.mean()]));
    let std = StatsHelper::mean(&finite([before.std(), after.std()]));
    let std = if std.is_finite() { std } else { 0.0 };
    (mean - 3.0 * std, mean + 3.0 * std)
}
