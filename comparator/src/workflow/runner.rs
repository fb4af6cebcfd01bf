use crate::plots::model::{CombinedPlot, MapPlot, TimeSeries};
use crate::plots::render::{render_combined, render_map};
use crate::workflow::config::WorkflowConfig;
use crate::workflow::report::{
    format_runtime, GnssSpan, MapReport, RunReport, StageReport, StationReport,
};
use anyhow::Context;
use insarcore::dataset::{
    find_station_file, load_stations, GnssSeries, InsarDataset, PlaneCorrection, Station,
};
use insarcore::processing::{
    gnss_trend, OutlierFilter, SeriesFit, SpatialMatcher, StationComparison, VelocityField,
};
use insarcore::telemetry::{LogManager, MetricsRecorder};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const COMBINED_STAGE: &str = "combined_time_series";
pub const REGIONAL_STAGE: &str = "regional_velocity_map";
pub const STATION_MAP_STAGE: &str = "station_velocity_maps";
pub const REPORT_FILE: &str = "run_summary.json";

/// Global inputs shared by every station. The time series use the
/// coherence-filtered datasets, the velocity maps every point.
struct Inputs {
    before: InsarDataset,
    after: InsarDataset,
    coherent_before: InsarDataset,
    coherent_after: InsarDataset,
    stations: Vec<Station>,
    plane: PlaneCorrection,
}

pub struct WorkflowResult {
    pub plots: Vec<PathBuf>,
    pub report: RunReport,
}

impl WorkflowResult {
    pub fn is_complete(&self) -> bool {
        self.report.complete
    }
}

pub struct Runner {
    config: WorkflowConfig,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let logger = match config.log_path() {
            Some(path) => LogManager::with_file(&path)
                .with_context(|| format!("opening workflow log {}", path.display()))?,
            None => LogManager::new(),
        };
        Ok(Self {
            config,
            logger,
            metrics: MetricsRecorder::new(),
        })
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let started = Instant::now();
        let analysis = self.config.to_analysis_config();
        analysis.validate().context("validating analysis parameters")?;
        let matcher = SpatialMatcher::from_config(&analysis);

        let inputs = self.load_inputs()?;
        let plots_dir = self.config.plots_path();
        fs::create_dir_all(&plots_dir)
            .with_context(|| format!("creating plots directory {}", plots_dir.display()))?;

        let mut plots = Vec::new();
        let mut stations = Vec::new();
        let mut maps = Vec::new();

        self.logger.record(&format!(
            "Generating combined time series for {} stations",
            inputs.stations.len()
        ));
        for station in &inputs.stations {
            let report =
                self.combined_time_series(&matcher, station, &inputs, &plots_dir, &mut plots);
            stations.push(report);
        }
        self.logger.close_section();

        if self.config.render_maps {
            maps.extend(self.regional_map(&inputs, &plots_dir, &mut plots));
            self.logger.close_section();
            for station in &inputs.stations {
                let report = self.station_map(&matcher, station, &inputs, &plots_dir, &mut plots);
                maps.extend(report);
            }
            self.logger.close_section();
        }

        let elapsed = started.elapsed();
        let stages: Vec<StageReport> = self
            .metrics
            .stages()
            .into_iter()
            .map(|(stage, counts)| StageReport { stage, counts })
            .collect();
        for stage in &stages {
            let attempted = stage.counts.processed + stage.counts.skipped + stage.counts.failed;
            self.logger.record(&format!(
                "{}: {}/{} succeeded ({} skipped, {} failed)",
                stage.stage,
                stage.counts.processed,
                attempted,
                stage.counts.skipped,
                stage.counts.failed
            ));
        }
        self.logger.record(&format_runtime(elapsed));

        let report = RunReport {
            generated_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            runtime_seconds: elapsed.as_secs_f64(),
            complete: stages.iter().all(|s| s.counts.is_complete()),
            stages,
            stations,
            maps,
        };
        report.write(&plots_dir.join(REPORT_FILE))?;

        Ok(WorkflowResult { plots, report })
    }

    fn load_inputs(&self) -> anyhow::Result<Inputs> {
        let min_coherence = self.config.min_temporal_coherence;
        let insar_path = self.config.insar_path();
        let aligned_path = self.config.aligned_insar_path();

        let before = InsarDataset::load(&insar_path)
            .with_context(|| format!("loading InSAR dataset {}", insar_path.display()))?;
        let after = InsarDataset::load(&aligned_path)
            .with_context(|| format!("loading aligned InSAR dataset {}", aligned_path.display()))?;
        let coherent_before = before.filter_coherence(min_coherence);
        let coherent_after = after.filter_coherence(min_coherence);
        self.logger.record(&format!(
            "Loaded {} / {} InSAR points (before / after), {} / {} with coherence >= {:.2}",
            before.len(),
            after.len(),
            coherent_before.len(),
            coherent_after.len(),
            min_coherence
        ));

        let stations_path = self.config.stations_path();
        let stations = load_stations(&stations_path)
            .with_context(|| format!("loading station list {}", stations_path.display()))?;
        self.logger
            .record(&format!("Loaded {} GNSS stations", stations.len()));

        let parameters_path = self.config.parameters_path();
        let plane = PlaneCorrection::load(&parameters_path)
            .with_context(|| format!("loading plane parameters {}", parameters_path.display()))?;

        Ok(Inputs {
            before,
            after,
            coherent_before,
            coherent_after,
            stations,
            plane,
        })
    }

    fn combined_time_series(
        &self,
        matcher: &SpatialMatcher,
        station: &Station,
        inputs: &Inputs,
        plots_dir: &Path,
        plots: &mut Vec<PathBuf>,
    ) -> StationReport {
        let name = station.name.as_str();
        let gnss_path = match find_station_file(&self.config.data_directory, name) {
            Ok(path) => path,
            Err(err) => {
                self.logger
                    .warn(&format!("Skipping station {}: {}", name, err));
                self.metrics.record_skipped(COMBINED_STAGE);
                return StationReport::skipped(name, err.to_string());
            }
        };
        let gnss = match GnssSeries::load(&gnss_path) {
            Ok(series) => Some(series),
            Err(err) => {
                self.logger
                    .warn(&format!("Station {}: GNSS data unusable: {}", name, err));
                None
            }
        };

        let comparison = StationComparison::compute(
            matcher,
            station,
            &inputs.coherent_before,
            &inputs.coherent_after,
        );
        let gnss_fit = gnss.as_ref().and_then(|series| match gnss_trend(series) {
            Ok(trend) => Some(trend),
            Err(err) => {
                self.logger
                    .warn(&format!("Station {}: no GNSS trend: {}", name, err));
                None
            }
        });

        let plot = CombinedPlot {
            station: name.to_string(),
            before: self.insar_series(name, "InSAR Before Alignment", &comparison.before),
            after: self.insar_series(name, "InSAR After Alignment", &comparison.after),
            gnss: gnss
                .as_ref()
                .map(|series| TimeSeries::from_gnss("GNSS LOS", series, gnss_fit)),
        };
        if plot.is_empty() {
            self.logger.warn(&format!(
                "Skipping station {}: no InSAR points within {:.0} m and no GNSS samples",
                name,
                matcher.radius_m()
            ));
            self.metrics.record_skipped(COMBINED_STAGE);
            return StationReport::skipped(name, "no InSAR or GNSS data");
        }

        let path = plots_dir.join(format!("{}_combined_plot.png", name));
        match render_combined(&path, &plot) {
            Ok(()) => {
                self.logger.record(&format!(
                    "Station {}: combined plot saved to {}",
                    name,
                    path.display()
                ));
                self.metrics.record_processed(COMBINED_STAGE);
                plots.push(path);
                StationReport {
                    station: name.to_string(),
                    status: "processed".to_string(),
                    matched_points_before: comparison.before.matched_points,
                    matched_points_after: comparison.after.matched_points,
                    insar_before_trend: comparison.before.trend,
                    insar_after_trend: comparison.after.trend,
                    gnss_trend: gnss_fit,
                    gnss_span: gnss.as_ref().and_then(GnssSpan::of),
                    note: None,
                }
            }
            Err(err) => {
                self.logger
                    .warn(&format!("Station {}: {:#}", name, err));
                self.metrics.record_failed(COMBINED_STAGE);
                StationReport::failed(name, format!("{:#}", err))
            }
        }
    }

    fn insar_series(&self, station: &str, label: &str, fit: &SeriesFit) -> Option<TimeSeries> {
        let series = TimeSeries::from_fit(label, fit);
        match (&series, fit.trend) {
            (None, _) => self
                .logger
                .warn(&format!("Station {}: {} has no data", station, label)),
            (Some(_), None) => self.logger.warn(&format!(
                "Station {}: {} has fewer than 2 valid epochs, no trend drawn",
                station, label
            )),
            (Some(_), Some(trend)) => self.logger.record(&format!(
                "Station {}: {} slope {:.5} over {} matched points",
                station, label, trend.slope, fit.matched_points
            )),
        }
        series
    }

    fn regional_map(
        &self,
        inputs: &Inputs,
        plots_dir: &Path,
        plots: &mut Vec<PathBuf>,
    ) -> Option<MapReport> {
        let filter = OutlierFilter::regional_map();
        let before = VelocityField::from_dataset(&inputs.before, &filter);
        let after = VelocityField::from_dataset(&inputs.after, &filter);
        self.logger.record(&format!(
            "Regional velocities kept {} / {} and {} / {} points (IQR factor {})",
            before.len(),
            inputs.before.len(),
            after.len(),
            inputs.after.len(),
            filter.factor()
        ));
        if before.is_empty() && after.is_empty() {
            self.logger
                .warn("Skipping regional velocity map: no velocities after filtering");
            self.metrics.record_skipped(REGIONAL_STAGE);
            return None;
        }

        let plot = MapPlot::regional(&before, &after, &inputs.plane, &inputs.stations);
        let path = plots_dir.join("combined_velocity_map_with_correction.png");
        let report = map_report(&path, &before, &after);
        self.finish_map(REGIONAL_STAGE, "regional velocity map", path, &plot, plots)
            .then_some(report)
    }

    fn station_map(
        &self,
        matcher: &SpatialMatcher,
        station: &Station,
        inputs: &Inputs,
        plots_dir: &Path,
        plots: &mut Vec<PathBuf>,
    ) -> Option<MapReport> {
        let filter = OutlierFilter::station_map();
        let before = VelocityField::around_station(matcher, station, &inputs.before, &filter);
        let after = VelocityField::around_station(matcher, station, &inputs.after, &filter);
        if before.is_empty() && after.is_empty() {
            self.logger.warn(&format!(
                "Skipping velocity map for station {}: no InSAR points in range",
                station.name
            ));
            self.metrics.record_skipped(STATION_MAP_STAGE);
            return None;
        }

        let plot = MapPlot::station(station, &before, &after);
        let path = plots_dir.join(format!("{}_velocity_map.png", station.name));
        let what = format!("velocity map for station {}", station.name);
        let report = map_report(&path, &before, &after);
        self.finish_map(STATION_MAP_STAGE, &what, path, &plot, plots)
            .then_some(report)
    }

    fn finish_map(
        &self,
        stage: &str,
        what: &str,
        path: PathBuf,
        plot: &MapPlot,
        plots: &mut Vec<PathBuf>,
    ) -> bool {
        match render_map(&path, plot) {
            Ok(()) => {
                self.logger
                    .record(&format!("Saved {} to {}", what, path.display()));
                self.metrics.record_processed(stage);
                plots.push(path);
                true
            }
            Err(err) => {
                self.logger
                    .warn(&format!("Failed to render {}: {:#}", what, err));
                self.metrics.record_failed(stage);
                false
            }
        }
    }
}

fn map_report(path: &Path, before: &VelocityField, after: &VelocityField) -> MapReport {
    MapReport {
        map: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        before_points: before.len(),
        after_points: after.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plots::backend::init_fonts;
    use tempfile::{tempdir, TempDir};

    const INSAR: &str = "\
latitude,longitude,temporal_coherence,20200101,20200201,20200301
40.0,-3.0,0.9,1.0,2.0,3.0
40.001,-3.001,0.95,2.0,3.0,4.0
41.0,-4.0,0.8,0.5,1.5,2.5
41.0005,-4.0005,0.3,9.0,9.0,9.0
";

    const ALIGNED: &str = "\
latitude,longitude,temporal_coherence,20200101,20200201,20200301
40.0,-3.0,0.9,0.5,1.0,1.5
40.001,-3.001,0.95,1.0,1.5,2.0
41.0,-4.0,0.8,0.0,0.5,1.0
41.0005,-4.0005,0.3,9.0,9.0,9.0
";

    const GNSS: &str = "\
MJD date time North East Up LOS
--- in mm ---
58849.0 2020-01-01 00:00:00 0.1 0.2 0.3 1.0
58880.0 2020-02-01 00:00:00 0.1 0.2 0.3 1.5
58909.0 2020-03-01 00:00:00 0.1 0.2 0.3 2.0
";

    const EMPTY_GNSS: &str = "MJD date time North East Up LOS\n--- in mm ---\n";

    fn write_inputs(with_second_gnss: bool) -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("insar.csv"), INSAR).unwrap();
        fs::write(root.join("insar_aligned.csv"), ALIGNED).unwrap();
        fs::write(
            root.join("stations_list"),
            "Station latitude longitude\nMAD1 40.0 -3.0\nMAD2 41.0 -4.0\n",
        )
        .unwrap();
        fs::write(
            root.join("parameters.csv"),
            "Plane Coefficient a,Plane Coefficient b,Plane Coefficient c\n0.1,0.2,0.3\n",
        )
        .unwrap();
        fs::write(root.join("MAD1_NEU_TIME_2020_LOS.txt"), GNSS).unwrap();
        if with_second_gnss {
            fs::write(root.join("MAD2_NEU_TIME_2020_LOS.txt"), GNSS).unwrap();
        }
        dir
    }

    fn config_for(dir: &Path) -> WorkflowConfig {
        WorkflowConfig {
            data_directory: dir.to_path_buf(),
            ..WorkflowConfig::default()
        }
    }

    #[test]
    fn runner_produces_every_product() {
        init_fonts(None);
        let dir = write_inputs(true);
        let runner = Runner::new(config_for(dir.path())).unwrap();
        let result = runner.execute().unwrap();

        let plots = dir.path().join("plots");
        for name in [
            "MAD1_combined_plot.png",
            "MAD2_combined_plot.png",
            "combined_velocity_map_with_correction.png",
            "MAD1_velocity_map.png",
            "MAD2_velocity_map.png",
            REPORT_FILE,
        ] {
            assert!(plots.join(name).is_file(), "missing {}", name);
        }
        assert!(result.is_complete());
        assert_eq!(result.plots.len(), 5);
        assert!(dir.path().join("workflow.log").is_file());
    }

    #[test]
    fn station_without_gnss_file_is_skipped() {
        init_fonts(None);
        let dir = write_inputs(false);
        let mut config = config_for(dir.path());
        config.render_maps = false;
        let runner = Runner::new(config).unwrap();
        let result = runner.execute().unwrap();

        let plots = dir.path().join("plots");
        assert!(plots.join("MAD1_combined_plot.png").is_file());
        assert!(!plots.join("MAD2_combined_plot.png").exists());
        assert!(!plots.join("MAD1_velocity_map.png").exists());
        assert!(!result.is_complete());

        let counts = runner.metrics.snapshot(COMBINED_STAGE);
        assert_eq!((counts.processed, counts.skipped), (1, 1));
        let skipped = &result.report.stations[1];
        assert_eq!(skipped.station, "MAD2");
        assert_eq!(skipped.status, "skipped");
    }

    #[test]
    fn trends_follow_matched_series() {
        init_fonts(None);
        let dir = write_inputs(true);
        let mut config = config_for(dir.path());
        config.render_maps = false;
        config.insar_radius_meters = 50;
        let result = Runner::new(config).unwrap().execute().unwrap();

        let mad1 = &result.report.stations[0];
        assert_eq!(mad1.matched_points_before, 1);
        let before = mad1.insar_before_trend.unwrap();
        assert!((before.slope - 1.0).abs() < 1e-9);
        assert!((before.intercept - 1.0).abs() < 1e-9);
        let after = mad1.insar_after_trend.unwrap();
        assert!((after.slope - 0.5).abs() < 1e-9);
        assert!(mad1.gnss_trend.unwrap().slope > 0.0);
    }

    #[test]
    fn velocity_maps_keep_low_coherence_points() {
        init_fonts(None);
        let dir = write_inputs(true);
        let result = Runner::new(config_for(dir.path())).unwrap().execute().unwrap();

        let map = |name: &str| {
            result
                .report
                .maps
                .iter()
                .find(|m| m.map == name)
                .cloned()
                .unwrap()
        };
        let regional = map("combined_velocity_map_with_correction.png");
        assert_eq!(regional.before_points, 4);
        let mad2 = map("MAD2_velocity_map.png");
        assert_eq!((mad2.before_points, mad2.after_points), (2, 2));

        // the coherence 0.3 point stays out of the time series
        assert_eq!(result.report.stations[1].matched_points_before, 1);
    }

    #[test]
    fn station_without_any_data_is_skipped() {
        init_fonts(None);
        let dir = write_inputs(true);
        fs::write(
            dir.path().join("stations_list"),
            "Station latitude longitude\nMAD1 40.0 -3.0\nMAD2 41.0 -4.0\nFAR1 10.0 10.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("FAR1_NEU_TIME_2020_LOS.txt"), EMPTY_GNSS).unwrap();
        let runner = Runner::new(config_for(dir.path())).unwrap();
        let result = runner.execute().unwrap();

        let plots = dir.path().join("plots");
        assert!(!plots.join("FAR1_combined_plot.png").exists());
        assert!(!plots.join("FAR1_velocity_map.png").exists());
        assert!(plots.join("MAD2_velocity_map.png").is_file());
        assert!(!result.is_complete());

        let combined = runner.metrics.snapshot(COMBINED_STAGE);
        assert_eq!((combined.processed, combined.skipped), (2, 1));
        let station_maps = runner.metrics.snapshot(STATION_MAP_STAGE);
        assert_eq!((station_maps.processed, station_maps.skipped), (2, 1));
        assert_eq!(runner.metrics.snapshot(REGIONAL_STAGE).processed, 1);
        assert_eq!(result.report.stations[2].status, "skipped");
    }

    #[test]
    fn gnss_file_without_samples_only_drops_gnss_series() {
        init_fonts(None);
        let dir = write_inputs(true);
        fs::write(dir.path().join("MAD1_NEU_TIME_2020_LOS.txt"), EMPTY_GNSS).unwrap();
        let mut config = config_for(dir.path());
        config.render_maps = false;
        let runner = Runner::new(config).unwrap();
        let result = runner.execute().unwrap();

        assert!(dir.path().join("plots/MAD1_combined_plot.png").is_file());
        assert!(result.is_complete());
        let counts = runner.metrics.snapshot(COMBINED_STAGE);
        assert_eq!((counts.processed, counts.skipped), (2, 0));

        let mad1 = &result.report.stations[0];
        assert_eq!(mad1.status, "processed");
        assert!(mad1.insar_before_trend.is_some());
        assert!(mad1.gnss_trend.is_none());
        assert!(mad1.gnss_span.is_none());
        let mad2 = &result.report.stations[1];
        assert_eq!(mad2.gnss_span.as_ref().unwrap().samples, 3);
    }

    #[test]
    fn missing_global_input_is_fatal() {
        let dir = write_inputs(true);
        fs::remove_file(dir.path().join("parameters.csv")).unwrap();
        let runner = Runner::new(config_for(dir.path())).unwrap();
        let err = runner.execute().err().unwrap();
        assert!(format!("{:#}", err).contains("plane parameters"));
    }
}
