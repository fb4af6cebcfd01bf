use anyhow::Context;
use insarcore::dataset::GnssSeries;
use insarcore::processing::Trend;
use insarcore::telemetry::StageCounts;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Outcome of the combined time-series step for one station.
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub station: String,
    /// `processed`, `skipped` or `failed`.
    pub status: String,
    pub matched_points_before: usize,
    pub matched_points_after: usize,
    pub insar_before_trend: Option<Trend>,
    pub insar_after_trend: Option<Trend>,
    pub gnss_trend: Option<Trend>,
    pub gnss_span: Option<GnssSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Time coverage of a station's GNSS file, as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GnssSpan {
    pub samples: usize,
    pub first_mjd: f64,
    pub last_mjd: f64,
    pub first: String,
    pub last: String,
}

impl GnssSpan {
    pub fn of(series: &GnssSeries) -> Option<Self> {
        let samples = series.samples();
        let (first, last) = (samples.first()?, samples.last()?);
        Some(Self {
            samples: samples.len(),
            first_mjd: first.mjd,
            last_mjd: last.mjd,
            first: first.raw_time.clone(),
            last: last.raw_time.clone(),
        })
    }
}

/// Points drawn on one velocity map after outlier fencing.
#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub map: String,
    pub before_points: usize,
    pub after_points: usize,
}

impl StationReport {
    pub fn skipped(station: &str, note: impl Into<String>) -> Self {
        Self::with_status(station, "skipped", note.into())
    }

    pub fn failed(station: &str, note: impl Into<String>) -> Self {
        Self::with_status(station, "failed", note.into())
    }

    fn with_status(station: &str, status: &str, note: String) -> Self {
        Self {
            station: station.to_string(),
            status: status.to_string(),
            matched_points_before: 0,
            matched_points_after: 0,
            insar_before_trend: None,
            insar_after_trend: None,
            gnss_trend: None,
            gnss_span: None,
            note: Some(note),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    #[serde(flatten)]
    pub counts: StageCounts,
}

/// Machine-readable summary written next to the plots.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub runtime_seconds: f64,
    pub complete: bool,
    pub stages: Vec<StageReport>,
    pub stations: Vec<StationReport>,
    pub maps: Vec<MapReport>,
}

impl RunReport {
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing run report")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

pub fn format_runtime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 60.0 {
        format!("Total runtime: {:.2} seconds", seconds)
    } else {
        format!("Total runtime: {:.2} minutes", seconds / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn runtime_switches_units_at_one_minute() {
        assert_eq!(
            format_runtime(Duration::from_millis(12_340)),
            "Total runtime: 12.34 seconds"
        );
        assert_eq!(
            format_runtime(Duration::from_secs(90)),
            "Total runtime: 1.50 minutes"
        );
    }

    #[test]
    fn report_serializes_stage_counts_flat() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run_summary.json");
        let report = RunReport {
            generated_at: "2024-01-01T00:00:00".into(),
            runtime_seconds: 1.0,
            complete: false,
            stages: vec![StageReport {
                stage: "combined_time_series".into(),
                counts: StageCounts {
                    processed: 1,
                    skipped: 1,
                    failed: 0,
                },
            }],
            stations: vec![StationReport::skipped("MAD2", "no GNSS file")],
            maps: vec![MapReport {
                map: "MAD1_velocity_map.png".into(),
                before_points: 2,
                after_points: 1,
            }],
        };
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["stages"][0]["skipped"], 1);
        assert_eq!(value["stations"][0]["status"], "skipped");
        assert!(value["stations"][0]["gnss_trend"].is_null());
        assert_eq!(value["maps"][0]["before_points"], 2);
    }

    #[test]
    fn gnss_span_keeps_file_times() {
        let text = "58849.0 2020-01-01 00:00:00 0 0 0 1.0\n\
                    58880.5 2020-02-01 12:00:00 0 0 0 1.5\n";
        let series = GnssSeries::parse(text, Path::new("MAD1_NEU_TIME_LOS.txt")).unwrap();
        let span = GnssSpan::of(&series).unwrap();
        assert_eq!(span.samples, 2);
        assert_eq!((span.first_mjd, span.last_mjd), (58849.0, 58880.5));
        assert_eq!(span.first, "2020-01-01 00:00:00");
        assert_eq!(span.last, "2020-02-01 12:00:00");
    }
}
