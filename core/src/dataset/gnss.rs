use crate::prelude::{AnalysisError, AnalysisResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;
const GNSS_FILE_INFIX: &str = "_NEU_TIME";
const GNSS_FILE_SUFFIX: &str = "_LOS.txt";

/// One daily GNSS solution projected onto the radar line of sight.
#[derive(Debug, Clone, PartialEq)]
pub struct GnssSample {
    pub mjd: f64,
    /// Calendar instant derived from the MJD.
    pub timestamp: NaiveDateTime,
    /// Date and time columns exactly as written in the file.
    pub raw_time: String,
    pub north: f64,
    pub east: f64,
    pub up: f64,
    pub los: f64,
}

/// Time-ordered GNSS samples of one station. Never empty.
#[derive(Debug, Clone)]
pub struct GnssSeries {
    samples: Vec<GnssSample>,
}

impl GnssSeries {
    pub fn new(samples: Vec<GnssSample>) -> AnalysisResult<Self> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyDataset(
                "GNSS series contains no valid samples".into(),
            ));
        }
        Ok(Self { samples })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parses `MJD date time North East Up LOS` rows, skipping headers,
    /// separators and malformed lines.
    pub fn parse(contents: &str, source: &Path) -> AnalysisResult<Self> {
        let mut samples = Vec::new();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty()
                || line.starts_with("MJD")
                || line.starts_with("---")
                || line.contains("in mm")
            {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 7 {
                warn!(
                    "Skipping short line in GNSS file {}: {}",
                    source.display(),
                    line
                );
                continue;
            }
            match parse_sample(&parts) {
                Some(sample) => samples.push(sample),
                None => warn!(
                    "Skipping invalid line in GNSS file {}: {}",
                    source.display(),
                    line
                ),
            }
        }
        if samples.is_empty() {
            return Err(AnalysisError::EmptyDataset(format!(
                "GNSS file {} contains no valid MJD data",
                source.display()
            )));
        }
        Self::new(samples)
    }

    pub fn samples(&self) -> &[GnssSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Years elapsed since the first sample, one value per sample.
    pub fn decimal_years(&self) -> Vec<f64> {
        let start = self.samples[0].timestamp;
        self.samples
            .iter()
            .map(|s| (s.timestamp - start).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_YEAR)
            .collect()
    }

    pub fn los(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.los).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }
}

/// Converts a modified Julian date into a calendar instant (millisecond precision).
pub fn mjd_to_datetime(mjd: f64) -> Option<NaiveDateTime> {
    if !mjd.is_finite() {
        return None;
    }
    let origin = NaiveDate::from_ymd_opt(1858, 11, 17)?.and_hms_opt(0, 0, 0)?;
    let millis = (mjd * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    origin.checked_add_signed(Duration::milliseconds(millis as i64))
}

/// Finds `{station}_NEU_TIME*_LOS.txt` in `directory`; the first match in
/// lexicographic order wins.
pub fn find_station_file(directory: &Path, station: &str) -> AnalysisResult<PathBuf> {
    let entries = fs::read_dir(directory).map_err(|source| AnalysisError::Io {
        path: directory.to_path_buf(),
        source,
    })?;
    let prefix = format!("{}{}", station, GNSS_FILE_INFIX);
    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| {
                    n.len() >= prefix.len() + GNSS_FILE_SUFFIX.len()
                        && n.starts_with(&prefix)
                        && n.ends_with(GNSS_FILE_SUFFIX)
                })
                .unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches.into_iter().next().ok_or_else(|| {
        AnalysisError::MissingInput(format!(
            "no GNSS file matching {}*{} in {}",
            prefix,
            GNSS_FILE_SUFFIX,
            directory.display()
        ))
    })
}

fn parse_sample(parts: &[&str]) -> Option<GnssSample> {
    let number = |idx: usize| parts[idx].parse::<f64>().ok();
    let mjd = number(0)?;
    let timestamp = mjd_to_datetime(mjd)?;
    Some(GnssSample {
        mjd,
        timestamp,
        raw_time: format!("{} {}", parts[1], parts[2]),
        north: number(3)?,
        east: number(4)?,
        up: number(5)?,
        los: number(6)?,
    })
}
