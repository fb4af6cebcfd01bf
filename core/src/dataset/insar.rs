use crate::prelude::{AnalysisError, AnalysisResult};
use chrono::NaiveDate;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::path::{Path, PathBuf};

const LATITUDE_COLUMN: &str = "latitude";
const LONGITUDE_COLUMN: &str = "longitude";
const COHERENCE_COLUMN: &str = "temporal_coherence";

/// One acquisition date of an InSAR stack, e.g. `20200101`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch {
    pub id: String,
    pub date: NaiveDate,
}

impl Epoch {
    pub fn parse(id: &str) -> AnalysisResult<Self> {
        if id.len() != 8 || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AnalysisError::MalformedEpoch(id.to_string()));
        }
        let date = NaiveDate::parse_from_str(id, "%Y%m%d")
            .map_err(|_| AnalysisError::MalformedEpoch(id.to_string()))?;
        Ok(Self {
            id: id.to_string(),
            date,
        })
    }
}

/// Borrowed view of a single InSAR measurement point.
#[derive(Debug, Clone)]
pub struct MeasurementPoint<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub temporal_coherence: f64,
    /// Displacement in millimeters per epoch; NaN marks a missing value.
    pub displacement: ArrayView1<'a, f64>,
}

impl MeasurementPoint<'_> {
    pub fn value_at(&self, epoch_index: usize) -> Option<f64> {
        self.displacement
            .get(epoch_index)
            .copied()
            .filter(|v| !v.is_nan())
    }
}

/// Owned description of a point, used to assemble datasets in memory.
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub temporal_coherence: f64,
    pub displacement: Vec<f64>,
}

/// An InSAR stack: point coordinates plus a points x epochs displacement matrix.
#[derive(Debug, Clone)]
pub struct InsarDataset {
    latitude: Array1<f64>,
    longitude: Array1<f64>,
    coherence: Array1<f64>,
    epochs: Vec<Epoch>,
    displacement: Array2<f64>,
}

impl InsarDataset {
    pub fn new(
        latitude: Array1<f64>,
        longitude: Array1<f64>,
        coherence: Array1<f64>,
        epochs: Vec<Epoch>,
        displacement: Array2<f64>,
    ) -> AnalysisResult<Self> {
        let points = latitude.len();
        if longitude.len() != points || coherence.len() != points {
            return Err(AnalysisError::ShapeMismatch(format!(
                "{} latitudes, {} longitudes, {} coherence values",
                points,
                longitude.len(),
                coherence.len()
            )));
        }
        if displacement.dim() != (points, epochs.len()) {
            return Err(AnalysisError::ShapeMismatch(format!(
                "displacement matrix {:?} does not match {} points x {} epochs",
                displacement.dim(),
                points,
                epochs.len()
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            coherence,
            epochs,
            displacement,
        })
    }

    pub fn from_points(epochs: Vec<Epoch>, points: &[PointRecord]) -> AnalysisResult<Self> {
        let mut flat = Vec::with_capacity(points.len() * epochs.len());
        for (idx, point) in points.iter().enumerate() {
            if point.displacement.len() != epochs.len() {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "point {} has {} values for {} epochs",
                    idx,
                    point.displacement.len(),
                    epochs.len()
                )));
            }
            flat.extend_from_slice(&point.displacement);
        }
        let displacement = Array2::from_shape_vec((points.len(), epochs.len()), flat)
            .map_err(|e| AnalysisError::ShapeMismatch(e.to_string()))?;
        Self::new(
            points.iter().map(|p| p.latitude).collect(),
            points.iter().map(|p| p.longitude).collect(),
            points.iter().map(|p| p.temporal_coherence).collect(),
            epochs,
            displacement,
        )
    }

    /// Reads a CSV export with `latitude`, `longitude`, `temporal_coherence`
    /// and one `YYYYMMDD` column per epoch.
    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AnalysisError::MissingInput(format!(
                "InSAR dataset {} not found",
                path.display()
            )));
        }
        let csv_err = |source| AnalysisError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| AnalysisError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_path_buf(),
                })
        };
        let lat_col = column(LATITUDE_COLUMN)?;
        let lon_col = column(LONGITUDE_COLUMN)?;
        let coh_col = column(COHERENCE_COLUMN)?;

        let mut epoch_columns = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if !header.is_empty() && header.bytes().all(|b| b.is_ascii_digit()) {
                epoch_columns.push((idx, Epoch::parse(header)?));
            }
        }
        if epoch_columns.is_empty() {
            return Err(AnalysisError::EmptyDataset(format!(
                "{} has no epoch columns",
                path.display()
            )));
        }
        epoch_columns.sort_by(|a, b| a.1.cmp(&b.1));

        let mut latitude = Vec::new();
        let mut longitude = Vec::new();
        let mut coherence = Vec::new();
        let mut flat = Vec::new();
        let mut skipped = 0usize;

        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    warn!("Skipping unreadable row in {}: {}", path.display(), err);
                    skipped += 1;
                    continue;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let coordinates = (
                parse_required(record.get(lat_col)),
                parse_required(record.get(lon_col)),
                parse_required(record.get(coh_col)),
            );
            let (lat, lon, coh) = match coordinates {
                (Some(lat), Some(lon), Some(coh)) => (lat, lon, coh),
                _ => {
                    warn!(
                        "Skipping row at line {} in {}: invalid coordinates or coherence",
                        line,
                        path.display()
                    );
                    skipped += 1;
                    continue;
                }
            };
            let values: Option<Vec<f64>> = epoch_columns
                .iter()
                .map(|(idx, _)| parse_displacement(record.get(*idx)))
                .collect();
            let Some(values) = values else {
                warn!(
                    "Skipping row at line {} in {}: unparsable displacement value",
                    line,
                    path.display()
                );
                skipped += 1;
                continue;
            };
            latitude.push(lat);
            longitude.push(lon);
            coherence.push(coh);
            flat.extend(values);
        }

        if latitude.is_empty() {
            return Err(AnalysisError::EmptyDataset(format!(
                "{} contains no valid rows",
                path.display()
            )));
        }
        debug!(
            "Loaded {} points x {} epochs from {} ({} rows skipped)",
            latitude.len(),
            epoch_columns.len(),
            path.display(),
            skipped
        );

        let epochs: Vec<Epoch> = epoch_columns.into_iter().map(|(_, e)| e).collect();
        let displacement = Array2::from_shape_vec((latitude.len(), epochs.len()), flat)
            .map_err(|e| AnalysisError::ShapeMismatch(e.to_string()))?;
        Self::new(
            Array1::from(latitude),
            Array1::from(longitude),
            Array1::from(coherence),
            epochs,
            displacement,
        )
    }

    pub fn len(&self) -> usize {
        self.latitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn latitudes(&self) -> ArrayView1<'_, f64> {
        self.latitude.view()
    }

    pub fn longitudes(&self) -> ArrayView1<'_, f64> {
        self.longitude.view()
    }

    pub fn displacement(&self) -> &Array2<f64> {
        &self.displacement
    }

    pub fn point(&self, index: usize) -> Option<MeasurementPoint<'_>> {
        if index >= self.len() {
            return None;
        }
        Some(MeasurementPoint {
            latitude: self.latitude[index],
            longitude: self.longitude[index],
            temporal_coherence: self.coherence[index],
            displacement: self.displacement.row(index),
        })
    }

    /// Subset of the given rows, in the order of `indices`, sharing the epoch set.
    pub fn select(&self, indices: &[usize]) -> Self {
        if indices.is_empty() {
            return Self {
                latitude: Array1::zeros(0),
                longitude: Array1::zeros(0),
                coherence: Array1::zeros(0),
                epochs: self.epochs.clone(),
                displacement: Array2::zeros((0, self.epochs.len())),
            };
        }
        Self {
            latitude: self.latitude.select(Axis(0), indices),
            longitude: self.longitude.select(Axis(0), indices),
            coherence: self.coherence.select(Axis(0), indices),
            epochs: self.epochs.clone(),
            displacement: self.displacement.select(Axis(0), indices),
        }
    }

    /// Keeps points whose temporal coherence reaches `min_coherence`.
    pub fn filter_coherence(&self, min_coherence: f64) -> Self {
        let keep: Vec<usize> = self
            .coherence
            .iter()
            .enumerate()
            .filter(|(_, &coh)| coh >= min_coherence)
            .map(|(idx, _)| idx)
            .collect();
        debug!(
            "Coherence filter >= {:.2} kept {} of {} points",
            min_coherence,
            keep.len(),
            self.len()
        );
        self.select(&keep)
    }
}

/// Location of the plane-aligned counterpart of an InSAR export:
/// `stack.csv` becomes `stack_aligned.csv`.
pub fn aligned_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_aligned.{}", stem, ext.to_string_lossy()),
        None => format!("{}_aligned", stem),
    };
    path.with_file_name(name)
}

fn parse_required(field: Option<&str>) -> Option<f64> {
    field
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_displacement(field: Option<&str>) -> Option<f64> {
    match field {
        None => Some(f64::NAN),
        Some(f) if f.is_empty() || f.eq_ignore_ascii_case("nan") => Some(f64::NAN),
        Some(f) => f.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(contents.as_bytes()).unwrap();
        temp
    }

    #[test]
    fn epoch_parse_rejects_non_dates() {
        assert!(Epoch::parse("20200101").is_ok());
        assert!(matches!(
            Epoch::parse("20201301"),
            Err(AnalysisError::MalformedEpoch(_))
        ));
        assert!(Epoch::parse("2020").is_err());
    }

    #[test]
    fn load_orders_epochs_and_keeps_missing_cells() {
        let file = write_csv(
            "pid,latitude,longitude,temporal_coherence,20200301,20200101,20200201\n\
             a,40.0,-3.0,0.9,3.0,1.0,\n\
             b,40.1,-3.1,0.5,6.0,4.0,5.0\n",
        );
        let dataset = InsarDataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        let ids: Vec<&str> = dataset.epochs().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["20200101", "20200201", "20200301"]);

        let first = dataset.point(0).unwrap();
        assert_eq!(first.value_at(0), Some(1.0));
        assert_eq!(first.value_at(1), None);
        assert_eq!(first.value_at(2), Some(3.0));
    }

    #[test]
    fn load_skips_malformed_rows() {
        let file = write_csv(
            "latitude,longitude,temporal_coherence,20200101\n\
             40.0,-3.0,0.9,1.0\n\
             oops,-3.0,0.9,1.0\n\
             40.0,-3.0,0.9,abc\n",
        );
        let dataset = InsarDataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn load_reports_missing_columns_and_files() {
        let file = write_csv("latitude,longitude,20200101\n40.0,-3.0,1.0\n");
        assert!(matches!(
            InsarDataset::load(file.path()),
            Err(AnalysisError::MissingColumn { .. })
        ));
        assert!(matches!(
            InsarDataset::load("/nonexistent/insar.csv"),
            Err(AnalysisError::MissingInput(_))
        ));
    }

    #[test]
    fn coherence_filter_drops_low_quality_points() {
        let epochs = vec![Epoch::parse("20200101").unwrap()];
        let points = vec![
            PointRecord {
                latitude: 1.0,
                longitude: 1.0,
                temporal_coherence: 0.95,
                displacement: vec![1.0],
            },
            PointRecord {
                latitude: 2.0,
                longitude: 2.0,
                temporal_coherence: 0.3,
                displacement: vec![2.0],
            },
        ];
        let dataset = InsarDataset::from_points(epochs, &points).unwrap();
        let filtered = dataset.filter_coherence(0.7);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.point(0).unwrap().latitude, 1.0);
        assert_eq!(dataset.filter_coherence(0.99).len(), 0);
    }

    #[test]
    fn aligned_path_appends_suffix_to_stem() {
        assert_eq!(
            aligned_path(Path::new("/data/EGMS_088.csv")),
            PathBuf::from("/data/EGMS_088_aligned.csv")
        );
        assert_eq!(
            aligned_path(Path::new("insar")),
            PathBuf::from("insar_aligned")
        );
    }
}
