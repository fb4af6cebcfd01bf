use crate::prelude::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Precomputed linear velocity correction `a * lon + b * lat + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneCorrection {
    #[serde(rename = "Plane Coefficient a")]
    pub a: f64,
    #[serde(rename = "Plane Coefficient b")]
    pub b: f64,
    #[serde(rename = "Plane Coefficient c")]
    pub c: f64,
}

impl PlaneCorrection {
    /// Reads the first row of the parameters table.
    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AnalysisError::MissingInput(format!(
                "plane parameters {} not found",
                path.display()
            )));
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| AnalysisError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        match reader.deserialize::<PlaneCorrection>().next() {
            Some(row) => row.map_err(|source| AnalysisError::Csv {
                path: path.to_path_buf(),
                source,
            }),
            None => Err(AnalysisError::EmptyDataset(format!(
                "{} has no coefficient row",
                path.display()
            ))),
        }
    }

    pub fn evaluate(&self, longitude: f64, latitude: f64) -> f64 {
        self.a * longitude + self.b * latitude + self.c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_reads_first_row_and_ignores_extra_columns() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"Plane Coefficient a,Plane Coefficient b,Plane Coefficient c,RMSE\n\
              0.5,-0.25,2.0,0.1\n\
              9.0,9.0,9.0,9.0\n",
        )
        .unwrap();
        let plane = PlaneCorrection::load(temp.path()).unwrap();
        assert_eq!(plane.a, 0.5);
        assert_eq!(plane.evaluate(2.0, 4.0), 0.5 * 2.0 - 0.25 * 4.0 + 2.0);
    }

    #[test]
    fn load_without_rows_is_empty() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"Plane Coefficient a,Plane Coefficient b,Plane Coefficient c\n")
            .unwrap();
        assert!(matches!(
            PlaneCorrection::load(temp.path()),
            Err(AnalysisError::EmptyDataset(_))
        ));
        assert!(matches!(
            PlaneCorrection::load("/nonexistent/parameters.csv"),
            Err(AnalysisError::MissingInput(_))
        ));
    }
}
