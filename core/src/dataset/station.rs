use crate::prelude::{AnalysisError, AnalysisResult};
use log::warn;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A GNSS station from the station list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reads a whitespace-delimited station list with `Station`, `latitude` and
/// `longitude` columns.
pub fn load_stations<P: AsRef<Path>>(path: P) -> AnalysisResult<Vec<Station>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnalysisError::MissingInput(format!(
            "station list {} not found",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_stations(&contents, path)
}

pub fn parse_stations(contents: &str, source: &Path) -> AnalysisResult<Vec<Station>> {
    let mut lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| AnalysisError::EmptyDataset(format!("{} is empty", source.display())))?;
    let columns: Vec<&str> = header.split_whitespace().collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
                path: source.to_path_buf(),
            })
    };
    let name_col = column("Station")?;
    let lat_col = column("latitude")?;
    let lon_col = column("longitude")?;

    let mut seen = HashSet::new();
    let mut stations = Vec::new();
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let parsed = (
            fields.get(name_col),
            fields.get(lat_col).and_then(|f| f.parse::<f64>().ok()),
            fields.get(lon_col).and_then(|f| f.parse::<f64>().ok()),
        );
        let (name, latitude, longitude) = match parsed {
            (Some(name), Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                (name.to_string(), lat, lon)
            }
            _ => {
                warn!(
                    "Skipping malformed station line {} in {}: {}",
                    line_no + 1,
                    source.display(),
                    line.trim()
                );
                continue;
            }
        };
        if !is_file_safe(&name) {
            warn!(
                "Skipping station {:?} in {}: names may only use letters, digits, '-', '_' and inner '.'",
                name,
                source.display()
            );
            continue;
        }
        if !seen.insert(name.clone()) {
            warn!("Duplicate station {} in {} ignored", name, source.display());
            continue;
        }
        stations.push(Station {
            name,
            latitude,
            longitude,
        });
    }

    if stations.is_empty() {
        return Err(AnalysisError::EmptyDataset(format!(
            "{} lists no valid stations",
            source.display()
        )));
    }
    Ok(stations)
}

/// Station names become plot file names and must stay one plain path component.
fn is_file_safe(name: &str) -> bool {
    !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stations_reads_columns_in_any_order() {
        let text = "latitude  Station longitude height\n\
                    40.0 MAD1 -3.0 650\n\
                    \n\
                    41.5   BCN2  2.1  12\n";
        let stations = parse_stations(text, Path::new("stations_list")).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "MAD1");
        assert_eq!(stations[0].latitude, 40.0);
        assert_eq!(stations[1].longitude, 2.1);
    }

    #[test]
    fn parse_stations_skips_bad_and_duplicate_lines() {
        let text = "Station latitude longitude\n\
                    MAD1 40.0 -3.0\n\
                    BAD1 north -3.0\n\
                    MAD1 10.0 10.0\n";
        let stations = parse_stations(text, Path::new("stations_list")).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].latitude, 40.0);
    }

    #[test]
    fn parse_stations_rejects_path_like_names() {
        let text = "Station latitude longitude\n\
                    ../evil 40.0 -3.0\n\
                    a/b 40.0 -3.0\n\
                    .hidden 40.0 -3.0\n\
                    C:\\x 40.0 -3.0\n\
                    VAL-2_b.1 39.5 -0.4\n";
        let stations = parse_stations(text, Path::new("stations_list")).unwrap();
        let names: Vec<&str> = stations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["VAL-2_b.1"]);
    }

    #[test]
    fn parse_stations_requires_header_columns() {
        let text = "Name latitude longitude\nMAD1 40.0 -3.0\n";
        assert!(matches!(
            parse_stations(text, Path::new("stations_list")),
            Err(AnalysisError::MissingColumn { .. })
        ));
        assert!(matches!(
            parse_stations("\n\n", Path::new("stations_list")),
            Err(AnalysisError::EmptyDataset(_))
        ));
    }
}
