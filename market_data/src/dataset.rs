use log::{debug, warn};
use ndarray::Array2;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{ArtifactError, ArtifactKind};

const KIND: ArtifactKind = ArtifactKind::Dataset;

/// Load a scaled observation matrix (rows x features).
///
/// `.csv` files are headerless, one observation per line. `.bin` files hold a
/// bincode encoded `Vec<Vec<f64>>`.
pub fn load_dataset(path: &Path) -> Result<Array2<f64>, ArtifactError> {
    let file = open_artifact(KIND, path)?;

    let rows = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => read_csv_rows(file, path)?,
        Some("bin") => bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| ArtifactError::corrupt(KIND, path, e))?,
        other => {
            return Err(ArtifactError::corrupt(
                KIND,
                path,
                format!("unsupported dataset format {:?}", other.unwrap_or("")),
            ));
        }
    };

    let data = rows_to_matrix(rows, path)?;
    debug!(
        "Loaded dataset {} with {} rows x {} features",
        path.display(),
        data.nrows(),
        data.ncols()
    );
    Ok(data)
}

/// Opens an artifact file, separating "not there" from other I/O failures.
pub fn open_artifact(kind: ArtifactKind, path: &Path) -> Result<File, ArtifactError> {
    File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                kind,
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn read_csv_rows(file: File, path: &Path) -> Result<Vec<Vec<f64>>, ArtifactError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ArtifactError::corrupt(KIND, path, e))?;
        let row = record
            .iter()
            .map(|field| field.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| ArtifactError::corrupt(KIND, path, format!("row {}: {}", line + 1, e)))?;
        rows.push(row);
    }
    Ok(rows)
}

fn rows_to_matrix(rows: Vec<Vec<f64>>, path: &Path) -> Result<Array2<f64>, ArtifactError> {
    let Some(width) = rows.first().map(Vec::len) else {
        warn!("Dataset {} is empty", path.display());
        return Ok(Array2::zeros((0, 0)));
    };
    if width == 0 {
        return Err(ArtifactError::corrupt(KIND, path, "rows have no features"));
    }

    let n_rows = rows.len();
    let mut flat = Vec::with_capacity(n_rows * width);
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() != width {
            return Err(ArtifactError::corrupt(
                KIND,
                path,
                format!("row {} has {} features, expected {}", i + 1, row.len(), width),
            ));
        }
        if !validate_row(&row) {
            return Err(ArtifactError::corrupt(
                KIND,
                path,
                format!("row {} contains a non-finite value", i + 1),
            ));
        }
        flat.extend(row);
    }

    Array2::from_shape_vec((n_rows, width), flat).map_err(|e| ArtifactError::corrupt(KIND, path, e))
}

fn validate_row(row: &[f64]) -> bool {
    let mut is_valid = true;
    for value in row {
        if !value.is_finite() {
            warn!("Non-finite observation value {}", value);
            is_valid = false;
        }
    }
    is_valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_headerless_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "0.1, 0.5\n0.2,0.6\n0.3,0.7\n").unwrap();

        let data = load_dataset(&path).unwrap();
        assert_eq!(data.dim(), (3, 2));
        assert_eq!(data[[2, 0]], 0.3);
        assert_eq!(data[[0, 1]], 0.5);
    }

    #[test]
    fn loads_bincode_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let rows: Vec<Vec<f64>> = vec![vec![0.1], vec![0.2]];
        fs::write(&path, bincode::serialize(&rows).unwrap()).unwrap();

        let data = load_dataset(&path).unwrap();
        assert_eq!(data.dim(), (2, 1));
        assert_eq!(data[[1, 0]], 0.2);
    }

    #[test]
    fn missing_file_reports_missing_dataset() {
        let dir = TempDir::new().unwrap();
        let err = load_dataset(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Missing { kind: ArtifactKind::Dataset, .. }
        ));
    }

    #[test]
    fn ragged_rows_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "0.1,0.2\n0.3\n").unwrap();

        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn non_numeric_and_non_finite_values_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("text.csv");
        fs::write(&text, "0.1\nabc\n").unwrap();
        assert!(matches!(load_dataset(&text), Err(ArtifactError::Corrupt { .. })));

        let nan = dir.path().join("nan.csv");
        fs::write(&nan, "0.1\nNaN\n").unwrap();
        assert!(matches!(load_dataset(&nan), Err(ArtifactError::Corrupt { .. })));
    }

    #[test]
    fn unsupported_extension_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.pkl");
        fs::write(&path, b"\x80\x04").unwrap();
        let err = load_dataset(&path).unwrap_err();
        assert_eq!(err.kind(), ArtifactKind::Dataset);
        assert!(err.to_string().contains("unsupported dataset format"));
    }

    #[test]
    fn empty_csv_yields_empty_matrix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert_eq!(load_dataset(&path).unwrap().nrows(), 0);
    }
}
