//! CSV dataset reader with full input validation.

use std::path::{Path, PathBuf};

use sylva_forest::Dataset;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads labelled examples from a CSV file.
///
/// Expected CSV format:
/// - Header row required (first column is the label, remaining are features)
/// - `label,f0,f1,...,fn`
/// - One row per example; labels are `0` or `1`, features finite floats
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumns`] | Header has fewer than two columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidLabel`] | Label cell is not `0` or `1` |
/// | [`IoError::NonFiniteValue`] | Feature is NaN, Inf, or unparseable |
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets the row-length check below report the row.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let expected_cols = header.len();
        if expected_cols < 2 {
            return Err(IoError::MissingColumns {
                path: self.path.clone(),
                columns: expected_cols,
            });
        }
        debug!(expected_cols, "read CSV header");

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let raw_label = record.get(0).unwrap_or("");
            let label = match raw_label {
                "0" => 0,
                "1" => 1,
                _ => {
                    return Err(IoError::InvalidLabel {
                        path: self.path.clone(),
                        row_index,
                        raw: raw_label.to_string(),
                    });
                }
            };

            let mut row = Vec::with_capacity(expected_cols - 1);
            for (feature_index, raw) in record.iter().skip(1).enumerate() {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        feature_index,
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }

            labels.push(label);
            features.push(row);
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let dataset = Dataset::new(features, labels).map_err(|e| IoError::InvalidDataset {
            path: self.path.clone(),
            source: e,
        })?;

        let [n_negative, n_positive] = dataset.class_counts();
        info!(
            n_examples = dataset.n_examples(),
            n_features = dataset.n_features(),
            n_negative,
            n_positive,
            "dataset loaded"
        );

        Ok(dataset)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
