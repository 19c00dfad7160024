//! CSV score writer for prediction output.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::IoError;

/// Writes per-example scores as `index,label,score` CSV.
///
/// Writes to a file when constructed with a path, otherwise to stdout.
pub struct ScoreWriter {
    path: Option<PathBuf>,
}

impl ScoreWriter {
    /// Create a writer targeting `path`, or stdout when `None`.
    #[must_use]
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
        }
    }

    /// Write one row per example: its zero-based index, true label and score.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the output cannot be written.
    #[instrument(skip_all, fields(n_rows = scores.len()))]
    pub fn write(&self, labels: &[usize], scores: &[f64]) -> Result<(), IoError> {
        let result = match &self.path {
            Some(path) => csv::Writer::from_path(path)
                .and_then(|wtr| write_rows(wtr, labels, scores)),
            None => write_rows(csv::Writer::from_writer(io::stdout().lock()), labels, scores),
        };
        let target = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("<stdout>"));
        result.map_err(|e| IoError::WriteFile {
            path: target.clone(),
            source: e.into(),
        })?;

        info!(path = %target.display(), "scores written");
        Ok(())
    }
}

fn write_rows<W: io::Write>(
    mut wtr: csv::Writer<W>,
    labels: &[usize],
    scores: &[f64],
) -> csv::Result<()> {
    wtr.write_record(["index", "label", "score"])?;
    for (index, (label, score)) in labels.iter().zip(scores).enumerate() {
        wtr.write_record([index.to_string(), label.to_string(), score.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.csv");
        ScoreWriter::new(Some(&path))
            .write(&[0, 1], &[0.25, 0.75])
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "index,label,score\n0,0,0.25\n1,1,0.75\n");
    }

    #[test]
    fn missing_directory_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("scores.csv");
        let result = ScoreWriter::new(Some(&path)).write(&[0], &[0.1]);
        assert!(matches!(result, Err(IoError::WriteFile { .. })));
    }
}
