use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a pipeline step.
///
/// Row-level problems never surface here: malformed rows are logged and
/// dropped by the loader.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A file could not be opened, created or written.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    /// The workbook has no worksheet to read.
    #[error("Workbook {0} contains no worksheet")]
    EmptyWorkbook(PathBuf),

    /// A required column is absent from the input header.
    #[error("Schema mismatch: missing required column {0:?}")]
    MissingColumn(String),

    #[error("Date formatting failed: {0}")]
    DateFormat(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_display() {
        let err = PipelineError::MissingColumn("Landsize".to_string());
        assert_eq!(
            err.to_string(),
            "Schema mismatch: missing required column \"Landsize\""
        );
    }

    #[test]
    fn test_io_display_carries_path() {
        let err = PipelineError::io(
            "/data/raw/melb_data.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/data/raw/melb_data.csv"));
        assert!(msg.contains("no such file"));
    }
}
