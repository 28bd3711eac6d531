//! Column listing and batch sentiment analysis over CSV files.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use csv_sentiment::{analyze_csv, list_columns, AnalysisOutcome, BuiltinModel, SentimentClassifier};
//!
//! let columns = list_columns("reviews.csv")?;
//! println!("columns: {:?}", columns);
//!
//! let classifier = SentimentClassifier::builder()
//!     .with_model(BuiltinModel::DistilBertSst2)?
//!     .build()?;
//!
//! match analyze_csv(&classifier, "reviews.csv", "text", "reviews_sentiment.csv")? {
//!     AnalysisOutcome::Success(report) => println!("wrote {}", report.output.display()),
//!     outcome @ AnalysisOutcome::ColumnNotFound { .. } => println!("{}", outcome.message()),
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use serde::Serialize;

use crate::classifier::{ClassifierError, TextClassifier};
use crate::table::{self, Table, TableError};

/// Name of the appended label column
pub const SENTIMENT_COLUMN: &str = "Sentiment";
/// Name of the appended score column
pub const CONFIDENCE_COLUMN: &str = "Confidence";
/// Shown to users when the chosen column is absent
pub const COLUMN_NOT_FOUND_MESSAGE: &str = "Error: Column not found in file.";
/// Output file name used when the caller has no better destination
pub const DEFAULT_OUTPUT_FILE: &str = "sentiment_output.csv";

#[derive(Debug, thiserror::Error)]
pub enum ColumnListError {
    #[error("File not found: {0}")]
    FileMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Could not parse CSV: {0}")]
    Parse(#[from] TableError),
    #[error("File has no header row")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: TableError,
    },
    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Classifier returned {actual} results for {expected} texts")]
    ResultCountMismatch {
        expected: usize,
        actual: usize,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

/// What a successful analysis produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub output: PathBuf,
    pub rows: usize,
    pub label_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The augmented table was written
    Success(AnalysisReport),
    /// The requested column is not in the file; nothing was written
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },
}

impl AnalysisOutcome {
    /// Text for front ends that show a single message
    pub fn message(&self) -> String {
        match self {
            Self::Success(report) => report.output.display().to_string(),
            Self::ColumnNotFound { .. } => COLUMN_NOT_FOUND_MESSAGE.to_string(),
        }
    }
}

/// Lists the column names of a CSV file in header order.
///
/// Only the header and the first data row are read.
pub fn list_columns<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ColumnListError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ColumnListError::FileMissing(path.to_path_buf()),
        _ => ColumnListError::Io(e),
    })?;

    let headers = table::read_header(io::BufReader::new(file))?
        .ok_or(ColumnListError::Empty)?;
    debug!("Found {} columns in {:?}", headers.len(), path);
    Ok(headers)
}

/// Checks that `column` is in the header of `path` without loading the rows.
///
/// Returns `Ok(None)` when the column is present, or the `ColumnNotFound`
/// outcome [`analyze_csv`] would produce for it.
pub fn check_column<P: AsRef<Path>>(path: P, column: &str) -> Result<Option<AnalysisOutcome>, ColumnListError> {
    let available = list_columns(path)?;
    if available.iter().any(|name| name == column) {
        return Ok(None);
    }
    Ok(Some(AnalysisOutcome::ColumnNotFound {
        column: column.to_string(),
        available,
    }))
}

/// Column names for populating a picker; empty on any failure
pub fn column_choices<P: AsRef<Path>>(path: P) -> Vec<String> {
    match list_columns(path.as_ref()) {
        Ok(columns) => columns,
        Err(e) => {
            warn!("Could not list columns of {:?}: {}", path.as_ref(), e);
            Vec::new()
        }
    }
}

/// Rounds to 3 decimals, half away from zero
pub fn round_confidence(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round() / 1000.0
}

/// Formats a confidence with exactly 3 fractional digits
pub fn format_confidence(score: f32) -> String {
    format!("{:.3}", round_confidence(score).clamp(0.0, 1.0))
}

/// Classifies every value of `column` and writes the table, plus
/// `Sentiment` and `Confidence` columns, to `output`.
///
/// Returns `AnalysisOutcome::ColumnNotFound` without writing anything when the
/// column is absent. `output` is replaced if it exists. If the input already
/// has `Sentiment` or `Confidence` columns their values are replaced and they
/// keep their position.
pub fn analyze_csv<C, I, O>(
    classifier: &C,
    input: I,
    column: &str,
    output: O,
) -> Result<AnalysisOutcome, AnalysisError>
where
    C: TextClassifier + ?Sized,
    I: AsRef<Path>,
    O: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();

    let table = Table::from_path(input).map_err(|source| AnalysisError::Load {
        path: input.to_path_buf(),
        source,
    })?;
    info!("Loaded {} rows from {:?}", table.row_count(), input);

    analyze_table(classifier, table, column, output)
}

/// Same as [`analyze_csv`] for a table already in memory
pub fn analyze_table<C>(
    classifier: &C,
    mut table: Table,
    column: &str,
    output: &Path,
) -> Result<AnalysisOutcome, AnalysisError>
where
    C: TextClassifier + ?Sized,
{
    let Some(index) = table.column_index(column) else {
        warn!("Column '{}' not found, available: {:?}", column, table.headers());
        return Ok(AnalysisOutcome::ColumnNotFound {
            column: column.to_string(),
            available: table.headers().to_vec(),
        });
    };

    let texts: Vec<String> = table.column_values(index).map(str::to_string).collect();

    let results = if texts.is_empty() {
        Vec::new()
    } else {
        classifier.classify_batch(&texts)?
    };
    if results.len() != texts.len() {
        return Err(AnalysisError::ResultCountMismatch {
            expected: texts.len(),
            actual: results.len(),
        });
    }

    let mut label_counts = BTreeMap::new();
    let mut labels = Vec::with_capacity(results.len());
    let mut confidences = Vec::with_capacity(results.len());
    for result in results {
        *label_counts.entry(result.label.clone()).or_insert(0) += 1;
        confidences.push(format_confidence(result.score));
        labels.push(result.label);
    }

    let rows = table.row_count();
    let write_error = |source| AnalysisError::Write {
        path: output.to_path_buf(),
        source,
    };
    // Columns left by an earlier run are overwritten in place
    table.set_column(SENTIMENT_COLUMN, labels).map_err(write_error)?;
    table.set_column(CONFIDENCE_COLUMN, confidences).map_err(write_error)?;
    table.write_to_path(output).map_err(write_error)?;

    info!("Wrote {} rows to {:?} ({:?})", rows, output, label_counts);
    Ok(AnalysisOutcome::Success(AnalysisReport {
        output: output.to_path_buf(),
        rows,
        label_counts,
    }))
}

/// `<stem>_sentiment.csv` next to `input`
pub fn default_output_path(input: &Path) -> PathBuf {
    match input.file_stem() {
        Some(stem) => {
            let mut name = stem.to_os_string();
            name.push("_sentiment.csv");
            input.with_file_name(name)
        }
        None => PathBuf::from(DEFAULT_OUTPUT_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(0.99987), 1.0);
        assert_eq!(round_confidence(0.1234), 0.123);
        assert_eq!(round_confidence(0.0), 0.0);
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.99987), "1.000");
        assert_eq!(format_confidence(0.5), "0.500");
        assert_eq!(format_confidence(0.98765), "0.988");
    }

    #[test]
    fn test_outcome_message() {
        let outcome = AnalysisOutcome::ColumnNotFound {
            column: "notes".into(),
            available: vec!["id".into(), "text".into()],
        };
        assert_eq!(outcome.message(), "Error: Column not found in file.");
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("data/reviews.csv")),
            PathBuf::from("data/reviews_sentiment.csv")
        );
        assert_eq!(default_output_path(Path::new("")), PathBuf::from(DEFAULT_OUTPUT_FILE));
    }
}
