//! In-memory CSV table: ordered headers and ordered rows.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("Line {line}: expected {expected} fields, found {actual}")]
    TooManyFields {
        line: u64,
        expected: usize,
        actual: usize,
    },
    #[error("Column '{column}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// A CSV document held in memory.
///
/// Every row has exactly one value per header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

fn record_to_vec(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

/// Fits a record to the header width.
///
/// Short rows are padded with empty cells; rows with extra fields are rejected.
fn fit_record(record: &StringRecord, width: usize) -> Result<Vec<String>, TableError> {
    if record.len() > width {
        return Err(TableError::TooManyFields {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            expected: width,
            actual: record.len(),
        });
    }

    let mut row = record_to_vec(record);
    row.resize(width, String::new());
    Ok(row)
}

/// Reads the header row and validates at most one data row after it.
///
/// Returns `Ok(None)` when the input has no header row at all.
pub fn read_header<R: Read>(reader: R) -> Result<Option<Vec<String>>, TableError> {
    let mut reader = reader_builder().from_reader(reader);
    let headers = record_to_vec(reader.headers()?);
    if headers.is_empty() {
        return Ok(None);
    }

    // Surface a malformed first record as an error, stop there
    if let Some(first) = reader.records().next() {
        fit_record(&first?, headers.len())?;
    }
    Ok(Some(headers))
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Loads a whole CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = reader_builder().from_reader(reader);
        let headers = record_to_vec(reader.headers()?);

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(fit_record(&record?, headers.len())?);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Position of the first column named exactly `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column in row order
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Replaces the values of column `name` in place, or appends it after the
    /// existing columns when absent. `values` must have one entry per row.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<String>) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        match self.column_index(&name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.headers.push(name);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the table to `path`, replacing any existing file.
    ///
    /// The data goes to a uniquely named sibling temporary file which is then
    /// renamed over `path`, so `path` only ever holds a complete document.
    /// The temporary file is removed if anything fails.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let path = path.as_ref();
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_to(io::BufWriter::new(tmp.as_file_mut()))?;
        tmp.persist(path).map_err(|e| TableError::Io(e.error))?;
        Ok(())
    }
}
