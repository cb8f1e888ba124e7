#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular input loading.
//!
//! [`load_table`] reads a spreadsheet (`.xlsx`, `.xls`, `.ods`) or a
//! delimited text file into an in-memory [`Table`] and checks it against a
//! declared [`TableSchema`]. The [`accidents`] and [`containers`] modules
//! turn tables into typed records, dropping and counting rows that cannot
//! be used.
//!
//! Loading is a pure read: nothing on disk is created or modified.

pub mod accidents;
pub mod containers;
pub mod delimited;
pub mod parsing;
pub mod progress;
pub mod spreadsheet;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::parsing::{excel_serial_to_datetime, parse_date, parse_number};

/// A required column is absent from the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The header row does not contain the column.
    #[error("missing required column '{column}' (found: {})", available.join(", "))]
    MissingColumn {
        /// The column that was expected.
        column: String,
        /// Headers actually present in the file.
        available: Vec<String>,
    },
}

/// Errors that can occur while loading an input table.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The input file does not exist.
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O error while reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The spreadsheet could not be opened or read.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// The workbook or sheet contains no header row.
    #[error("no data found in {}", .0.display())]
    EmptySheet(PathBuf),

    /// The table does not match the declared schema.
    #[error("schema error in {}: {source}", path.display())]
    Schema {
        /// File being loaded.
        path: PathBuf,
        /// The schema violation.
        source: SchemaError,
    },

    /// A single cell holds a value that cannot be interpreted.
    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        /// 1-based data row number (the header is row 0).
        row: usize,
        /// Column name.
        column: String,
        /// Offending raw value.
        value: String,
    },
}

/// How an input file is encoded, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.xlsx`, `.xlsm`, `.xls`, `.ods`
    Spreadsheet,
    /// Anything else is read as delimited text.
    Delimited,
}

impl SourceFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Self::Spreadsheet,
            _ => Self::Delimited,
        }
    }
}

/// Declared shape of an input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Columns that must be present in the header row.
    pub columns: Vec<String>,
    /// Field delimiter for delimited text.
    pub delimiter: u8,
}

impl TableSchema {
    /// Creates a comma-delimited schema requiring `columns`.
    #[must_use]
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|&c| c.to_owned()).collect(),
            delimiter: b',',
        }
    }

    /// Sets the field delimiter (e.g. `b';'`).
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Builds a cell from raw text, mapping blank text to [`Cell::Empty`].
    #[must_use]
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_owned())
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric value, parsing text when needed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Calendar date, accepting native date cells, serial numbers and text.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::DateTime(dt) => Some(dt.date()),
            Self::Number(n) => excel_serial_to_datetime(*n).map(|dt| dt.date()),
            Self::Text(s) => parse_date(s),
            Self::Empty | Self::Bool(_) => None,
        }
    }

    /// Textual rendering of the cell. Whole numbers are printed without a
    /// fractional part so numeric identifiers survive.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Cow::Owned(format!("{n:.0}"))
            }
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::DateTime(dt) => Cow::Owned(dt.to_string()),
        }
    }
}

/// An in-memory table: a header row plus data rows of [`Cell`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// File the table was read from.
    pub source: PathBuf,
    /// Trimmed header names.
    pub headers: Vec<String>,
    /// Data rows. Short rows are padded with [`Cell::Empty`] on access.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Index of a column by exact header name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingColumn`] if no header matches.
    pub fn column(&self, name: &str) -> Result<usize, SchemaError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: name.to_owned(),
                available: self.headers.clone(),
            })
    }

    /// Checks every schema column is present.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found.
    pub fn validate(&self, schema: &TableSchema) -> Result<(), SchemaError> {
        for column in &schema.columns {
            self.column(column)?;
        }
        Ok(())
    }

    /// Cell at `(row, column)`, or [`Cell::Empty`] for short rows.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(EMPTY)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads `path` into a [`Table`] and validates it against `schema`.
///
/// # Errors
///
/// Returns [`DataLoadError::NotFound`] when the file is absent,
/// [`DataLoadError::Schema`] when a required column is missing, and a
/// format-specific variant when the file is malformed.
pub fn load_table(path: &Path, schema: &TableSchema) -> Result<Table, DataLoadError> {
    if !path.is_file() {
        return Err(DataLoadError::NotFound(path.to_path_buf()));
    }

    let format = SourceFormat::from_path(path);
    log::debug!("Loading {} as {format:?}", path.display());

    let table = match format {
        SourceFormat::Spreadsheet => spreadsheet::read_spreadsheet(path)?,
        SourceFormat::Delimited => delimited::read_delimited(path, schema.delimiter)?,
    };

    table
        .validate(schema)
        .map_err(|source| DataLoadError::Schema {
            path: path.to_path_buf(),
            source,
        })?;

    log::info!(
        "Loaded {} rows ({} columns) from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a/2023_Accidentalidad.xlsx")),
            SourceFormat::Spreadsheet
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("b.ODS")),
            SourceFormat::Spreadsheet
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("Contenedores_varios.csv")),
            SourceFormat::Delimited
        );
        assert_eq!(SourceFormat::from_path(Path::new("noext")), SourceFormat::Delimited);
    }

    #[test]
    fn cell_text_keeps_integer_identifiers() {
        assert_eq!(Cell::Number(2023.0).as_text(), "2023");
        assert_eq!(Cell::Number(1.5).as_text(), "1.5");
        assert_eq!(Cell::from_text("  "), Cell::Empty);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_table(Path::new("/nonexistent/input.csv"), &TableSchema::new(&["a"]))
            .unwrap_err();
        assert!(matches!(err, DataLoadError::NotFound(_)));
    }

    #[test]
    fn missing_column_is_schema_error() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a;b").unwrap();
        writeln!(file, "1;2").unwrap();

        let schema = TableSchema::new(&["a", "c"]).with_delimiter(b';');
        let err = load_table(file.path(), &schema).unwrap_err();
        match err {
            DataLoadError::Schema {
                source: SchemaError::MissingColumn { column, available },
                ..
            } => {
                assert_eq!(column, "c");
                assert_eq!(available, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_rows_read_as_empty() {
        let table = Table {
            source: PathBuf::from("t.csv"),
            headers: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![Cell::Number(1.0)]],
        };
        assert_eq!(table.cell(0, 1), &Cell::Empty);
        assert_eq!(table.cell(5, 0), &Cell::Empty);
    }
}
