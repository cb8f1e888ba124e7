//! Delimited text reader.
//!
//! Parses a header row plus data rows with the `csv` crate. Rows may be
//! ragged (`flexible`), and bytes that are not valid UTF-8 are decoded
//! lossily, since municipal exports are not always UTF-8 clean.

use std::path::Path;

use crate::{Cell, DataLoadError, Table};

/// Reads a delimited text file into a [`Table`]. Every non-blank value is
/// kept as [`Cell::Text`]; typing happens when rows are extracted.
///
/// # Errors
///
/// Returns [`DataLoadError::Csv`] for malformed input and
/// [`DataLoadError::EmptySheet`] when there is no header row.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<Table, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(DataLoadError::EmptySheet(path.to_path_buf()));
    }

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = result?;
        if record.iter().all(|field| field.iter().all(u8::is_ascii_whitespace)) {
            continue;
        }
        rows.push(
            record
                .iter()
                .map(|field| Cell::from_text(&String::from_utf8_lossy(field)))
                .collect(),
        );
    }

    log::debug!(
        "Parsed {} delimited rows from {} (delimiter {:?})",
        rows.len(),
        path.display(),
        char::from(delimiter)
    );

    Ok(Table {
        source: path.to_path_buf(),
        headers,
        rows,
    })
}
