//! Spreadsheet reader backed by `calamine`.
//!
//! The first non-empty row of the first worksheet is the header row.
//! Native date cells are converted through their serial value so no
//! optional `calamine` date features are required.

use std::path::Path;

use calamine::{Data, Reader as _, open_workbook_auto};

use crate::parsing::{excel_serial_to_datetime, parse_date};
use crate::{Cell, DataLoadError, Table};

/// Reads the first worksheet of a workbook into a [`Table`].
///
/// # Errors
///
/// Returns [`DataLoadError::Spreadsheet`] if the workbook cannot be opened,
/// and [`DataLoadError::EmptySheet`] when it has no sheet or no rows.
pub fn read_spreadsheet(path: &Path) -> Result<Table, DataLoadError> {
    let mut workbook = open_workbook_auto(path)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataLoadError::EmptySheet(path.to_path_buf()))??;

    let mut rows_iter = range
        .rows()
        .skip_while(|row| row.iter().all(|cell| matches!(cell, Data::Empty)));

    let Some(header_row) = rows_iter.next() else {
        return Err(DataLoadError::EmptySheet(path.to_path_buf()));
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_from_data(cell).as_text().trim().to_owned())
        .collect();

    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();

    log::debug!("Read {} spreadsheet rows from {}", rows.len(), path.display());

    Ok(Table {
        source: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Converts a `calamine` cell to a [`Cell`].
#[allow(clippy::cast_precision_loss)]
fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial).map_or(Cell::Number(serial), Cell::DateTime)
        }
        Data::DateTimeIso(s) => parse_date(s)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or_else(|| Cell::from_text(s), Cell::DateTime),
        Data::DurationIso(s) => Cell::from_text(s),
        Data::Error(e) => {
            log::debug!("Spreadsheet cell error: {e:?}");
            Cell::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    use super::*;

    fn write_workbook(path: &Path) {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let sheet = workbook.add_worksheet();

        sheet.write_string(0, 0, "coordenada_x_utm").unwrap();
        sheet.write_string(0, 1, "fecha").unwrap();
        sheet.write_string(0, 2, "num_expediente").unwrap();

        sheet.write_number(1, 0, 440_123.0).unwrap();
        let date = ExcelDateTime::from_ymd(2023, 3, 14).unwrap();
        sheet
            .write_datetime_with_format(1, 1, &date, &date_format)
            .unwrap();
        sheet.write_string(1, 2, "2023S1234").unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn reads_numbers_dates_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accidents.xlsx");
        write_workbook(&path);

        let table = read_spreadsheet(&path).unwrap();
        assert_eq!(table.headers, vec!["coordenada_x_utm", "fecha", "num_expediente"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 0).as_f64(), Some(440_123.0));
        assert_eq!(
            table.cell(0, 1).as_date(),
            chrono::NaiveDate::from_ymd_opt(2023, 3, 14)
        );
        assert_eq!(table.cell(0, 2).as_text(), "2023S1234");
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        assert!(read_spreadsheet(&path).is_err());
    }
}
