//! Accident register extraction.
//!
//! Turns a [`Table`] with the register's columns into [`AccidentRecord`]s.
//! Rows missing either UTM coordinate are dropped first (they can never be
//! placed on a map). Rows whose coordinate or date is present but unreadable
//! are rejected and reported as [`DataLoadError::InvalidValue`]. A blank or
//! unrecognised sex is kept as [`Sex::Desconocido`] and left to the filter.

use std::path::Path;
use std::sync::Arc;

use madrid_map_accident_models::{AccidentRecord, PersonType, Sex, VehicleType};

use crate::progress::ProgressCallback;
use crate::{DataLoadError, Table, TableSchema, load_table};

pub const COL_X_UTM: &str = "coordenada_x_utm";
pub const COL_Y_UTM: &str = "coordenada_y_utm";
pub const COL_PERSON_TYPE: &str = "tipo_persona";
pub const COL_VEHICLE_TYPE: &str = "tipo_vehiculo";
pub const COL_SEX: &str = "sexo";
pub const COL_DATE: &str = "fecha";
pub const COL_CASE_ID: &str = "num_expediente";

/// Columns of the accident register, in file order.
pub const ACCIDENT_COLUMNS: [&str; 7] = [
    COL_X_UTM,
    COL_Y_UTM,
    COL_PERSON_TYPE,
    COL_VEHICLE_TYPE,
    COL_SEX,
    COL_DATE,
    COL_CASE_ID,
];

/// Schema of the register. The published CSV variant is `;`-delimited.
#[must_use]
pub fn accident_schema() -> TableSchema {
    TableSchema::new(&ACCIDENT_COLUMNS).with_delimiter(b';')
}

/// Result of extracting accident rows from a table.
#[derive(Debug, Default)]
pub struct AccidentLoad {
    /// Usable rows, in file order.
    pub records: Vec<AccidentRecord>,
    /// Rows dropped because a UTM coordinate was missing.
    pub missing_coordinates: usize,
    /// Rows rejected for an unreadable value.
    pub rejected: Vec<DataLoadError>,
}

impl AccidentLoad {
    /// Total data rows seen.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.missing_coordinates + self.rejected.len()
    }
}

/// Loads and extracts the accident register at `path`.
///
/// # Errors
///
/// Returns [`DataLoadError`] if the file is missing, malformed, or lacks a
/// required column.
pub fn load_accidents(
    path: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AccidentLoad, DataLoadError> {
    let table = load_table(path, &accident_schema())?;
    accidents_from_table(&table, progress)
}

/// Extracts [`AccidentRecord`]s from an already loaded table.
///
/// # Errors
///
/// Returns [`DataLoadError::Schema`] if a required column is missing.
pub fn accidents_from_table(
    table: &Table,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AccidentLoad, DataLoadError> {
    let schema_err = |source| DataLoadError::Schema {
        path: table.source.clone(),
        source,
    };
    let x_col = table.column(COL_X_UTM).map_err(schema_err)?;
    let y_col = table.column(COL_Y_UTM).map_err(schema_err)?;
    let person_col = table.column(COL_PERSON_TYPE).map_err(schema_err)?;
    let vehicle_col = table.column(COL_VEHICLE_TYPE).map_err(schema_err)?;
    let sex_col = table.column(COL_SEX).map_err(schema_err)?;
    let date_col = table.column(COL_DATE).map_err(schema_err)?;
    let case_col = table.column(COL_CASE_ID).map_err(schema_err)?;

    progress.set_total(table.len() as u64);
    let mut load = AccidentLoad::default();
    let mut unknown_sex = 0_usize;

    for row in 0..table.len() {
        progress.inc(1);

        let (x_cell, y_cell) = (table.cell(row, x_col), table.cell(row, y_col));
        if x_cell.is_empty() || y_cell.is_empty() {
            load.missing_coordinates += 1;
            continue;
        }
        let Some(x_utm) = x_cell.as_f64() else {
            load.rejected.push(invalid(row, COL_X_UTM, &x_cell.as_text()));
            continue;
        };
        let Some(y_utm) = y_cell.as_f64() else {
            load.rejected.push(invalid(row, COL_Y_UTM, &y_cell.as_text()));
            continue;
        };

        let sex_cell = table.cell(row, sex_col);
        let sex = sex_cell.as_text().parse::<Sex>().unwrap_or_else(|_| {
            if !sex_cell.is_empty() {
                unknown_sex += 1;
            }
            Sex::Desconocido
        });

        let date_cell = table.cell(row, date_col);
        let Some(date) = date_cell.as_date() else {
            load.rejected.push(invalid(row, COL_DATE, &date_cell.as_text()));
            continue;
        };

        load.records.push(AccidentRecord {
            x_utm,
            y_utm,
            person_type: PersonType::from(table.cell(row, person_col).as_text().as_ref()),
            vehicle_type: VehicleType::from(table.cell(row, vehicle_col).as_text().as_ref()),
            sex,
            date,
            case_id: table.cell(row, case_col).as_text().into_owned(),
        });
    }

    if load.missing_coordinates > 0 {
        log::warn!(
            "Dropped {} accident rows without UTM coordinates",
            load.missing_coordinates
        );
    }
    if unknown_sex > 0 {
        log::debug!("Read {unknown_sex} unrecognised sexo values as {}", Sex::Desconocido);
    }
    if !load.rejected.is_empty() {
        log::warn!("Rejected {} accident rows with invalid values", load.rejected.len());
        for err in load.rejected.iter().take(5) {
            log::debug!("  {err}");
        }
    }

    progress.finish(format!("{} accident rows loaded", load.records.len()));
    log::info!(
        "Extracted {}/{} accident records from {}",
        load.records.len(),
        load.total_rows(),
        table.source.display()
    );

    Ok(load)
}

fn invalid(row: usize, column: &str, value: &str) -> DataLoadError {
    DataLoadError::InvalidValue {
        row: row + 1,
        column: column.to_owned(),
        value: value.to_owned(),
    }
}
