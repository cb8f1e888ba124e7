//! Container inventory extraction.

use std::path::Path;
use std::sync::Arc;

use madrid_map_container_models::ContainerRecord;

use crate::progress::ProgressCallback;
use crate::{DataLoadError, Table, TableSchema, load_table};

pub const COL_TYPE: &str = "Tipo Contenedor";
pub const COL_LATITUDE: &str = "LATITUD";
pub const COL_LONGITUDE: &str = "LONGITUD";
pub const COL_DESCRIPTION: &str = "Descripcion Modelo";

/// Columns of the container inventory, in file order.
pub const CONTAINER_COLUMNS: [&str; 4] = [COL_TYPE, COL_LATITUDE, COL_LONGITUDE, COL_DESCRIPTION];

/// Schema of the `;`-delimited inventory.
#[must_use]
pub fn container_schema() -> TableSchema {
    TableSchema::new(&CONTAINER_COLUMNS).with_delimiter(b';')
}

/// Result of extracting container rows from a table.
#[derive(Debug, Default)]
pub struct ContainerLoad {
    /// Usable rows, in file order. Unknown categories are kept here; they
    /// are separated out when the inventory is partitioned.
    pub records: Vec<ContainerRecord>,
    /// Rows rejected for a missing or unreadable coordinate.
    pub rejected: Vec<DataLoadError>,
}

/// Loads and extracts the container inventory at `path`.
///
/// # Errors
///
/// Returns [`DataLoadError`] if the file is missing, malformed, or lacks a
/// required column.
pub fn load_containers(
    path: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ContainerLoad, DataLoadError> {
    let table = load_table(path, &container_schema())?;
    containers_from_table(&table, progress)
}

/// Extracts [`ContainerRecord`]s from an already loaded table.
///
/// # Errors
///
/// Returns [`DataLoadError::Schema`] if a required column is missing.
pub fn containers_from_table(
    table: &Table,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ContainerLoad, DataLoadError> {
    let schema_err = |source| DataLoadError::Schema {
        path: table.source.clone(),
        source,
    };
    let type_col = table.column(COL_TYPE).map_err(schema_err)?;
    let lat_col = table.column(COL_LATITUDE).map_err(schema_err)?;
    let lng_col = table.column(COL_LONGITUDE).map_err(schema_err)?;
    let desc_col = table.column(COL_DESCRIPTION).map_err(schema_err)?;

    progress.set_total(table.len() as u64);
    let mut load = ContainerLoad::default();

    for row in 0..table.len() {
        progress.inc(1);

        let lat_cell = table.cell(row, lat_col);
        let Some(latitude) = lat_cell.as_f64() else {
            load.rejected.push(DataLoadError::InvalidValue {
                row: row + 1,
                column: COL_LATITUDE.to_owned(),
                value: lat_cell.as_text().into_owned(),
            });
            continue;
        };

        let lng_cell = table.cell(row, lng_col);
        let Some(longitude) = lng_cell.as_f64() else {
            load.rejected.push(DataLoadError::InvalidValue {
                row: row + 1,
                column: COL_LONGITUDE.to_owned(),
                value: lng_cell.as_text().into_owned(),
            });
            continue;
        };

        load.records.push(ContainerRecord {
            type_label: table.cell(row, type_col).as_text().trim().to_owned(),
            latitude,
            longitude,
            description: table.cell(row, desc_col).as_text().into_owned(),
        });
    }

    if !load.rejected.is_empty() {
        log::warn!(
            "Rejected {} container rows with missing or invalid coordinates",
            load.rejected.len()
        );
    }

    progress.finish(format!("{} container rows loaded", load.records.len()));
    log::info!(
        "Extracted {} container records from {}",
        load.records.len(),
        table.source.display()
    );

    Ok(load)
}
