//! Synthetic container inventory.

use std::fs::File;
use std::path::Path;

use madrid_map_container_models::{ContainerRecord, ContainerType};
use madrid_map_loader::containers::CONTAINER_COLUMNS;
use rand::Rng;

use crate::{FixtureError, FixtureOutcome, write_new};

/// Puerta del Sol.
const CENTER_LATITUDE: f64 = 40.4168;
const CENTER_LONGITUDE: f64 = -3.7038;
/// Half-width of the generated box, in degrees.
const SPREAD: f64 = 0.05;

/// Random containers of the four known types around central Madrid.
#[must_use]
pub fn random_containers<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<ContainerRecord> {
    let types = ContainerType::all();
    (0..count)
        .map(|_| {
            let container_type = types[rng.random_range(0..types.len())];
            ContainerRecord {
                type_label: container_type.to_string(),
                latitude: CENTER_LATITUDE + rng.random_range(-SPREAD..=SPREAD),
                longitude: CENTER_LONGITUDE + rng.random_range(-SPREAD..=SPREAD),
                description: format!("Contenedor {container_type} Modelo X"),
            }
        })
        .collect()
}

/// Generates `count` rows at `path` unless the file already exists.
///
/// # Errors
///
/// Returns [`FixtureError`] if the file cannot be written.
pub fn generate_containers<R: Rng + ?Sized>(
    path: &Path,
    count: usize,
    rng: &mut R,
) -> Result<FixtureOutcome, FixtureError> {
    if path.exists() {
        log::info!("{} already exists, not generating", path.display());
        return Ok(FixtureOutcome::Skipped {
            path: path.to_path_buf(),
        });
    }
    write_containers(path, &random_containers(count, rng))
}

/// Writes `records` as `;`-delimited text to a new file at `path`.
///
/// # Errors
///
/// Returns [`FixtureError`] if the file cannot be written.
pub fn write_containers(
    path: &Path,
    records: &[ContainerRecord],
) -> Result<FixtureOutcome, FixtureError> {
    write_new(path, records.len(), |file| write_delimited(file, records))
}

fn write_delimited(file: File, records: &[ContainerRecord]) -> Result<(), FixtureError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(file);
    writer.write_record(CONTAINER_COLUMNS)?;

    for record in records {
        writer.write_record([
            record.type_label.as_str(),
            record.latitude.to_string().as_str(),
            record.longitude.to_string().as_str(),
            record.description.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
