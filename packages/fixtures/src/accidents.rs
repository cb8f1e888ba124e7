//! Synthetic accident register.

use std::fs::File;
use std::path::Path;

use chrono::{Days, NaiveDate};
use madrid_map_accident_models::{AccidentRecord, PersonType, Sex, VehicleType};
use madrid_map_loader::SourceFormat;
use madrid_map_loader::accidents::ACCIDENT_COLUMNS;
use rand::Rng;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::{FixtureError, FixtureOutcome, write_new};

const BASE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(date) => date,
    None => panic!("invalid base date"),
};

/// Center of the generated UTM box, in meters.
const CENTER_X: i32 = 440_000;
const CENTER_Y: i32 = 4_470_000;
/// Half-width of the generated UTM box, in meters.
const SPREAD: i32 = 5_000;

const PERSON_TYPES: [PersonType; 3] = [
    PersonType::Conductor,
    PersonType::Peaton,
    PersonType::Pasajero,
];

const VEHICLE_TYPES: [VehicleType; 5] = [
    VehicleType::Turismo,
    VehicleType::Bicicleta,
    VehicleType::Motocicleta,
    VehicleType::Furgoneta,
    VehicleType::Autobus,
];

const SEXES: [Sex; 2] = [Sex::Mujer, Sex::Hombre];

fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Random accident rows around central Madrid during 2023.
#[must_use]
pub fn random_accidents<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<AccidentRecord> {
    (0..count)
        .map(|_| AccidentRecord {
            x_utm: f64::from(CENTER_X + rng.random_range(-SPREAD..=SPREAD)),
            y_utm: f64::from(CENTER_Y + rng.random_range(-SPREAD..=SPREAD)),
            person_type: pick(&PERSON_TYPES, rng).clone(),
            vehicle_type: pick(&VEHICLE_TYPES, rng).clone(),
            sex: *pick(&SEXES, rng),
            date: BASE_DATE + Days::new(rng.random_range(0..365)),
            case_id: format!("2023S{}", rng.random_range(1000..=9999)),
        })
        .collect()
}

/// Generates `count` rows at `path` unless the file already exists.
///
/// Spreadsheet extensions produce an `.xlsx` workbook; anything else a
/// `;`-delimited text file.
///
/// # Errors
///
/// Returns [`FixtureError`] if the file cannot be written.
pub fn generate_accidents<R: Rng + ?Sized>(
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
    write_accidents(path, &random_accidents(count, rng))
}

/// Writes `records` to a new file at `path`. An existing file is left
/// untouched and reported as skipped.
///
/// # Errors
///
/// Returns [`FixtureError`] if the file cannot be written.
pub fn write_accidents(
    path: &Path,
    records: &[AccidentRecord],
) -> Result<FixtureOutcome, FixtureError> {
    write_new(path, records.len(), |file| match SourceFormat::from_path(path) {
        SourceFormat::Spreadsheet => write_workbook(file, records),
        SourceFormat::Delimited => write_delimited(file, records),
    })
}

fn write_workbook(file: File, records: &[AccidentRecord]) -> Result<(), FixtureError> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let sheet = workbook.add_worksheet();

    for (col, name) in (0u16..).zip(ACCIDENT_COLUMNS) {
        sheet.write_string(0, col, name)?;
    }

    for (row, record) in (1u32..).zip(records) {
        let date = ExcelDateTime::parse_from_str(&record.date.format("%Y-%m-%d").to_string())?;
        sheet.write_number(row, 0, record.x_utm)?;
        sheet.write_number(row, 1, record.y_utm)?;
        sheet.write_string(row, 2, record.person_type.as_str())?;
        sheet.write_string(row, 3, record.vehicle_type.as_str())?;
        sheet.write_string(row, 4, record.sex.to_string())?;
        sheet.write_datetime_with_format(row, 5, &date, &date_format)?;
        sheet.write_string(row, 6, &record.case_id)?;
    }

    workbook.save_to_writer(file)?;
    Ok(())
}

fn write_delimited(file: File, records: &[AccidentRecord]) -> Result<(), FixtureError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(file);
    writer.write_record(ACCIDENT_COLUMNS)?;

    for record in records {
        writer.write_record([
            record.x_utm.to_string().as_str(),
            record.y_utm.to_string().as_str(),
            record.person_type.as_str(),
            record.vehicle_type.as_str(),
            record.sex.as_ref(),
            record.date.format("%Y-%m-%d").to_string().as_str(),
            record.case_id.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
