#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic input generation for offline and demo runs.
//!
//! Produces random rows that match the input schemas (bounded coordinate
//! ranges, random categorical values, dates within 2023) and writes them
//! to the expected input paths. Generation is an explicit step: the map
//! pipelines never call into this crate, and an existing file is never
//! replaced.

pub mod accidents;
pub mod containers;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub use accidents::{generate_accidents, random_accidents, write_accidents};
pub use containers::{generate_containers, random_containers, write_containers};

/// Errors that can occur while writing fixture files.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// I/O error creating the file or its directory.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Delimited text could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook could not be built or saved.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

/// What happened to one fixture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureOutcome {
    /// A new file was written.
    Created { path: PathBuf, rows: usize },
    /// The file already existed and was left untouched.
    Skipped { path: PathBuf },
}

impl FixtureOutcome {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created { path, .. } | Self::Skipped { path } => path,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

impl std::fmt::Display for FixtureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created { path, rows } => write!(f, "created {} ({rows} rows)", path.display()),
            Self::Skipped { path } => write!(f, "kept existing {}", path.display()),
        }
    }
}

/// Row counts and seed for a fixture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureOptions {
    /// Fixed seed for reproducible output; OS entropy when `None`.
    pub seed: Option<u64>,
    pub accidents: usize,
    pub containers: usize,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            seed: None,
            accidents: 200,
            containers: 100,
        }
    }
}

impl FixtureOptions {
    /// Random number generator for this run.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
    }
}

/// Generates both input files where they are missing.
///
/// # Errors
///
/// Returns [`FixtureError`] if a missing file cannot be written. A file that
/// already exists is reported as [`FixtureOutcome::Skipped`], not an error.
pub fn generate_inputs(
    accidents_path: &Path,
    containers_path: &Path,
    options: &FixtureOptions,
) -> Result<Vec<FixtureOutcome>, FixtureError> {
    let mut rng = options.rng();
    let outcomes = vec![
        generate_accidents(accidents_path, options.accidents, &mut rng)?,
        generate_containers(containers_path, options.containers, &mut rng)?,
    ];
    for outcome in &outcomes {
        log::info!("Fixture {outcome}");
    }
    Ok(outcomes)
}

/// Opens `path` for writing only if it does not exist yet.
///
/// Returns `Ok(None)` when the file already exists. The existence check and
/// the creation are a single operation, so a concurrently created file is
/// never truncated.
fn create_new(path: &Path) -> Result<Option<File>, FixtureError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    match File::create_new(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Runs `write` against a freshly created file, removing the file again if
/// writing fails so a later run can retry.
fn write_new<F>(path: &Path, rows: usize, write: F) -> Result<FixtureOutcome, FixtureError>
where
    F: FnOnce(File) -> Result<(), FixtureError>,
{
    let Some(file) = create_new(path)? else {
        log::info!("{} already exists, not generating", path.display());
        return Ok(FixtureOutcome::Skipped {
            path: path.to_path_buf(),
        });
    };

    if let Err(e) = write(file) {
        let _ = fs::remove_file(path);
        return Err(e);
    }

    Ok(FixtureOutcome::Created {
        path: path.to_path_buf(),
        rows,
    })
}
