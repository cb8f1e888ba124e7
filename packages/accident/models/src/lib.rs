#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic accident record types.
//!
//! An [`AccidentRecord`] is one row of the municipal accident register with
//! its projected (UTM) coordinates. Reprojection produces a separate
//! [`GeoAccidentRecord`] carrying geographic coordinates and the calendar
//! month used to bucket the time-slider heatmap.

use std::fmt;

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Spanish month names, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Returns the Spanish label for a 1-based month number.
///
/// Returns `None` for anything outside `1..=12`.
#[must_use]
pub fn month_label(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month.checked_sub(1)?).ok()?;
    MONTH_LABELS.get(index).copied()
}

/// Sex of the person involved, as recorded in the `sexo` column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Sex {
    Mujer,
    Hombre,
    /// The register uses this when the sex was not recorded.
    Desconocido,
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $ty:ident {
            $($variant:ident => [$canonical:literal $(, $alias:literal)*],)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $ty {
            $($variant,)+
            /// Any label not listed above, kept verbatim.
            Other(String),
        }

        impl $ty {
            /// Canonical label as written in the register.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $canonical,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<&str> for $ty {
            /// Matches known labels ignoring ASCII case; never fails.
            fn from(value: &str) -> Self {
                let value = value.trim();
                $(
                    if [$canonical $(, $alias)*]
                        .iter()
                        .any(|label| label.eq_ignore_ascii_case(value))
                    {
                        return Self::$variant;
                    }
                )+
                Self::Other(value.to_owned())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_owned()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Role of the person involved (`tipo_persona`).
    pub enum PersonType {
        Conductor => ["Conductor"],
        Peaton => ["Peatón", "Peaton"],
        Pasajero => ["Pasajero"],
        Testigo => ["Testigo"],
    }
}

labelled_enum! {
    /// Vehicle category (`tipo_vehiculo`).
    ///
    /// The register has dozens of categories; unlisted ones stay in
    /// [`VehicleType::Other`] so predicates can still match on them.
    pub enum VehicleType {
        Turismo => ["Turismo"],
        Bicicleta => ["Bicicleta"],
        Motocicleta => ["Motocicleta"],
        Furgoneta => ["Furgoneta"],
        Autobus => ["Autobus", "Autobús"],
    }
}

/// One row of the accident register.
///
/// Coordinates are mandatory: rows without both UTM values are dropped by
/// the loader and never become an `AccidentRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRecord {
    /// Easting in meters (UTM zone 30N).
    pub x_utm: f64,
    /// Northing in meters (UTM zone 30N).
    pub y_utm: f64,
    pub person_type: PersonType,
    pub vehicle_type: VehicleType,
    pub sex: Sex,
    /// Date of the accident.
    pub date: NaiveDate,
    /// Case file number (`num_expediente`). Several rows share one case
    /// when more than one person was involved.
    pub case_id: String,
}

/// An [`AccidentRecord`] with geographic coordinates and its calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoAccidentRecord {
    pub accident: AccidentRecord,
    /// Longitude in degrees (ETRS89).
    pub longitude: f64,
    /// Latitude in degrees (ETRS89).
    pub latitude: f64,
    /// Month of [`AccidentRecord::date`], `1..=12`.
    pub month: u32,
}

impl GeoAccidentRecord {
    /// Derives a geographic record from a source row and its reprojected
    /// coordinates. The source row is copied, never mutated.
    #[must_use]
    pub fn new(accident: &AccidentRecord, longitude: f64, latitude: f64) -> Self {
        Self {
            month: accident.date.month(),
            accident: accident.clone(),
            longitude,
            latitude,
        }
    }

    /// Spanish label of [`Self::month`].
    #[must_use]
    pub fn month_label(&self) -> &'static str {
        // `month` comes from a valid `NaiveDate`, so it is always 1..=12.
        month_label(self.month).unwrap_or("")
    }
}
