#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Waste container inventory types.
//!
//! The inventory lists every street container with its category
//! (`Tipo Contenedor`), geographic position and model description. Only the
//! four categories in [`ContainerType`] are mapped; rows with any other
//! category are kept as raw labels so their exclusion stays observable.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Container category.
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
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE")]
pub enum ContainerType {
    /// Glass
    Vidrio,
    /// Plastic packaging and cans
    Envases,
    /// Paper and cardboard
    PapelCarton,
    /// Organic waste
    Organica,
}

impl ContainerType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Vidrio, Self::Envases, Self::PapelCarton, Self::Organica]
    }

    /// Marker color used when no color map overrides it.
    #[must_use]
    pub const fn default_color(self) -> &'static str {
        match self {
            Self::Vidrio => "green",
            Self::Envases => "orange",
            Self::PapelCarton => "blue",
            Self::Organica => "red",
        }
    }

    /// Name of the clustered-marker layer for this category.
    #[must_use]
    pub const fn cluster_layer_name(self) -> &'static str {
        match self {
            Self::Vidrio => "Contenedores Vidrio",
            Self::Envases => "Contenedores envases",
            Self::PapelCarton => "Contenedores papel",
            Self::Organica => "Contenedores organico",
        }
    }
}

/// One row of the container inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    /// Raw `Tipo Contenedor` label, trimmed.
    pub type_label: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `Descripcion Modelo`, shown in the marker popup.
    pub description: String,
}

impl ContainerRecord {
    /// Parsed category, or `None` if the label is not one of the four
    /// known types.
    #[must_use]
    pub fn container_type(&self) -> Option<ContainerType> {
        self.type_label.parse().ok()
    }
}
