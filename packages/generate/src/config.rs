//! Run configuration.
//!
//! The defaults live in `config/default.toml`, embedded at compile time. A
//! user file passed with `--config` is parsed the same way; any key it
//! leaves out keeps its default value, except `coordinate_precision`, whose
//! absence selects exact coordinate matching.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use madrid_map_aggregate::AccidentFilter;
use madrid_map_aggregate::heat::{DEFAULT_PRECISION, MAX_PRECISION};
use madrid_map_container_models::ContainerType;
use madrid_map_fixtures::FixtureOptions;
use madrid_map_render::{MapOptions, TileProvider, TimeHeatOptions};
use serde::{Deserialize, Serialize};

/// The embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Highest zoom level accepted for a map.
const MAX_ZOOM: u8 = 22;

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has a mistyped value.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Input file names, relative to [`GenerateConfig::data_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub accidents: PathBuf,
    pub containers: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            accidents: PathBuf::from("2023_Accidentalidad.xlsx"),
            containers: PathBuf::from("Contenedores_varios.csv"),
        }
    }
}

/// Output file names, relative to [`GenerateConfig::output_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub accidents: PathBuf,
    pub containers: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            accidents: PathBuf::from("accidentes_madrid.html"),
            containers: PathBuf::from("contenedores_madrid.html"),
        }
    }
}

/// Heat point radius per map, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatRadius {
    pub accidents: f64,
    pub containers: f64,
}

impl Default for HeatRadius {
    fn default() -> Self {
        Self {
            accidents: 30.0,
            containers: 15.0,
        }
    }
}

/// Accident time heatmap settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccidentMapConfig {
    pub title: String,
    /// `[latitude, longitude]`
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileProvider,
    pub control_scale: bool,
    /// Name of the time heat layer in the layer control.
    pub layer_name: String,
    pub min_opacity: f64,
    pub max_opacity: f64,
    pub use_local_extrema: bool,
    pub auto_play: bool,
}

impl Default for AccidentMapConfig {
    fn default() -> Self {
        Self {
            title: "Accidentes de tráfico en Madrid 2023".to_string(),
            center: [40.43, -3.65],
            zoom: 12,
            tiles: TileProvider::CartoDbPositron,
            control_scale: true,
            layer_name: "Accidentes_Turismo_2023".to_string(),
            min_opacity: 0.5,
            max_opacity: 1.0,
            use_local_extrema: true,
            auto_play: false,
        }
    }
}

impl AccidentMapConfig {
    #[must_use]
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            title: self.title.clone(),
            center: self.center,
            zoom: self.zoom,
            tiles: self.tiles,
            control_scale: self.control_scale,
        }
    }
}

/// Container map settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerMapConfig {
    pub title: String,
    /// `[latitude, longitude]`
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileProvider,
    pub control_scale: bool,
    /// Glyph drawn on every container marker.
    pub icon: String,
    /// Types that also get a static heat layer, in layer order.
    pub heat_types: Vec<ContainerType>,
}

impl Default for ContainerMapConfig {
    fn default() -> Self {
        Self {
            title: "Contenedores de residuos en Madrid".to_string(),
            center: [40.43, -3.65],
            zoom: 12,
            tiles: TileProvider::OpenStreetMap,
            control_scale: false,
            icon: "info-sign".to_string(),
            heat_types: vec![ContainerType::Envases, ContainerType::Vidrio],
        }
    }
}

impl ContainerMapConfig {
    #[must_use]
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            title: self.title.clone(),
            center: self.center,
            zoom: self.zoom,
            tiles: self.tiles,
            control_scale: self.control_scale,
        }
    }
}

/// Everything a run needs, passed explicitly into each pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Decimal places used when merging accidents at the same spot. Unlike
    /// other keys, leaving it out of a file means exact matching.
    #[serde(default)]
    pub coordinate_precision: Option<u32>,
    pub input_paths: InputPaths,
    pub output_paths: OutputPaths,
    pub filter_predicate: AccidentFilter,
    pub heat_radius: HeatRadius,
    /// Container type label (e.g. `PAPEL-CARTON`) → marker color.
    pub color_map: BTreeMap<String, String>,
    pub accident_map: AccidentMapConfig,
    pub container_map: ContainerMapConfig,
    pub fixtures: FixtureOptions,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("assets/data"),
            output_dir: PathBuf::from("assets/mapas"),
            coordinate_precision: Some(DEFAULT_PRECISION),
            input_paths: InputPaths::default(),
            output_paths: OutputPaths::default(),
            filter_predicate: AccidentFilter::default(),
            heat_radius: HeatRadius::default(),
            color_map: ContainerType::all()
                .iter()
                .map(|t| (t.to_string(), t.default_color().to_string()))
                .collect(),
            accident_map: AccidentMapConfig::default(),
            container_map: ContainerMapConfig::default(),
            fixtures: FixtureOptions::default(),
        }
    }
}

impl GenerateConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the TOML is malformed or mistyped
    /// * [`ConfigError::Invalid`] if a value is out of range
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] only if the embedded file is broken.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Loads the file at `path`, or the embedded defaults when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::embedded();
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges that the TOML types cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        for (name, radius) in [
            ("heat_radius.accidents", self.heat_radius.accidents),
            ("heat_radius.containers", self.heat_radius.containers),
        ] {
            if !(radius.is_finite() && radius > 0.0) {
                return invalid(format!("{name} must be positive, got {radius}"));
            }
        }

        let (min, max) = (self.accident_map.min_opacity, self.accident_map.max_opacity);
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return invalid(format!(
                "opacity bounds must satisfy 0 <= min_opacity <= max_opacity <= 1, got {min}..{max}"
            ));
        }

        for (name, zoom, center) in [
            ("accident_map", self.accident_map.zoom, self.accident_map.center),
            ("container_map", self.container_map.zoom, self.container_map.center),
        ] {
            if zoom > MAX_ZOOM {
                return invalid(format!("{name}.zoom must be at most {MAX_ZOOM}, got {zoom}"));
            }
            let [lat, lon] = center;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return invalid(format!("{name}.center is not a valid position: [{lat}, {lon}]"));
            }
        }

        if let Some(precision) = self.coordinate_precision.filter(|&p| p > MAX_PRECISION) {
            return invalid(format!(
                "coordinate_precision must be at most {MAX_PRECISION}, got {precision}"
            ));
        }

        for key in self.color_map.keys() {
            if key.parse::<ContainerType>().is_err() {
                return invalid(format!("color_map key '{key}' is not a container type"));
            }
        }

        if self.accident_map.layer_name.trim().is_empty() {
            return invalid("accident_map.layer_name must not be empty".to_string());
        }

        let outputs = [
            ("output_paths.accidents", self.accidents_output()),
            ("output_paths.containers", self.containers_output()),
        ];
        if outputs[0].1 == outputs[1].1 {
            return invalid(format!(
                "both maps would be written to {}",
                outputs[0].1.display()
            ));
        }
        for (name, output) in &outputs {
            for input in [self.accidents_input(), self.containers_input()] {
                if *output == input {
                    return invalid(format!("{name} would overwrite the input {}", input.display()));
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn accidents_input(&self) -> PathBuf {
        self.data_dir.join(&self.input_paths.accidents)
    }

    #[must_use]
    pub fn containers_input(&self) -> PathBuf {
        self.data_dir.join(&self.input_paths.containers)
    }

    #[must_use]
    pub fn accidents_output(&self) -> PathBuf {
        self.output_dir.join(&self.output_paths.accidents)
    }

    #[must_use]
    pub fn containers_output(&self) -> PathBuf {
        self.output_dir.join(&self.output_paths.containers)
    }

    /// Marker color for `container_type`, falling back to its built-in
    /// color when the color map has no entry.
    #[must_use]
    pub fn marker_color(&self, container_type: ContainerType) -> &str {
        self.color_map
            .get(container_type.as_ref())
            .map_or(container_type.default_color(), String::as_str)
    }

    /// Display settings of the accident time heat layer.
    #[must_use]
    pub const fn time_heat_options(&self) -> TimeHeatOptions {
        TimeHeatOptions {
            radius: self.heat_radius.accidents,
            min_opacity: self.accident_map.min_opacity,
            max_opacity: self.accident_map.max_opacity,
            use_local_extrema: self.accident_map.use_local_extrema,
            auto_play: self.accident_map.auto_play,
        }
    }
}

#[cfg(test)]
mod tests {
    use madrid_map_accident_models::{Sex, VehicleType};

    use super::*;

    #[test]
    fn embedded_defaults_match_code_defaults() {
        assert_eq!(GenerateConfig::embedded().unwrap(), GenerateConfig::default());
    }

    #[test]
    fn embedded_defaults_reproduce_original_maps() {
        let config = GenerateConfig::embedded().unwrap();

        assert_eq!(config.accidents_input(), Path::new("assets/data/2023_Accidentalidad.xlsx"));
        assert_eq!(config.containers_output(), Path::new("assets/mapas/contenedores_madrid.html"));
        assert_eq!(config.filter_predicate.sex, Some(Sex::Mujer));
        assert_eq!(config.filter_predicate.excluded_vehicle_types, vec![VehicleType::Turismo]);
        assert_eq!(config.accident_map.tiles, TileProvider::CartoDbPositron);
        assert_eq!(config.marker_color(ContainerType::PapelCarton), "blue");
        assert_eq!(config.coordinate_precision, Some(6));

        let time = config.time_heat_options();
        assert!((time.radius - 30.0).abs() < f64::EPSILON);
        assert!(time.use_local_extrema && !time.auto_play);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = GenerateConfig::from_toml(
            r#"
            output_dir = "out"

            [color_map]
            VIDRIO = "darkgreen"

            [container_map]
            heat_types = ["ORGANICA"]
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, Path::new("out"));
        assert_eq!(config.data_dir, Path::new("assets/data"));
        assert_eq!(config.marker_color(ContainerType::Vidrio), "darkgreen");
        assert_eq!(config.marker_color(ContainerType::Envases), "orange");
        assert_eq!(config.container_map.heat_types, vec![ContainerType::Organica]);
        assert_eq!(config.container_map.icon, "info-sign");
        assert_eq!(config.container_map.tiles, TileProvider::OpenStreetMap);
        assert_eq!(config.coordinate_precision, None);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for text in [
            "[heat_radius]\naccidents = 0.0",
            "[accident_map]\nmin_opacity = 0.8\nmax_opacity = 0.2",
            "[accident_map]\nmax_opacity = 1.5",
            "[container_map]\nzoom = 30",
            "coordinate_precision = 20",
            "[color_map]\nRESTO = \"gray\"",
        ] {
            assert!(
                matches!(GenerateConfig::from_toml(text), Err(ConfigError::Invalid(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn rejects_colliding_output_paths() {
        let err = GenerateConfig::from_toml(
            "[output_paths]\naccidents = \"mapa.html\"\ncontainers = \"mapa.html\"",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("both maps")));
    }

    #[test]
    fn rejects_output_over_an_input() {
        let text = r#"
            data_dir = "datos"
            output_dir = "datos"

            [output_paths]
            containers = "Contenedores_varios.csv"
        "#;
        let err = GenerateConfig::from_toml(text).unwrap_err();
        assert!(
            matches!(&err, ConfigError::Invalid(msg) if msg.contains("output_paths.containers")),
            "{err}"
        );

        let mut config = GenerateConfig::default();
        config.output_dir = config.data_dir.clone();
        config.output_paths.accidents = config.input_paths.accidents.clone();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_heat_type() {
        assert!(matches!(
            GenerateConfig::from_toml("[container_map]\nheat_types = [\"RESTO\"]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GenerateConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
