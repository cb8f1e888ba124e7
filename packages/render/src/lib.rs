#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layered map documents.
//!
//! A [`MapDocument`] is a base map (center, zoom, tile provider) plus an
//! ordered list of overlay [`Layer`]s:
//!
//! - [`TimeHeatLayer`]: one heat frame per time step, animated by a slider.
//! - [`HeatLayer`]: a single static heat layer.
//! - [`ClusterLayer`]: point markers grouped into expandable clusters.
//!
//! Building a document is purely in-memory. [`html::render`] turns it into a
//! standalone Leaflet page and [`persist::save_document`] writes that page
//! to disk. Every rendered page embeds a [`LayerManifest`] describing its
//! layers so the output can be inspected without a browser.

pub mod html;
pub mod persist;

use madrid_map_aggregate::{MonthlyHeatFrame, WeightedPoint, frame_labels};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use persist::{WriteError, save_document, write_atomic};

/// Errors raised while assembling or inspecting a map document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A time heat layer has a different number of frames and labels.
    #[error("time layer '{name}' has {frames} frames but {labels} labels")]
    FrameLabelMismatch {
        name: String,
        frames: usize,
        labels: usize,
    },

    /// Two overlays share a name, which the layer control cannot tell apart.
    #[error("duplicate layer name '{0}'")]
    DuplicateLayer(String),

    /// A layer was added after the layer control was finalized.
    #[error("cannot add layer '{0}' after the layer control")]
    LayerControlFinalized(String),

    /// The HTML does not contain an embedded layer manifest.
    #[error("no layer manifest found in document")]
    ManifestMissing,

    /// The embedded layer manifest is not valid JSON.
    #[error("invalid layer manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

// ── Base map ─────────────────────────────────────────────────────

/// Base tile provider.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TileProvider {
    #[serde(rename = "OpenStreetMap")]
    #[strum(serialize = "OpenStreetMap")]
    OpenStreetMap,
    #[serde(rename = "CartoDB positron")]
    #[strum(serialize = "CartoDB positron")]
    CartoDbPositron,
}

impl TileProvider {
    /// Leaflet URL template for the tiles.
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            Self::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
        }
    }

    #[must_use]
    pub const fn attribution(self) -> &'static str {
        match self {
            Self::OpenStreetMap => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
            Self::CartoDbPositron => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>"
            }
        }
    }
}

/// Base map settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Page title.
    pub title: String,
    /// Initial center as `[latitude, longitude]`.
    pub center: [f64; 2],
    /// Initial zoom level.
    pub zoom: u8,
    pub tiles: TileProvider,
    /// Show a metric/imperial scale bar.
    pub control_scale: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            title: "Madrid".to_string(),
            center: [40.43, -3.65],
            zoom: 12,
            tiles: TileProvider::OpenStreetMap,
            control_scale: false,
        }
    }
}

// ── Layers ───────────────────────────────────────────────────────

/// Display settings of a time-sliced heat layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeHeatOptions {
    /// Heat point radius in pixels.
    pub radius: f64,
    pub min_opacity: f64,
    pub max_opacity: f64,
    /// Scale colors against each frame's own maximum instead of the
    /// maximum across all frames.
    pub use_local_extrema: bool,
    /// Start animating as soon as the page loads.
    pub auto_play: bool,
}

impl Default for TimeHeatOptions {
    fn default() -> Self {
        Self {
            radius: 30.0,
            min_opacity: 0.5,
            max_opacity: 1.0,
            use_local_extrema: true,
            auto_play: false,
        }
    }
}

/// Heat layer with one frame per time step and a slider to move between
/// them. `index[i]` labels `frames[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeHeatLayer {
    name: String,
    frames: Vec<Vec<WeightedPoint>>,
    index: Vec<String>,
    options: TimeHeatOptions,
}

impl TimeHeatLayer {
    /// # Errors
    ///
    /// Returns [`RenderError::FrameLabelMismatch`] if `frames` and `index`
    /// differ in length.
    pub fn new(
        name: impl Into<String>,
        frames: Vec<Vec<WeightedPoint>>,
        index: Vec<String>,
        options: TimeHeatOptions,
    ) -> Result<Self, RenderError> {
        let name = name.into();
        if frames.len() != index.len() {
            return Err(RenderError::FrameLabelMismatch {
                name,
                frames: frames.len(),
                labels: index.len(),
            });
        }
        Ok(Self {
            name,
            frames,
            index,
            options,
        })
    }

    /// Builds the layer from monthly frames, labelling each frame with its
    /// own month.
    #[must_use]
    pub fn from_monthly(
        name: impl Into<String>,
        frames: &[MonthlyHeatFrame],
        options: TimeHeatOptions,
    ) -> Self {
        Self {
            name: name.into(),
            frames: frames.iter().map(|f| f.points.clone()).collect(),
            index: frame_labels(frames),
            options,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn frames(&self) -> &[Vec<WeightedPoint>] {
        &self.frames
    }

    #[must_use]
    pub fn index(&self) -> &[String] {
        &self.index
    }

    #[must_use]
    pub const fn options(&self) -> &TimeHeatOptions {
        &self.options
    }
}

/// Static heat layer.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatLayer {
    pub name: String,
    pub points: Vec<WeightedPoint>,
    /// Heat point radius in pixels.
    pub radius: f64,
}

/// One clickable map marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    /// Marker body color (a Leaflet.awesome-markers color name).
    pub color: String,
    /// Glyph drawn on the marker.
    pub icon: String,
    /// Plain text shown when the marker is clicked.
    pub popup: String,
}

/// Markers grouped into clusters at low zoom levels.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLayer {
    pub name: String,
    pub markers: Vec<Marker>,
}

/// Kind of overlay layer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerKind {
    HeatMapWithTime,
    HeatMap,
    MarkerCluster,
}

/// An overlay layer of a [`MapDocument`].
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    TimeHeat(TimeHeatLayer),
    Heat(HeatLayer),
    Cluster(ClusterLayer),
}

impl Layer {
    #[must_use]
    pub const fn kind(&self) -> LayerKind {
        match self {
            Self::TimeHeat(_) => LayerKind::HeatMapWithTime,
            Self::Heat(_) => LayerKind::HeatMap,
            Self::Cluster(_) => LayerKind::MarkerCluster,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::TimeHeat(layer) => &layer.name,
            Self::Heat(layer) => &layer.name,
            Self::Cluster(layer) => &layer.name,
        }
    }

    /// Number of points (summed over frames) or markers.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::TimeHeat(layer) => layer.frames.iter().map(Vec::len).sum(),
            Self::Heat(layer) => layer.points.len(),
            Self::Cluster(layer) => layer.markers.len(),
        }
    }

    fn summary(&self) -> LayerSummary {
        LayerSummary {
            kind: self.kind(),
            name: self.name().to_owned(),
            size: self.size(),
            labels: match self {
                Self::TimeHeat(layer) => layer.index.clone(),
                Self::Heat(_) | Self::Cluster(_) => Vec::new(),
            },
        }
    }
}

impl From<TimeHeatLayer> for Layer {
    fn from(layer: TimeHeatLayer) -> Self {
        Self::TimeHeat(layer)
    }
}

impl From<HeatLayer> for Layer {
    fn from(layer: HeatLayer) -> Self {
        Self::Heat(layer)
    }
}

impl From<ClusterLayer> for Layer {
    fn from(layer: ClusterLayer) -> Self {
        Self::Cluster(layer)
    }
}

// ── Manifest ─────────────────────────────────────────────────────

/// One overlay as listed in a [`LayerManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub kind: LayerKind,
    pub name: String,
    /// Points or markers in the layer.
    pub size: usize,
    /// Slider labels; empty for layers without time steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Machine-readable description of a document's layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerManifest {
    pub tiles: TileProvider,
    pub layer_control: bool,
    pub layers: Vec<LayerSummary>,
}

impl LayerManifest {
    /// Number of layers of `kind`.
    #[must_use]
    pub fn count(&self, kind: LayerKind) -> usize {
        self.layers.iter().filter(|l| l.kind == kind).count()
    }

    #[must_use]
    pub fn names(&self, kind: LayerKind) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| l.name.as_str())
            .collect()
    }
}

// ── Document ─────────────────────────────────────────────────────

/// A base map and its overlay layers, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    options: MapOptions,
    layers: Vec<Layer>,
    layer_control: bool,
}

impl MapDocument {
    #[must_use]
    pub const fn new(options: MapOptions) -> Self {
        Self {
            options,
            layers: Vec::new(),
            layer_control: false,
        }
    }

    /// Registers an overlay layer.
    ///
    /// # Errors
    ///
    /// * [`RenderError::DuplicateLayer`] if a layer with the same name exists
    /// * [`RenderError::LayerControlFinalized`] if the layer control has
    ///   already been added
    pub fn add_layer(&mut self, layer: impl Into<Layer>) -> Result<&mut Self, RenderError> {
        let layer = layer.into();
        if self.layer_control {
            return Err(RenderError::LayerControlFinalized(layer.name().to_owned()));
        }
        if self.layers.iter().any(|l| l.name() == layer.name()) {
            return Err(RenderError::DuplicateLayer(layer.name().to_owned()));
        }
        log::debug!(
            "Adding {} layer '{}' ({} items)",
            layer.kind(),
            layer.name(),
            layer.size()
        );
        self.layers.push(layer);
        Ok(self)
    }

    /// Adds the overlay toggle. Must come after every layer.
    pub const fn add_layer_control(&mut self) -> &mut Self {
        self.layer_control = true;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &MapOptions {
        &self.options
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub const fn has_layer_control(&self) -> bool {
        self.layer_control
    }

    #[must_use]
    pub fn manifest(&self) -> LayerManifest {
        LayerManifest {
            tiles: self.options.tiles,
            layer_control: self.layer_control,
            layers: self.layers.iter().map(Layer::summary).collect(),
        }
    }
}
