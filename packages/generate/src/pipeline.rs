//! The accident and container map pipelines.
//!
//! Each pipeline runs Load → Transform → Filter → Aggregate → Render →
//! Persist on its own input and output, sharing nothing with the other.
//! [`run_pipelines`] gives every pipeline its own error boundary, so one
//! failing never stops the next from being attempted.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use madrid_map_accident_models::{AccidentRecord, GeoAccidentRecord};
use madrid_map_aggregate::{ContainerPartition, MonthlyHeatFrame, monthly_frames, partition_containers};
use madrid_map_container_models::ContainerType;
use madrid_map_fixtures::FixtureError;
use madrid_map_loader::DataLoadError;
use madrid_map_loader::accidents::load_accidents;
use madrid_map_loader::containers::load_containers;
use madrid_map_loader::progress::ProgressCallback;
use madrid_map_projection::CoordinateTransformer;
use madrid_map_render::{
    ClusterLayer, HeatLayer, MapDocument, Marker, RenderError, TimeHeatLayer, WriteError,
    save_document,
};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::config::GenerateConfig;

/// Cluster layers in the order they are stacked on the container map.
const CLUSTER_ORDER: [ContainerType; 4] = [
    ContainerType::Vidrio,
    ContainerType::Envases,
    ContainerType::Organica,
    ContainerType::PapelCarton,
];

/// Errors that abort a single pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] DataLoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// One of the two map pipelines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Pipeline {
    Accidents,
    Containers,
}

impl Pipeline {
    pub const ALL: [Self; 2] = [Self::Accidents, Self::Containers];
}

// ── Accidents ────────────────────────────────────────────────────

/// What the accident pipeline did.
#[derive(Debug, Clone, PartialEq)]
pub struct AccidentReport {
    pub output: PathBuf,
    /// Data rows in the input.
    pub rows: usize,
    pub missing_coordinates: usize,
    pub invalid_rows: usize,
    pub projection_failures: usize,
    /// Rows matching the filter.
    pub selected: usize,
    pub frames: Vec<MonthlyHeatFrame>,
}

impl fmt::Display for AccidentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let months: Vec<&str> = self.frames.iter().map(|frame| frame.label.as_str()).collect();
        write!(
            f,
            "{} of {} rows selected, {} months [{}] -> {}",
            self.selected,
            self.rows,
            self.frames.len(),
            months.join(", "),
            self.output.display()
        )
    }
}

/// Reprojects every record, dropping the ones that fail.
///
/// Returns the reprojected records in input order and the number dropped.
#[must_use]
pub fn reproject(
    records: &[AccidentRecord],
    transformer: &CoordinateTransformer,
) -> (Vec<GeoAccidentRecord>, usize) {
    let pairs: Vec<(f64, f64)> = records.iter().map(|r| (r.x_utm, r.y_utm)).collect();
    let mut failures = 0;

    let geo = records
        .iter()
        .zip(transformer.transform_all(&pairs))
        .filter_map(|(record, result)| match result {
            Ok(point) => Some(GeoAccidentRecord::new(record, point.x(), point.y())),
            Err(e) => {
                failures += 1;
                log::debug!("Case {}: {e}", record.case_id);
                None
            }
        })
        .collect();

    (geo, failures)
}

/// Filters reprojected records and buckets them into monthly frames.
#[must_use]
pub fn accident_frames(
    records: &[GeoAccidentRecord],
    config: &GenerateConfig,
) -> (usize, Vec<MonthlyHeatFrame>) {
    let selected = config.filter_predicate.apply(records);
    let frames = monthly_frames(&selected, config.coordinate_precision);
    for frame in &frames {
        log::debug!(
            "{}: {} points, weight {}",
            frame.label,
            frame.points.len(),
            frame.total_weight()
        );
    }
    (selected.len(), frames)
}

/// Builds the accident map: one time heat layer and the layer control.
///
/// # Errors
///
/// Returns [`RenderError`] if the layer cannot be registered.
pub fn accident_document(
    frames: &[MonthlyHeatFrame],
    config: &GenerateConfig,
) -> Result<MapDocument, RenderError> {
    let mut document = MapDocument::new(config.accident_map.map_options());
    document
        .add_layer(TimeHeatLayer::from_monthly(
            config.accident_map.layer_name.clone(),
            frames,
            config.time_heat_options(),
        ))?
        .add_layer_control();
    Ok(document)
}

/// Runs the accident pipeline end to end.
///
/// # Errors
///
/// Returns [`PipelineError`] if the input cannot be loaded or the map
/// cannot be rendered or written. Bad rows are counted, not fatal.
pub fn run_accidents(
    config: &GenerateConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AccidentReport, PipelineError> {
    let input = config.accidents_input();
    log::info!("Loading accidents from {}", input.display());
    let load = load_accidents(&input, progress)?;

    let transformer = CoordinateTransformer::utm30n_to_etrs89();
    let (geo, projection_failures) = reproject(&load.records, &transformer);
    if projection_failures > 0 {
        log::warn!(
            "Dropped {projection_failures} accident rows that could not be reprojected from {} to {}",
            transformer.source_crs(),
            transformer.target_crs()
        );
    }

    let (selected, frames) = accident_frames(&geo, config);
    if frames.is_empty() {
        log::warn!("No accident rows match {}; the map will be empty", config.filter_predicate);
    }

    let output = config.accidents_output();
    save_document(&accident_document(&frames, config)?, &output)?;

    Ok(AccidentReport {
        output,
        rows: load.total_rows(),
        missing_coordinates: load.missing_coordinates,
        invalid_rows: load.rejected.len(),
        projection_failures,
        selected,
        frames,
    })
}

// ── Containers ───────────────────────────────────────────────────

/// What the container pipeline did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerReport {
    pub output: PathBuf,
    pub rows: usize,
    pub invalid_rows: usize,
    /// Containers per mapped type.
    pub groups: BTreeMap<ContainerType, usize>,
    /// Rows left out because of an unknown type.
    pub unrecognized: usize,
}

impl fmt::Display for ContainerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|(container_type, count)| format!("{container_type} {count}"))
            .collect();
        write!(
            f,
            "{} rows [{}], {} unrecognized -> {}",
            self.rows,
            groups.join(", "),
            self.unrecognized,
            self.output.display()
        )
    }
}

/// Builds the container map: a cluster layer per type, heat layers for the
/// configured types, and the layer control.
///
/// # Errors
///
/// Returns [`RenderError`] if a layer cannot be registered (e.g. a heat
/// type listed twice).
pub fn container_document(
    partition: &ContainerPartition,
    config: &GenerateConfig,
) -> Result<MapDocument, RenderError> {
    let map = &config.container_map;
    let mut document = MapDocument::new(map.map_options());

    for container_type in CLUSTER_ORDER {
        let color = config.marker_color(container_type);
        let markers: Vec<Marker> = partition
            .group(container_type)
            .map(|group| {
                group
                    .records
                    .iter()
                    .map(|record| Marker {
                        latitude: record.latitude,
                        longitude: record.longitude,
                        color: color.to_owned(),
                        icon: map.icon.clone(),
                        popup: record.description.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        document.add_layer(ClusterLayer {
            name: container_type.cluster_layer_name().to_owned(),
            markers,
        })?;
    }

    for &container_type in &map.heat_types {
        document.add_layer(HeatLayer {
            name: format!("Mapa de calor {container_type}"),
            points: partition
                .group(container_type)
                .map(|group| group.heat_points())
                .unwrap_or_default(),
            radius: config.heat_radius.containers,
        })?;
    }

    document.add_layer_control();
    Ok(document)
}

/// Runs the container pipeline end to end.
///
/// # Errors
///
/// Returns [`PipelineError`] if the input cannot be loaded or the map
/// cannot be rendered or written.
pub fn run_containers(
    config: &GenerateConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ContainerReport, PipelineError> {
    let input = config.containers_input();
    log::info!("Loading containers from {}", input.display());
    let load = load_containers(&input, progress)?;

    let partition = partition_containers(&load.records);

    let output = config.containers_output();
    save_document(&container_document(&partition, config)?, &output)?;

    Ok(ContainerReport {
        output,
        rows: load.records.len() + load.rejected.len(),
        invalid_rows: load.rejected.len(),
        groups: partition
            .groups
            .iter()
            .map(|(container_type, group)| (*container_type, group.len()))
            .collect(),
        unrecognized: partition.unrecognized_count(),
    })
}

// ── Orchestration ────────────────────────────────────────────────

/// Result of one pipeline within a run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub pipeline: Pipeline,
    /// One-line summary on success.
    pub result: Result<String, PipelineError>,
}

impl PipelineOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(summary) => write!(f, "{}: ok ({summary})", self.pipeline),
            Err(e) => write!(f, "{}: FAILED ({e})", self.pipeline),
        }
    }
}

/// Runs one pipeline inside its own error boundary.
pub fn run_pipeline(
    pipeline: Pipeline,
    config: &GenerateConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> PipelineOutcome {
    let result = match pipeline {
        Pipeline::Accidents => run_accidents(config, progress).map(|report| report.to_string()),
        Pipeline::Containers => run_containers(config, progress).map(|report| report.to_string()),
    };

    match &result {
        Ok(summary) => log::info!("{pipeline} map generated: {summary}"),
        Err(e) => log::error!("{pipeline} map failed: {e}"),
    }

    PipelineOutcome { pipeline, result }
}

/// Runs each of `pipelines` in order. A failure is recorded in its outcome
/// and the remaining pipelines still run.
pub fn run_pipelines(
    pipelines: &[Pipeline],
    config: &GenerateConfig,
    progress_for: impl Fn(Pipeline) -> Arc<dyn ProgressCallback>,
) -> Vec<PipelineOutcome> {
    pipelines
        .iter()
        .map(|&pipeline| run_pipeline(pipeline, config, &progress_for(pipeline)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use madrid_map_accident_models::{PersonType, Sex, VehicleType};
    use madrid_map_container_models::ContainerRecord;
    use madrid_map_render::LayerKind;

    use super::*;

    fn accident(x: f64, y: f64, sex: Sex, vehicle: VehicleType, month: u32) -> AccidentRecord {
        AccidentRecord {
            x_utm: x,
            y_utm: y,
            person_type: PersonType::Conductor,
            vehicle_type: vehicle,
            sex,
            date: NaiveDate::from_ymd_opt(2023, month, 10).unwrap(),
            case_id: format!("2023S{month:04}"),
        }
    }

    #[test]
    fn reprojection_drops_only_failing_rows() {
        let records = vec![
            accident(440_290.458, 4_474_257.382, Sex::Mujer, VehicleType::Bicicleta, 1),
            accident(f64::NAN, 4_470_000.0, Sex::Mujer, VehicleType::Bicicleta, 2),
            accident(441_000.0, 4_471_000.0, Sex::Mujer, VehicleType::Bicicleta, 3),
        ];
        let (geo, failures) = reproject(&records, &CoordinateTransformer::default());

        assert_eq!(failures, 1);
        assert_eq!(geo.len(), 2);
        assert_eq!(geo[0].accident, records[0]);
        assert_eq!(geo[1].accident, records[2]);
        assert!((geo[0].longitude - -3.7038).abs() < 1e-6);
        assert!((geo[0].latitude - 40.4168).abs() < 1e-6);
    }

    #[test]
    fn frames_follow_the_configured_filter() {
        let config = GenerateConfig::default();
        let records = vec![
            accident(440_000.0, 4_470_000.0, Sex::Mujer, VehicleType::Motocicleta, 3),
            accident(440_000.0, 4_470_000.0, Sex::Mujer, VehicleType::Turismo, 3),
            accident(440_000.0, 4_470_000.0, Sex::Hombre, VehicleType::Motocicleta, 4),
            accident(440_000.0, 4_470_000.0, Sex::Mujer, VehicleType::Autobus, 10),
        ];
        let (geo, _) = reproject(&records, &CoordinateTransformer::default());
        let (selected, frames) = accident_frames(&geo, &config);

        assert_eq!(selected, 2);
        let labels: Vec<&str> = frames.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Marzo", "Octubre"]);
    }

    #[test]
    fn accident_document_has_one_time_layer() {
        let config = GenerateConfig::default();
        let manifest = accident_document(&[], &config).unwrap().manifest();

        assert_eq!(manifest.layers.len(), 1);
        assert_eq!(manifest.layers[0].kind, LayerKind::HeatMapWithTime);
        assert_eq!(manifest.layers[0].name, "Accidentes_Turismo_2023");
        assert!(manifest.layer_control);
    }

    #[test]
    fn container_document_uses_configured_colors_and_heat_types() {
        let mut config = GenerateConfig::default();
        config.color_map.insert("ENVASES".to_string(), "purple".to_string());
        config.container_map.heat_types = vec![ContainerType::Organica];

        let partition = partition_containers(&[ContainerRecord {
            type_label: "ENVASES".to_string(),
            latitude: 40.42,
            longitude: -3.70,
            description: "Contenedor ENVASES Modelo X".to_string(),
        }]);
        let document = container_document(&partition, &config).unwrap();
        let manifest = document.manifest();

        assert_eq!(
            manifest.names(LayerKind::MarkerCluster),
            vec![
                "Contenedores Vidrio",
                "Contenedores envases",
                "Contenedores organico",
                "Contenedores papel",
            ]
        );
        assert_eq!(manifest.names(LayerKind::HeatMap), vec!["Mapa de calor ORGANICA"]);

        let madrid_map_render::Layer::Cluster(envases) = &document.layers()[1] else {
            panic!("expected a cluster layer");
        };
        assert_eq!(envases.markers[0].color, "purple");
        assert_eq!(envases.markers[0].popup, "Contenedor ENVASES Modelo X");
    }

    #[test]
    fn duplicate_heat_type_is_a_render_error() {
        let mut config = GenerateConfig::default();
        config.container_map.heat_types = vec![ContainerType::Vidrio, ContainerType::Vidrio];
        let partition = partition_containers(&[]);

        assert!(matches!(
            container_document(&partition, &config),
            Err(RenderError::DuplicateLayer(_))
        ));
    }
}
