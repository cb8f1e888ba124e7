use std::path::Path;

use madrid_map_aggregate::AccidentFilter;
use madrid_map_generate::pipeline::{run_accidents, run_containers};
use madrid_map_generate::{GenerateConfig, Pipeline, all_succeeded, read_layers, run_pipelines};
use madrid_map_loader::progress::null_progress;
use madrid_map_render::LayerKind;

const ACCIDENT_HEADER: &str =
    "coordenada_x_utm;coordenada_y_utm;tipo_persona;tipo_vehiculo;sexo;fecha;num_expediente\n";

const CONTAINER_HEADER: &str = "Tipo Contenedor;LATITUD;LONGITUD;Descripcion Modelo\n";

fn config_in(dir: &Path) -> GenerateConfig {
    let mut config = GenerateConfig::default();
    config.data_dir = dir.join("data");
    config.output_dir = dir.join("mapas");
    config.input_paths.accidents = "accidentes.csv".into();
    config.input_paths.containers = "contenedores.csv".into();
    std::fs::create_dir_all(&config.data_dir).unwrap();
    config
}

fn write_accidents(config: &GenerateConfig, rows: &[&str]) {
    let mut text = ACCIDENT_HEADER.to_string();
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    std::fs::write(config.accidents_input(), text).unwrap();
}

fn write_containers(config: &GenerateConfig, rows: &[&str]) {
    let mut text = CONTAINER_HEADER.to_string();
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    std::fs::write(config.containers_input(), text).unwrap();
}

#[test]
fn same_spot_accidents_in_one_month_merge_into_one_weighted_point() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_accidents(
        &config,
        &[
            "440290.458;4474257.382;Conductor;Bicicleta;Mujer;2023-03-04;2023S0001",
            "440290.458;4474257.382;Conductor;Bicicleta;Mujer;12/03/2023;2023S0002",
            "440290.458;4474257.382;Conductor;Turismo;Mujer;2023-03-05;2023S0003",
            "440290.458;4474257.382;Conductor;Bicicleta;Hombre;2023-06-01;2023S0004",
        ],
    );

    let report = run_accidents(&config, &null_progress()).unwrap();

    assert_eq!(report.rows, 4);
    assert_eq!(report.selected, 2);
    assert_eq!(report.frames.len(), 1);
    assert_eq!(report.frames[0].label, "Marzo");
    assert_eq!(report.frames[0].points.len(), 1);
    let point = report.frames[0].points[0];
    assert!((point.weight - 2.0).abs() < f64::EPSILON);
    assert!((point.latitude - 40.4168).abs() < 1e-5);
    assert!((point.longitude - -3.7038).abs() < 1e-5);

    let manifest = read_layers(&config.accidents_output()).unwrap();
    assert!(manifest.layer_control);
    assert_eq!(manifest.layers.len(), 1);
    assert_eq!(manifest.layers[0].kind, LayerKind::HeatMapWithTime);
    assert_eq!(manifest.layers[0].labels, vec!["Marzo".to_string()]);
}

#[test]
fn rows_without_coordinates_are_counted_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_accidents(
        &config,
        &[
            ";4474257.382;Conductor;Bicicleta;Mujer;2023-01-04;2023S0001",
            "440290.458;4474257.382;Conductor;Bicicleta;Mujer;2023-01-04;2023S0002",
        ],
    );

    let report = run_accidents(&config, &null_progress()).unwrap();

    assert_eq!(report.missing_coordinates, 1);
    assert_eq!(report.selected, 1);
    assert_eq!(report.frames[0].label, "Enero");
}

#[test]
fn blank_sex_rows_reach_a_filter_without_a_sex_clause() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.filter_predicate = AccidentFilter::allow_all();
    write_accidents(
        &config,
        &[
            "440290.458;4474257.382;Conductor;Bicicleta;Mujer;2023-03-04;2023S0001",
            "440290.458;4474257.382;Conductor;Bicicleta;;2023-03-05;2023S0002",
        ],
    );

    let report = run_accidents(&config, &null_progress()).unwrap();

    assert_eq!(report.rows, 2);
    assert_eq!(report.invalid_rows, 0);
    assert_eq!(report.selected, 2);
    assert_eq!(report.frames[0].points.len(), 1);
    assert!((report.frames[0].points[0].weight - 2.0).abs() < f64::EPSILON);
}

#[test]
fn no_matching_accidents_still_writes_an_empty_map() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_accidents(
        &config,
        &["440290.458;4474257.382;Conductor;Turismo;Mujer;2023-03-04;2023S0001"],
    );

    let report = run_accidents(&config, &null_progress()).unwrap();

    assert_eq!(report.selected, 0);
    assert!(report.frames.is_empty());
    let manifest = read_layers(&config.accidents_output()).unwrap();
    assert_eq!(manifest.layers[0].size, 0);
}

#[test]
fn one_container_of_each_type_gives_four_clusters_and_two_heat_layers() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_containers(
        &config,
        &[
            "VIDRIO;40.41;-3.70;Contenedor VIDRIO Modelo X",
            "ENVASES;40.42;-3.71;Contenedor ENVASES Modelo X",
            "PAPEL-CARTON;40.43;-3.72;Contenedor PAPEL-CARTON Modelo X",
            "ORGANICA;40.44;-3.73;Contenedor ORGANICA Modelo X",
            "RESTO;40.45;-3.74;Contenedor RESTO Modelo X",
        ],
    );

    let report = run_containers(&config, &null_progress()).unwrap();
    assert_eq!(report.rows, 5);
    assert_eq!(report.unrecognized, 1);
    assert_eq!(report.groups.values().sum::<usize>(), 4);

    let manifest = read_layers(&config.containers_output()).unwrap();
    assert_eq!(manifest.count(LayerKind::MarkerCluster), 4);
    assert_eq!(
        manifest.names(LayerKind::HeatMap),
        vec!["Mapa de calor ENVASES", "Mapa de calor VIDRIO"]
    );
    assert!(manifest.layers.iter().all(|layer| layer.size == 1));
    assert!(manifest.layer_control);
}

#[test]
fn missing_accident_input_does_not_block_the_container_map() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_containers(&config, &["VIDRIO;40.41;-3.70;Contenedor VIDRIO Modelo X"]);

    let outcomes = run_pipelines(&Pipeline::ALL, &config, |_| null_progress());

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].pipeline, Pipeline::Accidents);
    assert!(!outcomes[0].is_success());
    assert!(outcomes[1].is_success());
    assert!(!all_succeeded(&outcomes));
    assert!(!config.accidents_output().exists());
    assert!(config.containers_output().exists());
}

#[test]
fn run_succeeds_only_when_every_requested_map_was_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_containers(&config, &["VIDRIO;40.41;-3.70;Contenedor VIDRIO Modelo X"]);

    let containers_only = run_pipelines(&[Pipeline::Containers], &config, |_| null_progress());
    assert!(all_succeeded(&containers_only));

    let accidents_only = run_pipelines(&[Pipeline::Accidents], &config, |_| null_progress());
    assert!(!all_succeeded(&accidents_only));

    assert!(all_succeeded(&[]));
}

#[test]
fn rerun_overwrites_previous_maps() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_containers(&config, &["VIDRIO;40.41;-3.70;Contenedor VIDRIO Modelo X"]);
    run_containers(&config, &null_progress()).unwrap();

    write_containers(
        &config,
        &[
            "VIDRIO;40.41;-3.70;Contenedor VIDRIO Modelo X",
            "VIDRIO;40.42;-3.71;Contenedor VIDRIO Modelo Y",
        ],
    );
    run_containers(&config, &null_progress()).unwrap();

    let manifest = read_layers(&config.containers_output()).unwrap();
    assert_eq!(manifest.layers[0].name, "Contenedores Vidrio");
    assert_eq!(manifest.layers[0].size, 2);
    let leftovers: Vec<_> = std::fs::read_dir(&config.output_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
