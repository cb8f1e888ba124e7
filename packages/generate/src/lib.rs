#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns the Madrid traffic accident register and the waste container
//! inventory into two standalone interactive HTML maps.
//!
//! The accident map is a heatmap with a month slider over the rows picked
//! by the configured filter; the container map stacks one marker cluster
//! layer per container category plus heat layers for selected categories.
//! Both pipelines run in sequence and independently: a failure in one is
//! logged and reported without stopping the other.
//!
//! Synthetic inputs for demo runs are written only by the explicit
//! `fixtures` command, never as a side effect of generating maps.

pub mod config;
pub mod interactive;
pub mod pipeline;

use std::path::Path;

use madrid_map_cli_utils::{IndicatifProgress, MultiProgress};
use madrid_map_fixtures::{FixtureOutcome, generate_inputs};
use madrid_map_render::{LayerManifest, RenderError};

pub use config::{ConfigError, GenerateConfig};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, run_pipeline, run_pipelines};

/// Runs `pipelines` in order with a progress bar per input file and one
/// over the whole run.
#[must_use]
pub fn generate_maps(
    config: &GenerateConfig,
    pipelines: &[Pipeline],
    multi: &MultiProgress,
) -> Vec<PipelineOutcome> {
    let overall = IndicatifProgress::pipelines_bar(multi, "Maps", pipelines.len() as u64);

    let outcomes: Vec<PipelineOutcome> = pipelines
        .iter()
        .map(|&pipeline| {
            overall.set_message(format!("Maps ({pipeline})"));
            let rows = IndicatifProgress::rows_bar(multi, &format!("Reading {pipeline} input"));
            let outcome = run_pipeline(pipeline, config, &rows);
            if !outcome.is_success() {
                rows.finish_and_clear();
            }
            overall.inc(1);
            outcome
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    overall.finish(format!(
        "{} of {} maps generated",
        outcomes.len() - failed,
        outcomes.len()
    ));

    outcomes
}

/// Whether every pipeline in `outcomes` succeeded. An empty run counts as
/// a success.
#[must_use]
pub fn all_succeeded(outcomes: &[PipelineOutcome]) -> bool {
    outcomes.iter().all(PipelineOutcome::is_success)
}

/// Writes synthetic inputs to the configured input paths where missing.
///
/// # Errors
///
/// Returns [`PipelineError::Fixture`] if a missing file cannot be written.
pub fn generate_fixtures(config: &GenerateConfig) -> Result<Vec<FixtureOutcome>, PipelineError> {
    Ok(generate_inputs(
        &config.accidents_input(),
        &config.containers_input(),
        &config.fixtures,
    )?)
}

/// Reads the layer manifest back out of a generated map.
///
/// # Errors
///
/// Returns [`LayersError`] if the file cannot be read or holds no manifest.
pub fn read_layers(path: &Path) -> Result<LayerManifest, LayersError> {
    let html = std::fs::read_to_string(path).map_err(|source| LayersError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(madrid_map_render::html::extract_manifest(&html)?)
}

/// Errors that can occur while inspecting a generated map.
#[derive(Debug, thiserror::Error)]
pub enum LayersError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Prints one line per layer of `manifest`.
pub fn print_layers(manifest: &LayerManifest) {
    println!(
        "tiles: {}, layer control: {}",
        manifest.tiles,
        if manifest.layer_control { "yes" } else { "no" }
    );
    for layer in &manifest.layers {
        if layer.labels.is_empty() {
            println!("  [{}] {} ({})", layer.kind, layer.name, layer.size);
        } else {
            println!(
                "  [{}] {} ({}) {}",
                layer.kind,
                layer.name,
                layer.size,
                layer.labels.join(" | ")
            );
        }
    }
}

/// Prints a one-line result per pipeline.
pub fn print_outcomes(outcomes: &[PipelineOutcome]) {
    println!();
    for outcome in outcomes {
        println!("  {outcome}");
    }
}
