//! Interactive menu for the generator.
//!
//! Lets users pick which maps to build, or write demo inputs, without
//! memorizing subcommands.

use std::path::Path;

use dialoguer::{Confirm, Input, Select};
use madrid_map_cli_utils::MultiProgress;

use crate::config::GenerateConfig;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::{generate_fixtures, generate_maps, print_layers, print_outcomes, read_layers};

/// Top-level actions offered by the menu.
enum Action {
    All,
    Accidents,
    Containers,
    Fixtures,
    Layers,
}

impl Action {
    const ALL: &[Self] = &[
        Self::All,
        Self::Accidents,
        Self::Containers,
        Self::Fixtures,
        Self::Layers,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::All => "Generate both maps",
            Self::Accidents => "Generate accident heatmap",
            Self::Containers => "Generate container map",
            Self::Fixtures => "Write synthetic input files",
            Self::Layers => "List the layers of a generated map",
        }
    }
}

/// Runs the interactive menu and returns the outcome of every map it
/// generated. Actions that build no map return an empty list.
///
/// # Errors
///
/// Returns an error if user input fails, fixtures cannot be written, or a
/// map cannot be inspected. Pipeline failures are in the outcomes.
pub fn run(
    config: &GenerateConfig,
    multi: &MultiProgress,
) -> Result<Vec<PipelineOutcome>, Box<dyn std::error::Error>> {
    println!("Madrid Map Generator");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let pipelines: &[Pipeline] = match Action::ALL[idx] {
        Action::All => &Pipeline::ALL,
        Action::Accidents => &[Pipeline::Accidents],
        Action::Containers => &[Pipeline::Containers],
        Action::Fixtures => {
            fixtures(config)?;
            return Ok(Vec::new());
        }
        Action::Layers => {
            let path: String = Input::new()
                .with_prompt("Path to the HTML map")
                .default(config.accidents_output().display().to_string())
                .interact_text()?;
            print_layers(&read_layers(Path::new(path.trim()))?);
            return Ok(Vec::new());
        }
    };

    let outcomes = generate_maps(config, pipelines, multi);
    print_outcomes(&outcomes);

    Ok(outcomes)
}

fn fixtures(config: &GenerateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config.clone();

    config.fixtures.accidents = Input::new()
        .with_prompt("Accident rows")
        .default(config.fixtures.accidents)
        .interact_text()?;

    config.fixtures.containers = Input::new()
        .with_prompt("Container rows")
        .default(config.fixtures.containers)
        .interact_text()?;

    let seeded = Confirm::new()
        .with_prompt("Use a fixed seed?")
        .default(false)
        .interact()?;
    if seeded {
        let seed: u64 = Input::new().with_prompt("Seed").default(0).interact_text()?;
        config.fixtures.seed = Some(seed);
    }

    for outcome in generate_fixtures(&config)? {
        println!("{outcome}");
    }

    Ok(())
}
