#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Madrid map generator.
//!
//! Without a subcommand an interactive menu is shown.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use madrid_map_generate::{
    GenerateConfig, Pipeline, PipelineOutcome, all_succeeded, generate_fixtures, generate_maps,
    interactive, print_layers, print_outcomes, read_layers,
};

#[derive(Parser)]
#[command(
    name = "madrid_map_generate",
    about = "Interactive HTML maps of Madrid traffic accidents and waste containers"
)]
struct Cli {
    /// TOML file overriding the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory the maps are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the accident heatmap with the month slider
    Accidents,
    /// Generate the container cluster and heat map
    Containers,
    /// Generate both maps
    All,
    /// Write synthetic input files where they are missing
    Fixtures {
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Number of accident rows
        #[arg(long)]
        accidents: Option<usize>,
        /// Number of container rows
        #[arg(long)]
        containers: Option<usize>,
    },
    /// List the layers of a generated map
    Layers {
        /// Path to the HTML file
        html: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = madrid_map_cli_utils::init_logger(LevelFilter::Info);
    let cli = Cli::parse();

    let mut config = GenerateConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    config.validate()?;

    let Some(command) = cli.command else {
        exit_on_failure(&interactive::run(&config, &multi)?);
        return Ok(());
    };

    let pipelines: &[Pipeline] = match command {
        Commands::Accidents => &[Pipeline::Accidents],
        Commands::Containers => &[Pipeline::Containers],
        Commands::All => &Pipeline::ALL,
        Commands::Fixtures {
            seed,
            accidents,
            containers,
        } => {
            if seed.is_some() {
                config.fixtures.seed = seed;
            }
            if let Some(count) = accidents {
                config.fixtures.accidents = count;
            }
            if let Some(count) = containers {
                config.fixtures.containers = count;
            }
            for outcome in generate_fixtures(&config)? {
                println!("{outcome}");
            }
            return Ok(());
        }
        Commands::Layers { html } => {
            print_layers(&read_layers(&html)?);
            return Ok(());
        }
    };

    let outcomes = generate_maps(&config, pipelines, &multi);
    print_outcomes(&outcomes);
    exit_on_failure(&outcomes);

    Ok(())
}

/// Exits with status 1 when any requested pipeline failed.
fn exit_on_failure(outcomes: &[PipelineOutcome]) {
    if !all_succeeded(outcomes) {
        std::process::exit(1);
    }
}
