use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};

use estidama_daylight::config::Config;
use estidama_daylight::evaluation::SpaceEvaluation;
use estidama_daylight::model::Model;
use estidama_daylight::results::IlluminanceResults;
use estidama_daylight::scoring::additional_notes;
use estidama_daylight::session::{SelectionState, Session};
use estidama_daylight::tools::sky::{simulation_parameters, simulation_requests};

#[derive(Parser)]
#[command(name = "estidama-daylight")]
#[command(about = "Daylight and glare control credit check of occupied areas")]
struct Cli {
    /// Path to the JSON5 config file
    #[arg(short, long, default_value = "config.json5")]
    config: PathBuf,

    /// Path to the JSON5 building model
    #[arg(short, long, default_value = "model.json5")]
    model: PathBuf,

    /// Occupied area to evaluate, may be repeated
    #[arg(short, long = "space")]
    spaces: Vec<String>,

    /// Evaluate every space whose name starts with this keyword
    #[arg(long)]
    search: Option<String>,

    /// Print records as JSON5 instead of text
    #[arg(long)]
    json: bool,

    /// Log at info level, ignoring RUST_LOG
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check windows and shading devices of the selected spaces
    Validate,

    /// Print the illuminance runs to submit
    Request,

    /// Score downloaded illuminance results
    Score {
        /// Directory with one folder per timepoint (`9_21_10`, ...)
        results: PathBuf,
    },
}

fn print_evaluations(evaluations: &[SpaceEvaluation], json: bool) -> Result<()> {
    if json {
        println!("{}", json5::to_string(&evaluations)?);
        return Ok(());
    }
    for evaluation in evaluations {
        println!(
            "{}: windows {}, all windows shaded {}",
            evaluation.name,
            if evaluation.has_windows { "yes" } else { "no" },
            if evaluation.all_windows_shaded { "yes" } else { "no" },
        );
        for warning in &evaluation.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::builder().filter_level(LevelFilter::Info).init();
    } else {
        env_logger::init();
    }

    let config = Config::load(&cli.config)?;
    let model = Model::load(&cli.model)?;
    debug!("Loaded {} space(s) from {}", model.spaces.len(), cli.model.display());

    let mut selection = SelectionState::new();
    selection.add(cli.spaces.iter().map(String::as_str));
    if let Some(keyword) = &cli.search {
        selection.stage_search(&model, keyword);
        selection.add_staged();
    }

    let mut session = Session::new(
        &model,
        config.program,
        config.thresholds.clone(),
        config.tolerance,
    )?;
    let spaces = session.select_spaces(&selection)?;
    info!(
        "Selected {} occupied area(s) for program {}",
        spaces.len(),
        config.program
    );
    let evaluations = session.evaluate()?;

    match cli.command {
        Commands::Validate => print_evaluations(evaluations, cli.json)?,
        Commands::Request => {
            let Some(location) = config.location else {
                bail!("A location is required to build simulation requests");
            };
            let requests = simulation_requests(
                &cli.model.display().to_string(),
                &location,
                config.north_angle,
            )?;
            for parameter in simulation_parameters(&config.thresholds) {
                println!("{}", parameter);
            }
            println!("{}", json5::to_string(&requests)?);
            session.submit_simulation(requests)?;
        }
        Commands::Score { results } => {
            session.submit_simulation(vec![])?;
            let names: Vec<_> = session
                .spaces()
                .iter()
                .map(|space| space.display_name.clone())
                .collect();
            let results =
                IlluminanceResults::load_dir(&results, names.iter().map(String::as_str))?;
            session.attach_results(results)?;

            let report = session.score()?;
            if cli.json {
                println!("{}", json5::to_string(report)?);
            } else {
                println!("{}", report);
                if report.credit_award > 0 {
                    for note in additional_notes(&config.thresholds) {
                        println!("  - {}", note);
                    }
                }
            }
        }
    }

    Ok(())
}
