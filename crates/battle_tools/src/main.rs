//! Auto-battler - Development Tools

use std::path::{Path, PathBuf};

use battle_core::data::DefinitionTable;
use battle_tools::simulate::{run_battle, to_json, SimulateOptions};
use battle_tools::{read_source, validate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "battle-tools")]
#[command(about = "Development tools for the auto-battler simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate definition files
    Validate {
        /// Definition file or directory of .ron files
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Run a seeded headless battle and print the combat log
    Simulate {
        /// Definition file
        #[arg(default_value = "assets/data/roster.ron")]
        path: PathBuf,
        /// RNG seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Stop after this many ticks
        #[arg(long, default_value_t = 6_000)]
        max_ticks: u64,
        /// Team 1 character ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        team_a: Vec<String>,
        /// Team 2 character ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        team_b: Vec<String>,
        /// Print the log as JSON
        #[arg(long)]
        json: bool,
    },
}

fn simulate(path: &Path, options: &SimulateOptions, json: bool) -> battle_tools::Result<()> {
    let source = read_source(path)?;
    let table = DefinitionTable::from_ron_str(&path.display().to_string(), &source)?;
    let log = run_battle(table, options)?;
    if json {
        println!("{}", to_json(&log)?);
    } else {
        print!("{}", log.to_text());
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating definitions in: {}", path.display());
            validate::validate_path(&path).map(|reports| {
                tracing::info!("Validation passed for {} file(s)", reports.len());
            })
        }
        Commands::Simulate {
            path,
            seed,
            max_ticks,
            team_a,
            team_b,
            json,
        } => {
            let options = SimulateOptions {
                seed,
                max_ticks,
                team_a,
                team_b,
                ..SimulateOptions::default()
            };
            simulate(&path, &options, json)
        }
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
