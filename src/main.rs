use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use housing_insights::{Pipeline, PipelinePaths};

/// Clean, enrich and summarise a snapshot of property sales.
#[derive(Parser, Debug)]
#[command(name = "housing-insights", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop invalid rows and normalise suburb names
    Clean {
        #[arg(long, default_value = "data/raw/melb_data.csv")]
        input: PathBuf,
        #[arg(long, default_value = "data/processed/melb_data_cleaned.csv")]
        output: PathBuf,
    },
    /// Select the busiest suburbs and derive analysis columns
    Features {
        #[arg(long, default_value = "data/processed/melb_data_cleaned.csv")]
        input: PathBuf,
        #[arg(long, default_value = "data/processed/melb_data_analysis.csv")]
        output: PathBuf,
    },
    /// Aggregate the analysis table into report tables
    Insights {
        #[arg(long, default_value = "data/processed/melb_data_analysis.csv")]
        input: PathBuf,
        #[arg(long, default_value = "data/reports")]
        output_dir: PathBuf,
    },
    /// Run all three steps under one data directory
    Run {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let pipeline = Pipeline::default();
    match cli.command {
        Command::Clean { input, output } => {
            let summary = pipeline
                .clean(&input, &output)
                .with_context(|| format!("cleaning {} failed", input.display()))?;
            println!("{summary}");
        }
        Command::Features { input, output } => {
            let summary = pipeline
                .features(&input, &output)
                .with_context(|| format!("feature engineering on {} failed", input.display()))?;
            println!("{summary}");
        }
        Command::Insights { input, output_dir } => {
            let (report, _) = pipeline
                .insights(&input, &output_dir)
                .with_context(|| format!("generating insights from {} failed", input.display()))?;
            print!("{report}");
        }
        Command::Run { data_dir } => {
            let paths = PipelinePaths::under(&data_dir);
            let summary = pipeline
                .run(&paths)
                .with_context(|| format!("pipeline run under {} failed", data_dir.display()))?;
            println!("{}\n", summary.cleaning);
            println!("{}\n", summary.features);
            print!("{}", summary.report);
        }
    }
    Ok(())
}
