//! `dashload`: load dashboard datasets from the command line

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dash_data::{DataLoader, LoadOptions, LoaderConfig, ProcessingType};

mod commands;

/// Load CSV, JSON and GeoJSON datasets the way the dashboards do
#[derive(Parser, Debug)]
#[command(name = "dashload")]
#[command(version)]
#[command(about = "Load, inspect and reshape dashboard datasets", long_about = None)]
struct Cli {
    /// Directory dataset paths are resolved against
    #[arg(long, env = "DASHLOAD_BASE_DIR", global = true)]
    base_dir: Option<PathBuf>,

    /// Loader configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print column summaries and the first rows of a dataset
    Inspect {
        #[command(flatten)]
        load: LoadArgs,

        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Number of rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Keep rows whose columns equal the given values
    Filter {
        #[command(flatten)]
        load: LoadArgs,

        /// Equality criterion, repeatable
        #[arg(long = "eq", value_name = "COL=VALUE")]
        criteria: Vec<String>,
    },

    /// Group rows and summarise columns
    Aggregate {
        #[command(flatten)]
        load: LoadArgs,

        /// Grouping column, repeatable
        #[arg(long = "group-by", value_name = "COL")]
        group_by: Vec<String>,

        /// Statistic to compute (sum, avg, count, min, max), repeatable
        #[arg(long = "agg", value_name = "COL=STAT", required = true)]
        aggregations: Vec<String>,
    },

    /// Write a processed dataset as CSV
    Export {
        #[command(flatten)]
        load: LoadArgs,

        /// Output file
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Dataset path relative to the base directory
    path: String,

    /// Field delimiter; detected from the first line when omitted
    #[arg(long)]
    delimiter: Option<char>,

    /// Treat the first line as data
    #[arg(long)]
    no_header: bool,

    /// Post-processor to run (csv, excel, geojson, acs)
    #[arg(long)]
    processing: Option<ProcessingType>,

    /// Extra null token, repeatable
    #[arg(long = "null", value_name = "TOKEN")]
    null_values: Vec<String>,
}

impl LoadArgs {
    fn options(&self) -> LoadOptions {
        let mut options = LoadOptions::new().with_null_values(self.null_values.iter().cloned());
        options.delimiter = self.delimiter;
        options.processing_type = self.processing;
        if self.no_header {
            options = options.with_header(false);
        }
        options
    }
}

fn loader_config(cli: &Cli) -> Result<LoaderConfig> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_json_file(path)
            .with_context(|| format!("reading loader config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = loader_config(&cli)?;
    info!(base_dir = %config.base_dir.display(), "starting dashload");
    let loader = DataLoader::new(config);

    match cli.command {
        Commands::Inspect { load, json, limit } => {
            let table = commands::load(&loader, &load.path, &load.options()).await?;
            commands::inspect(&table, json, limit)
        }
        Commands::Filter { load, criteria } => {
            let table = commands::load(&loader, &load.path, &load.options()).await?;
            commands::filter(&table, &criteria)
        }
        Commands::Aggregate {
            load,
            group_by,
            aggregations,
        } => {
            let table = commands::load(&loader, &load.path, &load.options()).await?;
            commands::aggregate(&table, &group_by, &aggregations)
        }
        Commands::Export { load, out } => {
            let table = commands::load(&loader, &load.path, &load.options()).await?;
            commands::export(&table, &out)
        }
    }
}
