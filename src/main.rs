use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_sqlcompass::{load_matrix, run_analysis, AnalyzeOptions, FeatureMatrix};

#[derive(Parser)]
#[command(name = "rust-sqlcompass")]
#[command(author, version, about = "T-SQL portability assessment against a versioned feature-support matrix")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every construct of the given SQL sources
    Analyze {
        /// .sql files, directories, glob patterns or .sqlproj files
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output path for the finding records (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target version (defaults to the newest version of the matrix)
        #[arg(short, long)]
        target_version: Option<String>,

        /// Application name written into every record
        #[arg(short, long, default_value = "")]
        application: String,

        /// Database the code runs in, for three-part name checks
        #[arg(long, default_value = "")]
        database: String,

        /// Default schema for unqualified names
        #[arg(long, default_value = "dbo")]
        schema: String,

        /// QUOTED_IDENTIFIER setting at the start of every unit
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        quoted_identifier: bool,

        /// Feature matrix file (defaults to the embedded matrix)
        #[arg(short, long)]
        matrix: Option<PathBuf>,

        /// Reclassification overrides file
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the target versions of the feature matrix
    Versions {
        /// Feature matrix file (defaults to the embedded matrix)
        #[arg(short, long)]
        matrix: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            inputs,
            output,
            target_version,
            application,
            database,
            schema,
            quoted_identifier,
            matrix,
            overrides,
            verbose,
        } => {
            init_tracing(verbose);
            let options = AnalyzeOptions {
                inputs,
                output_path: output,
                application,
                target_version,
                default_database: database,
                default_schema: schema,
                quoted_identifier,
                matrix_path: matrix,
                overrides_path: overrides,
            };

            let summary = run_analysis(options)?;
            eprint!("{}", summary.render());
            if summary.failed_units() > 0 {
                std::process::exit(1);
            }
        }
        Commands::Versions { matrix } => {
            init_tracing(false);
            let matrix = load_matrix(matrix.as_deref())?;
            let default = matrix.default_version().cloned();
            for version in matrix.versions() {
                if Some(version) == default.as_ref() {
                    println!("{} (default)", version);
                } else {
                    println!("{}", version);
                }
            }
        }
    }

    Ok(())
}
