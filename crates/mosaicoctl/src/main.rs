//! Mosaico Control - CLI for the progression engine
//!
//! Applies lesson completions to JSON progression documents and inspects
//! levels, mosaics and catalogs.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "MOSAICO_LOG";

#[derive(Parser)]
#[command(name = "mosaicoctl")]
#[command(about = "Mosaico - learner progression engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Catalog TOML file (overrides MOSAICO_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the level, title and progress for an XP total
    Level {
        #[arg(long)]
        xp: u64,
    },

    /// Record lesson completions in a progression document
    Complete {
        /// Progression document (created if missing)
        #[arg(long)]
        state: PathBuf,

        /// Track the lesson belongs to
        #[arg(long)]
        track: String,

        /// Number of lessons to complete
        #[arg(long, default_value_t = 1)]
        times: u32,

        /// Account id for a new document
        #[arg(long, default_value = "local")]
        account: String,
    },

    /// Check a progression document and repair derived fields
    Reconcile {
        #[arg(long)]
        state: PathBuf,
    },

    /// Show the current mosaic, colors and track progress
    Show {
        #[arg(long)]
        state: PathBuf,
    },

    /// Print the loaded catalogs
    Catalog,

    /// Suggest tracks for a set of interests
    Recommend {
        /// Interest tag or area, repeatable
        #[arg(long = "interest")]
        interests: Vec<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let catalogs = commands::load_catalogs(cli.catalog.as_deref())?;

    match cli.command {
        Commands::Level { xp } => commands::level(&catalogs, xp),
        Commands::Complete {
            state,
            track,
            times,
            account,
        } => commands::complete(catalogs, &state, &track, times, &account).await,
        Commands::Reconcile { state } => commands::reconcile(catalogs, &state),
        Commands::Show { state } => commands::show(&catalogs, &state),
        Commands::Catalog => commands::catalog(&catalogs),
        Commands::Recommend { interests } => commands::recommend(&catalogs, &interests),
    }
}
