use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sensorsentry::config::{AppConfig, LoggingConfig, SourceKind};
use sensorsentry::detect::Reading;
use sensorsentry::report::text;
use sensorsentry::source::{self, file::FileSource};
use sensorsentry::{storage, RunOutcome};

#[derive(Parser)]
#[command(
    name = "sensorsentry",
    about = "Multi-method anomaly detection for temperature and humidity sensor streams",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "SENSORSENTRY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent readings, run every detector and report anomalies
    Detect {
        /// Where to read from (overrides config)
        #[arg(long, value_enum)]
        source: Option<SourceKind>,

        /// JSON readings file for the `file` source
        #[arg(long)]
        input: Option<PathBuf>,

        /// SQLite store for the `sqlite` source
        #[arg(long)]
        db: Option<PathBuf>,

        /// Number of most recent readings to analyze
        #[arg(long)]
        limit: Option<usize>,

        /// Supabase project URL
        #[arg(long, env = "SUPABASE_URL", hide_env_values = true)]
        supabase_url: Option<String>,

        /// Supabase API key
        #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
        supabase_key: Option<String>,

        /// Where to write the JSON report (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the JSON report instead of the text summary
        #[arg(long)]
        json: bool,

        /// Do not write the report file
        #[arg(long)]
        no_write: bool,
    },

    /// Load a JSON array of readings into the SQLite store
    Import {
        /// JSON readings file
        #[arg(long)]
        input: PathBuf,

        /// SQLite store (defaults to the configured db_path)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::resolve(cli.config.as_deref())?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Detect {
            source: source_kind,
            input,
            db,
            limit,
            supabase_url,
            supabase_key,
            output,
            json,
            no_write,
        } => {
            if let Some(kind) = source_kind {
                config.source.kind = kind;
            }
            if let Some(input) = input {
                config.source.input_path = input;
            }
            if let Some(db) = db {
                config.source.db_path = db;
            }
            if let Some(limit) = limit {
                config.source.limit = limit;
            }
            if supabase_url.is_some() {
                config.source.supabase_url = supabase_url;
            }
            if supabase_key.is_some() {
                config.source.supabase_key = supabase_key;
            }
            if let Some(output) = output {
                config.output.report_path = output;
            }

            tracing::info!(source = ?config.source.kind, limit = config.source.limit, "Starting anomaly detection");
            let reading_source = source::from_config(&config.source)?;
            let outcome =
                sensorsentry::run(reading_source.as_ref(), config.source.limit, &config.detection).await?;

            let report = outcome.report();
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", text::format_summary(&report.summary, config.output.top_anomalies));
            }

            // An empty window halts the run before anything is persisted
            if matches!(outcome, RunOutcome::Completed { .. }) && !no_write {
                report.write_json(&config.output.report_path)?;
                if !json {
                    println!("\nFull report saved to: {}", config.output.report_path.display());
                }
            }
        }
        Commands::Import { input, db } => {
            let db = db.unwrap_or_else(|| config.source.db_path.clone());
            tracing::info!(input = %input.display(), db = %db.display(), "Importing readings");

            let rows = FileSource::load(&input)?;
            let total = rows.len();
            let readings: Vec<Reading> = rows.iter().filter_map(Reading::from_raw).collect();

            let pool = storage::open_pool(&db)
                .with_context(|| format!("failed to open reading store: {}", db.display()))?;
            let written = storage::save_readings(&pool, &readings)?;

            println!("Imported {} of {} readings into {}", written, total, db.display());
            if written < total {
                println!("Skipped {} malformed rows (missing id or timestamp)", total - written);
            }
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
