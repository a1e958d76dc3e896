use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

mod age;
mod clock;
mod config;
mod dashboard;
mod db;
mod error;
mod models;
mod report;
mod settings;
mod store;

use clock::SystemClock;
use config::{AppConfig, DEFAULT_MAX_CONNECTIONS};
use dashboard::{Dashboard, ReportOutcome, ReportSource};
use models::NewStudent;
use store::{PgRowStore, RowStore};

#[derive(Parser)]
#[command(name = "music-school-dashboard")]
#[command(about = "Student registration and age dashboard for the music school", long_about = None)]
struct Cli {
    /// Postgres connection string for the school database
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", global = true, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,
    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Age brackets and per-professor totals as of a date
    Dashboard {
        /// Count records created up to this day (defaults to today)
        #[arg(long)]
        cutoff: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = ReportSource::Students)]
        source: ReportSource,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the configured school logo
    Logo,
    /// Register a student
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        birth_date: NaiveDate,
        #[arg(long)]
        email: Option<String>,
    },
    /// Enroll a student in a class
    Enroll {
        #[arg(long)]
        student_id: i64,
        #[arg(long)]
        class_id: i64,
    },
    /// Register students from a CSV file (name,birth_date,email)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    config::init_tracing(cli.verbose)?;

    let app_config = AppConfig::new(cli.database_url, cli.max_connections);
    let store = app_config.connect_store().await;
    let row_store = store.as_ref().map(|store| store as &dyn RowStore);

    match cli.command {
        Commands::Dashboard {
            cutoff,
            source,
            format,
            out,
        } => {
            let clock = SystemClock;
            let outcome = Dashboard::new(row_store, &clock)
                .build_report(cutoff, source)
                .await?;
            if !matches!(outcome, ReportOutcome::Complete(_)) {
                warn!(
                    status = outcome.status(),
                    notice = ?outcome.report().notice,
                    "dashboard report is incomplete"
                );
            }

            let snapshot = outcome.into_report();
            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&snapshot)?,
                OutputFormat::Markdown => report::render_markdown(&snapshot),
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
        Commands::Logo => {
            let branding = settings::logo_url(row_store).await;
            println!("{}", serde_json::to_string(&branding)?);
        }
        Commands::Register {
            name,
            birth_date,
            email,
        } => {
            let store = require_store(store.as_ref())?;
            let student = NewStudent {
                name,
                birth_date,
                email,
            };
            let created = db::register_student(store.pool(), &student).await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        Commands::Enroll {
            student_id,
            class_id,
        } => {
            let store = require_store(store.as_ref())?;
            let enrollment = db::enroll_student(store.pool(), student_id, class_id).await?;
            println!("{}", serde_json::to_string_pretty(&enrollment)?);
        }
        Commands::Import { csv } => {
            let store = require_store(store.as_ref())?;
            let inserted = db::import_csv(store.pool(), &csv).await?;
            println!("Registered {inserted} students from {}.", csv.display());
        }
    }

    Ok(())
}

fn require_store(store: Option<&PgRowStore>) -> anyhow::Result<&PgRowStore> {
    store.context("DATABASE_URL must point at a reachable school database")
}
