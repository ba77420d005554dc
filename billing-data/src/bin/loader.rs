use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use billing_data::RosterLoader;
use billing_db_sqlite::SqliteRepository;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Load a shift roster from a CSV file into the billing database.
///
/// The CSV file should have the following columns:
/// - contact_id: the contact the shift was worked for
/// - start_time / end_time: RFC 3339 instants (UTC)
/// - status: scheduled, completed or cancelled
/// - total_incl_gst: the completed total (empty for unpriced shifts)
/// - description: free text
#[derive(Parser, Debug)]
#[command(name = "billing-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing the shift roster
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g. sqlite:billing.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:billing.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading roster from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = RosterLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let inserted = RosterLoader::load(&repo, &records)
        .await
        .context("Failed to load shifts into database")?;

    println!("Successfully loaded {} shifts into the database.", inserted);

    Ok(())
}
