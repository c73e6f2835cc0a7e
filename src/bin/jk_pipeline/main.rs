//! `jk-pipeline` CLI (§6): `run-ingest`, `find-opportunities`, `blacklist`,
//! `create-db`. Thin wiring over the library — every subcommand builds a
//! `Store`, does its one job, and prints a short human-readable summary.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use jk_intel::config::Config;
use jk_intel::domain::ResidentialComplex;
use jk_intel::error::CancelledByOperator;
use jk_intel::scraping::{http_client, RateLimiter};
use jk_intel::store::Store;
use jk_intel::{analytics, pipeline};

/// Fixed token-bucket burst size (§5 "Rate limiting" default capacity).
const RATE_LIMIT_BURST: u32 = 4;

#[derive(Parser)]
#[command(name = "jk-pipeline", about = "Residential-complex ingestion and analytics pipeline")]
struct Cli {
    /// Path to the TOML config file (missing file falls back to defaults).
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `database.path` from the config file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk every non-blacklisted complex in a city and refresh its listings.
    RunIngest {
        #[arg(long)]
        city: String,
        #[arg(long)]
        max_pages: Option<u32>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Rank below-market sales across a city and export them as CSV.
    FindOpportunities {
        #[arg(long)]
        city: String,
        #[arg(long, default_value_t = 0.15)]
        discount: f64,
        #[arg(long, default_value_t = 50.0)]
        max_discount: f64,
        #[arg(long, default_value_t = 50)]
        top_n: usize,
        #[arg(long)]
        output: PathBuf,
    },
    /// Manage blacklisted residential complexes.
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    /// Create (or recreate) the local database file.
    CreateDb {
        #[arg(long)]
        force: bool,
        #[arg(long)]
        sample_data: bool,
    },
}

#[derive(Subcommand)]
enum BlacklistAction {
    List,
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, alias = "jk-id")]
        complex_id: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Remove {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, alias = "jk-id")]
        complex_id: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}

fn db_path(cli: &Cli, config: &Config) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| PathBuf::from(&config.database.path))
}

/// Resolves a complex identity from `--name` / `--complex-id` (`--jk-id`)
/// flags (§6 "blacklist"). At least one must be given; `--name` alone is
/// looked up against whatever has already been ingested.
fn resolve_complex(
    store: &Store,
    name: Option<&str>,
    complex_id: Option<&str>,
) -> anyhow::Result<(String, String)> {
    if let Some(id) = complex_id {
        let resolved_name = match name {
            Some(n) => n.to_string(),
            None => store
                .get_by_complex_id(id)?
                .map(|c| c.name)
                .unwrap_or_else(|| id.to_string()),
        };
        return Ok((id.to_string(), resolved_name));
    }
    if let Some(n) = name {
        if let Some(found) = store.find_by_name_any_city(n)? {
            return Ok((found.complex_id, found.name));
        }
        anyhow::bail!("no ingested complex matches name {n:?}; pass --complex-id instead");
    }
    anyhow::bail!("blacklist add/remove requires --name, --complex-id, or --jk-id")
}

async fn run_ingest(
    cli: &Cli,
    config: &Config,
    city: String,
    max_pages: Option<u32>,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let store = Arc::new(Store::open(&db_path(cli, config))?);
    let client = http_client::build_client()?;
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_secs_f64(config.scraping.delay_seconds),
        RATE_LIMIT_BURST,
    ));

    let mut scraping = config.scraping.clone();
    if let Some(mp) = max_pages {
        scraping.max_pages_default = mp;
    }
    if let Some(c) = concurrency {
        scraping.concurrency = c;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("cancellation requested, draining in-flight work");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    match pipeline::orchestrator::run(store, client, limiter, &city, &scraping, cancel).await {
        Ok(stats) => {
            info!(
                complexes = stats.complexes_total,
                scraped = stats.listings_scraped,
                errors = stats.errors.total(),
                "ingestion run finished"
            );
            Ok(())
        }
        Err(CancelledByOperator) => {
            error!("ingestion run cancelled by operator");
            std::process::exit(2);
        }
    }
}

fn find_opportunities(
    cli: &Cli,
    config: &Config,
    city: String,
    discount: f64,
    max_discount: f64,
    top_n: usize,
    output: PathBuf,
) -> anyhow::Result<()> {
    let store = Store::open(&db_path(cli, config))?;
    let query_date = chrono::Utc::now().date_naive();
    let rows = analytics::sales::top_opportunities_citywide(
        &store,
        &city,
        discount,
        max_discount,
        top_n,
        query_date,
    )?;

    let mut writer = csv::Writer::from_path(&output)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let run_timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    store.insert_opportunity_batch(&rows, &run_timestamp)?;

    info!(count = rows.len(), path = %output.display(), "opportunities exported");
    Ok(())
}

fn blacklist(cli: &Cli, config: &Config, action: BlacklistAction) -> anyhow::Result<()> {
    let store = Store::open(&db_path(cli, config))?;
    match action {
        BlacklistAction::List => {
            for c in store.list_blacklisted_complexes()? {
                println!("{}\t{}\t{}", c.complex_id, c.name, c.notes.as_deref().unwrap_or(""));
            }
        }
        BlacklistAction::Add { name, complex_id, notes } => {
            let (id, resolved_name) = resolve_complex(&store, name.as_deref(), complex_id.as_deref())?;
            store.blacklist_complex(&id, &resolved_name, notes.as_deref())?;
            info!(complex_id = %id, name = %resolved_name, "complex blacklisted");
        }
        BlacklistAction::Remove { name, complex_id } => {
            let (id, resolved_name) = resolve_complex(&store, name.as_deref(), complex_id.as_deref())?;
            store.remove_blacklisted_complex(&id)?;
            info!(complex_id = %id, name = %resolved_name, "complex removed from blacklist");
        }
    }
    Ok(())
}

/// A handful of plausible complexes, for demoing the CLI without a live
/// ingestion run. Not grounded in any real upstream data.
fn seed_sample_data(store: &Store) -> anyhow::Result<()> {
    let sample = [
        ("1001", "Park View Residence", "almaty"),
        ("1002", "Esentai Towers", "almaty"),
        ("1003", "Botanika", "almaty"),
    ];
    for (complex_id, name, city) in sample {
        store.upsert_complex(&ResidentialComplex {
            complex_id: complex_id.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            district: None,
            developer: None,
        })?;
    }
    Ok(())
}

fn create_db(cli: &Cli, config: &Config, force: bool, sample_data: bool) -> anyhow::Result<()> {
    let path = db_path(cli, config);
    let store = if force {
        Store::create_fresh(&path)?
    } else {
        Store::open(&path)?
    };
    if sample_data {
        seed_sample_data(&store)?;
    }
    info!(path = %path.display(), "database ready");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::RunIngest { city, max_pages, concurrency } => {
            run_ingest(&cli, &config, city, max_pages, concurrency).await
        }
        Command::FindOpportunities { city, discount, max_discount, top_n, output } => {
            find_opportunities(&cli, &config, city, discount, max_discount, top_n, output)
        }
        Command::Blacklist { action } => blacklist(&cli, &config, action),
        Command::CreateDb { force, sample_data } => create_db(&cli, &config, force, sample_data),
    }
}
