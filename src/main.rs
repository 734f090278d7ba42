use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use brandfix::{
    run_migration, seed_store, MigrationConfig, MigrationReport, SeedOptions, SqliteBrandStore,
    LEGACY_CONTAINER_KEY,
};

#[derive(Parser, Debug)]
#[command(
    name = "brandfix",
    version,
    about = "Normalize drifted brand records into the canonical schema"
)]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the brand collection (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Populate the collection with synthetic brand documents
    Seed {
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Rewrite some documents into legacy shapes
        #[arg(long, default_value_t = false)]
        drift: bool,
        /// Fixed RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run one normalization pass over the whole collection
    Migrate {
        /// Reconcile and validate only; write nothing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show how much of the collection is still non-canonical
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MigrationConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }

    let schema = config.schema();
    config
        .validate(schema.current_year())
        .context("Invalid configuration")?;

    let store = SqliteBrandStore::open(&config.database)
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;

    match cli.command {
        Command::Seed { count, drift, seed } => {
            let options = SeedOptions { count, drift, seed };
            let ids = seed_store(&store, &schema, &options).context("Failed to seed brands")?;
            println!(
                "✓ {} new brand documents added to {}",
                ids.len(),
                config.database.display()
            );
        }
        Command::Migrate { dry_run, json } => {
            let dry_run = dry_run || config.dry_run;
            let report = run_migration(&store, schema, config.policy(), dry_run)
                .context("Migration aborted")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            if !report.is_clean() {
                std::process::exit(2);
            }
        }
        Command::Status => {
            let total = store.count()?;
            let non_canonical = store.count_non_canonical()?;
            let legacy = store.count_with_field(LEGACY_CONTAINER_KEY)?;
            println!("📊 {}", config.database.display());
            println!("   records:            {}", total);
            println!("   non-canonical keys: {}", non_canonical);
            println!("   legacy '{}' field:  {}", LEGACY_CONTAINER_KEY, legacy);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn print_report(report: &MigrationReport) {
    println!("🔄 Brand normalization{}", if report.dry_run { " (dry run)" } else { "" });
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   processed:        {}", report.processed);
    println!("   legacy shapes:    {}", report.legacy_shapes);
    println!("   validated:        {}", report.validated);
    println!("   inserted/updated: {}/{}", report.inserted, report.updated);
    println!("   unchanged:        {}", report.unchanged);
    println!("   fields defaulted: {}", report.fields_defaulted);
    println!("   aliases adopted:  {}", report.aliases_adopted);
    println!("   keys pruned:      {}", report.keys_pruned);
    match (report.swept, &report.sweep_error) {
        (Some(n), _) => println!("   final sweep:      {} records", n),
        (None, Some(e)) => println!("   final sweep:      FAILED ({})", e),
        (None, None) => println!("   final sweep:      skipped"),
    }

    for failure in &report.validation_failures {
        println!(
            "❌ validation {} [{}]: {}",
            failure.record_id,
            failure.field.as_deref().unwrap_or("-"),
            failure.reason
        );
    }
    for failure in &report.persistence_failures {
        println!("❌ persist {}: {}", failure.record_id, failure.reason);
    }

    if report.is_clean() {
        println!("✅ All brand documents normalized");
    }
}
