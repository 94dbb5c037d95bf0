//! Gatekeeper CLI - local operator tool for the API duplicate-detection core.
//!
//! Exposes the five offline operations useful for running and inspecting
//! the gatekeeper without standing up the wider governance platform:
//! `init`, `check`, `index`, `remove`, `stats` (spec §4.7, added beyond the
//! distilled core spec). Grounded on the teacher's `valknut.rs` +
//! `bin/cli/args.rs` family: a `clap::Parser` root command with a
//! `Subcommand` enum and `tracing_subscriber::fmt()` wired from a verbosity
//! flag. Synchronous rather than `tokio`-driven, since this crate performs
//! no network I/O and every store call is a blocking SQLite call.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gatekeeper::core::config::RulesetConfig;
use gatekeeper::{SignatureService, SignatureStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local operator CLI for the API duplicate-detection similarity engine.
#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(version = VERSION)]
#[command(about = "Local similarity gatekeeper for API specifications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open (creating if absent) the signature store and hydrate the index.
    Init(DbArgs),

    /// Check a specification for near-duplicates already registered in a tenant.
    Check(CheckArgs),

    /// Index a specification: generate its signature and admit it.
    Index(IndexArgs),

    /// Remove a previously indexed API.
    Remove(RemoveArgs),

    /// Print index size and per-tenant row counts.
    Stats(DbArgs),
}

#[derive(clap::Args)]
struct DbArgs {
    /// Path to the SQLite signature store.
    #[arg(long)]
    db: PathBuf,
}

#[derive(clap::Args)]
struct CheckArgs {
    #[command(flatten)]
    db: DbArgs,
    /// Tenant (organization) to scope the query to.
    #[arg(long)]
    tenant: String,
    /// The submitted API's identifier.
    #[arg(long = "api-id")]
    api_id: String,
    /// Path to the specification file (JSON or YAML).
    #[arg(long)]
    spec: PathBuf,
    /// Minimum similarity to report as a duplicate.
    #[arg(long, default_value_t = 0.95)]
    threshold: f64,
}

#[derive(clap::Args)]
struct IndexArgs {
    #[command(flatten)]
    db: DbArgs,
    #[arg(long)]
    tenant: String,
    /// The API's identifier. When omitted, a fresh UUID v4 is assigned —
    /// this is a convenience for first-time registration only, distinct
    /// from the duplicate-check query path, which always requires a real
    /// caller-supplied id (see `SPEC_FULL.md` §9 open question (a)).
    #[arg(long = "api-id")]
    api_id: Option<String>,
    #[arg(long)]
    spec: PathBuf,
}

#[derive(clap::Args)]
struct RemoveArgs {
    #[command(flatten)]
    db: DbArgs,
    #[arg(long)]
    tenant: String,
    #[arg(long = "api-id")]
    api_id: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init(args) => init_command(args),
        Commands::Check(args) => check_command(args),
        Commands::Index(args) => index_command(args),
        Commands::Remove(args) => remove_command(args),
        Commands::Stats(args) => stats_command(args),
    }
}

fn open_service(db: &DbArgs) -> anyhow::Result<SignatureService> {
    let store = SignatureStore::open(&db.db)
        .with_context(|| format!("opening signature store at {}", db.db.display()))?;
    let config = RulesetConfig::default();
    Ok(SignatureService::new(&config, store))
}

fn init_command(args: DbArgs) -> anyhow::Result<()> {
    let service = open_service(&args)?;
    let hydrated = service.initialize()?;
    println!("index ready: {hydrated} signatures hydrated from {}", args.db.display());
    Ok(())
}

fn check_command(args: CheckArgs) -> anyhow::Result<()> {
    let service = open_service(&args.db)?;
    service.initialize()?;
    let spec_text = std::fs::read_to_string(&args.spec)
        .with_context(|| format!("reading specification file {}", args.spec.display()))?;
    let result =
        service.check_for_duplicates(&spec_text, &args.api_id, &args.tenant, args.threshold)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn index_command(args: IndexArgs) -> anyhow::Result<()> {
    let service = open_service(&args.db)?;
    service.initialize()?;
    let spec_text = std::fs::read_to_string(&args.spec)
        .with_context(|| format!("reading specification file {}", args.spec.display()))?;
    let api_id = args
        .api_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    service.index_api(&spec_text, &api_id, &args.tenant)?;
    println!("indexed {api_id} for tenant {}", args.tenant);
    Ok(())
}

fn remove_command(args: RemoveArgs) -> anyhow::Result<()> {
    let service = open_service(&args.db)?;
    service.initialize()?;
    service.remove_api(&args.api_id, &args.tenant)?;
    println!("removed {} for tenant {}", args.api_id, args.tenant);
    Ok(())
}

fn stats_command(args: DbArgs) -> anyhow::Result<()> {
    let service = open_service(&args)?;
    let hydrated = service.initialize()?;
    println!("index size: {hydrated}");
    for (tenant, count) in service.store().tenant_counts()? {
        println!("  {tenant}: {count}");
    }
    Ok(())
}
