//! stratus CLI - open the process-wide database pool and check it
//!
//! Configuration comes from `--config FILE` (TOML) or the environment
//! (`DATABASE_URL`, `STRATUS_*`, `.env`), with command-line flags taking
//! precedence over both.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use stratus::DatabaseConfig;
use tracing::{debug, info};

mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "stratus",
    author,
    version,
    about = "Open the process-wide PostgreSQL pool and check that it works"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect once, then run `SELECT 1` through the shared instance
    Ping(ConnectArgs),
    /// Print the resolved database configuration as TOML
    Config(ConnectArgs),
}

#[derive(Args, Debug, Default)]
struct ConnectArgs {
    /// TOML config file (default: read from the environment)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Driver name: postgres, postgresql or cloudsql-postgres
    #[arg(long)]
    driver: Option<String>,

    /// Connection string
    #[arg(long)]
    url: Option<String>,

    /// Cloud SQL service account key file
    #[arg(long, value_name = "PATH")]
    credentials_file: Option<PathBuf>,

    /// Maximum open connections (0 removes the limit)
    #[arg(long)]
    max_connections: Option<u32>,

    /// Idle connections retained by the pool
    #[arg(long)]
    max_idle: Option<u32>,

    /// Defer connecting until the first query
    #[arg(long)]
    lazy: bool,
}

impl ConnectArgs {
    /// Resolve config from file or environment, then apply flag overrides
    fn resolve(&self) -> Result<DatabaseConfig> {
        let mut config = match &self.config {
            Some(path) => DatabaseConfig::load(path)?,
            None => DatabaseConfig::from_lookup(|key| self.lookup(key))?,
        };

        if let Some(driver) = &self.driver {
            config.driver = driver.parse()?;
        }
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(path) = &self.credentials_file {
            config.credentials_file = path.clone();
        }
        if self.max_connections.is_some() {
            config.max_connections = self.max_connections;
        }
        if self.max_idle.is_some() {
            config.max_idle_connections = self.max_idle;
        }
        config.lazy |= self.lazy;

        Ok(config)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let flag = match key {
            "DATABASE_URL" => self.url.clone(),
            "STRATUS_DRIVER" => self.driver.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug })?;

    match cli.command {
        Commands::Ping(args) => run_ping(args).await,
        Commands::Config(args) => run_config(args),
    }
}

async fn run_ping(args: ConnectArgs) -> Result<()> {
    let config = args.resolve()?;
    debug!(driver = %config.driver, lazy = config.lazy, "connecting");

    config
        .connector()
        .connect()
        .await
        .context("Failed to connect to database")?;

    let db = stratus::instance();
    let (one,): (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(db.pool())
        .await
        .context("SELECT 1 failed")?;

    info!(driver = %db.driver(), "database reachable");
    println!(
        "ok: SELECT 1 = {one} (driver {}, {} open, {} idle)",
        db.driver(),
        db.pool().size(),
        db.pool().num_idle()
    );

    db.close().await;
    Ok(())
}

fn run_config(args: ConnectArgs) -> Result<()> {
    let config = args.resolve()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    print!("{rendered}");
    Ok(())
}
