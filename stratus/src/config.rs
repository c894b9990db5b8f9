//! Database configuration from TOML or environment variables
//!
//! Environment variables:
//!   STRATUS_DRIVER                 # postgres | postgresql | cloudsql-postgres (default: postgres)
//!   DATABASE_URL                   # connection string (required)
//!   STRATUS_CREDENTIALS_FILE       # Cloud SQL key file (default: /etc/sql/auth.json)
//!   STRATUS_MAX_CONNECTIONS        # maximum open connections
//!   STRATUS_MAX_IDLE_CONNECTIONS   # idle connections retained
//!   STRATUS_LAZY                   # "true" to defer connecting until first use

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::CREDENTIALS_FILE;
use crate::database::{ConnectMode, Connector};
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::options::{
    AcquireTimeout, ConnMaxIdleTime, ConnMaxLifetime, MaxConnections, MaxIdleConnections,
    PoolOption,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_driver")]
    pub driver: Driver,

    pub url: String,

    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    #[serde(default)]
    pub max_connections: Option<u32>,

    #[serde(default)]
    pub max_idle_connections: Option<u32>,

    #[serde(default)]
    pub conn_max_lifetime_secs: Option<u64>,

    #[serde(default)]
    pub conn_max_idle_time_secs: Option<u64>,

    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,

    /// Defer connecting until the first query
    #[serde(default)]
    pub lazy: bool,
}

fn default_driver() -> Driver {
    Driver::Postgres
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(CREDENTIALS_FILE)
}

impl DatabaseConfig {
    pub fn new(driver: Driver, url: impl Into<String>) -> Self {
        Self {
            driver,
            url: url.into(),
            credentials_file: default_credentials_file(),
            max_connections: None,
            max_idle_connections: None,
            conn_max_lifetime_secs: None,
            conn_max_idle_time_secs: None,
            acquire_timeout_secs: None,
            lazy: false,
        }
    }

    /// Parse config from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::config(format!("invalid TOML: {e}")))
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Load config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let driver = match lookup("STRATUS_DRIVER") {
            Some(name) => name.parse()?,
            None => default_driver(),
        };
        let url = lookup("DATABASE_URL").ok_or_else(|| Error::config("DATABASE_URL not set"))?;

        let mut config = Self::new(driver, url);
        if let Some(path) = lookup("STRATUS_CREDENTIALS_FILE") {
            config.credentials_file = PathBuf::from(path);
        }
        config.max_connections = parse_var(&lookup, "STRATUS_MAX_CONNECTIONS")?;
        config.max_idle_connections = parse_var(&lookup, "STRATUS_MAX_IDLE_CONNECTIONS")?;
        config.lazy = parse_var(&lookup, "STRATUS_LAZY")?.unwrap_or(false);

        Ok(config)
    }

    pub fn mode(&self) -> ConnectMode {
        if self.lazy {
            ConnectMode::Lazy
        } else {
            ConnectMode::Eager
        }
    }

    /// Pool options in the order they are applied: limits first, then
    /// lifetimes and timeouts.
    pub fn to_options(&self) -> Vec<Box<dyn PoolOption>> {
        let mut options: Vec<Box<dyn PoolOption>> = Vec::new();

        if let Some(max) = self.max_connections {
            options.push(Box::new(MaxConnections(max)));
        }
        if let Some(idle) = self.max_idle_connections {
            options.push(Box::new(MaxIdleConnections(idle)));
        }
        if let Some(secs) = self.conn_max_lifetime_secs {
            options.push(Box::new(ConnMaxLifetime(Duration::from_secs(secs))));
        }
        if let Some(secs) = self.conn_max_idle_time_secs {
            options.push(Box::new(ConnMaxIdleTime(Duration::from_secs(secs))));
        }
        if let Some(secs) = self.acquire_timeout_secs {
            options.push(Box::new(AcquireTimeout(Duration::from_secs(secs))));
        }

        options
    }

    /// A connector carrying every setting in this config
    pub fn connector(&self) -> Connector {
        Connector::new(self.driver.as_str(), self.url.clone())
            .credentials_file(self.credentials_file.clone())
            .mode(self.mode())
            .options(self.to_options())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("invalid {key}='{value}': {e}")))
        })
        .transpose()
}
