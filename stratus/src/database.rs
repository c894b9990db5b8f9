//! Connection handle and connector
//!
//! [`Connector`] turns a driver name, a connection string and a list of pool
//! options into a [`Database`]. [`Connector::open`] only builds the handle;
//! storing it process-wide is done by [`Connector::connect`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool};
use sqlx::ConnectOptions;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::{auth_options, CREDENTIALS_FILE};
use crate::driver::{Driver, CLOUDSQL_POSTGRES};
use crate::error::Result;
use crate::idle::IdleCap;
use crate::options::{apply_options, PoolOption, PoolSettings};
use crate::proxy::{spawn_refresh, CloudSqlRegistrar, DriverRegistrar};

/// Statements slower than this are logged at WARN.
pub const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_secs(1);

/// When the pool opens its first connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectMode {
    /// Open and verify one connection before returning
    #[default]
    Eager,
    /// Defer all I/O until the first query
    Lazy,
}

/// Shared handle to the connection pool.
///
/// Cloning is cheap; every clone refers to the same pool. The idle cap and
/// credential refresh run while at least one `Database` clone is alive, so
/// keep the handle rather than a bare `PgPool` clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    driver: Driver,
    max_idle_connections: Option<u32>,
    tasks: Option<Arc<PoolTasks>>,
}

/// Work tied to the pool's lifetime, stopped when the last handle drops
#[derive(Debug)]
struct PoolTasks {
    idle: Option<IdleCap>,
    refresh: Option<JoinHandle<()>>,
}

impl Drop for PoolTasks {
    fn drop(&mut self) {
        if let Some(idle) = &self.idle {
            idle.detach();
        }
        if let Some(refresh) = &self.refresh {
            refresh.abort();
        }
    }
}

impl Database {
    /// Wrap an already opened pool
    pub fn new(pool: PgPool, driver: Driver) -> Self {
        Self {
            pool,
            driver,
            max_idle_connections: None,
            tasks: None,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Idle connections retained after release, if capped
    pub fn max_idle_connections(&self) -> Option<u32> {
        self.max_idle_connections
    }

    /// Whether connect options are being refreshed in the background
    pub fn refreshes_credentials(&self) -> bool {
        self.tasks
            .as_ref()
            .and_then(|tasks| tasks.refresh.as_ref())
            .is_some_and(|refresh| !refresh.is_finished())
    }

    /// Close every connection in the pool and wait for them to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl AsRef<PgPool> for Database {
    fn as_ref(&self) -> &PgPool {
        &self.pool
    }
}

/// Log statements at TRACE and slow ones at WARN
pub(crate) fn with_statement_logging(
    options: PgConnectOptions,
    slow_threshold: Duration,
) -> PgConnectOptions {
    options
        .log_statements(LevelFilter::Trace)
        .log_slow_statements(LevelFilter::Warn, slow_threshold)
}

/// Builder for a [`Database`]
pub struct Connector {
    driver: String,
    dsn: String,
    options: Vec<Box<dyn PoolOption>>,
    credentials_file: PathBuf,
    mode: ConnectMode,
    slow_statement_threshold: Duration,
    registrar: Arc<dyn DriverRegistrar>,
}

impl Connector {
    /// Start a connector for `driver` (case-insensitive) and `dsn`.
    pub fn new(driver: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            dsn: dsn.into(),
            options: Vec::new(),
            credentials_file: PathBuf::from(CREDENTIALS_FILE),
            mode: ConnectMode::default(),
            slow_statement_threshold: SLOW_STATEMENT_THRESHOLD,
            registrar: Arc::new(CloudSqlRegistrar),
        }
    }

    /// Append a pool option. Options run in the order they were added.
    pub fn option(mut self, option: impl PoolOption + 'static) -> Self {
        self.options.push(Box::new(option));
        self
    }

    /// Append several pool options
    pub fn options(mut self, options: impl IntoIterator<Item = Box<dyn PoolOption>>) -> Self {
        self.options.extend(options);
        self
    }

    /// Key file checked by the Cloud SQL driver
    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = path.into();
        self
    }

    /// Connect eagerly (default) or defer until the first query
    pub fn mode(mut self, mode: ConnectMode) -> Self {
        self.mode = mode;
        self
    }

    /// Statements slower than `threshold` are logged at WARN
    pub fn slow_statement_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_threshold = threshold;
        self
    }

    /// Replace the registrar used for the Cloud SQL driver
    pub fn registrar(mut self, registrar: Arc<dyn DriverRegistrar>) -> Self {
        self.registrar = registrar;
        self
    }

    /// Open the pool without touching process-wide state.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is unsupported, an option fails, the
    /// proxy driver cannot be registered or opened, or the pool cannot
    /// connect. Nothing is retried.
    pub async fn open(self) -> Result<Database> {
        let driver = Driver::from_str(&self.driver)?;

        let mut settings = PoolSettings::default();
        apply_options(&mut settings, &self.options)?;
        debug!(?settings, "pool settings");

        let (connect_options, refresh) = match driver {
            Driver::CloudSqlPostgres => {
                let auth = auth_options(&self.credentials_file);
                let proxy = self.registrar.register(CLOUDSQL_POSTGRES, &auth).await?;
                let opened = proxy.open(&self.dsn).await?;
                let refresh = opened.refresh_in.map(|first| (proxy, first));
                (opened.options, refresh)
            }
            Driver::Postgres => (PgConnectOptions::from_str(&self.dsn)?, None),
        };
        let threshold = self.slow_statement_threshold;
        let connect_options = with_statement_logging(connect_options, threshold);

        let idle = settings.max_idle_connections.map(IdleCap::new);
        let mut pool_options = settings.to_pool_options();
        if let Some(idle) = &idle {
            pool_options = idle.install(pool_options);
        }

        let pool = match self.mode {
            ConnectMode::Eager => pool_options.connect_with(connect_options).await?,
            ConnectMode::Lazy => pool_options.connect_lazy_with(connect_options),
        };
        if let Some(idle) = &idle {
            idle.attach(&pool);
        }

        let refresh = refresh.map(|(proxy, first)| {
            spawn_refresh(pool.clone(), proxy, self.dsn.clone(), first, move |options| {
                with_statement_logging(options, threshold)
            })
        });

        info!(
            %driver,
            mode = ?self.mode,
            max_connections = settings.max_connections,
            max_idle_connections = ?settings.max_idle_connections,
            refresh = refresh.is_some(),
            "database pool opened"
        );

        Ok(Database {
            pool,
            driver,
            max_idle_connections: settings.max_idle_connections,
            tasks: Some(Arc::new(PoolTasks { idle, refresh })),
        })
    }
}
