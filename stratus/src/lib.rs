//! stratus: a single process-wide PostgreSQL pool
//!
//! The pool is opened once at startup with [`connect`] and retrieved with
//! [`instance`] everywhere else. Only one database is supported.
//!
//! Two drivers are understood, matched case-insensitively:
//! - `postgres` / `postgresql`: connect directly from the connection string
//! - `cloudsql-postgres`: log in to Cloud SQL with IAM tokens, using the key
//!   file at `/etc/sql/auth.json` when present and ambient credentials
//!   otherwise, and refreshing the login token while the pool is open

pub mod auth;
pub mod config;
pub mod database;
pub mod driver;
pub mod error;
mod idle;
pub mod instance;
pub mod options;
pub mod proxy;

pub use auth::{AuthOption, CREDENTIALS_FILE};
pub use config::DatabaseConfig;
pub use database::{ConnectMode, Connector, Database};
pub use driver::Driver;
pub use error::{Error, Result};
pub use instance::{connect, instance, is_initialized, try_instance};
pub use options::{
    AcquireTimeout, ConnMaxIdleTime, ConnMaxLifetime, MaxConnections, MaxIdleConnections,
    OptionError, PoolOption, PoolSettings,
};
pub use proxy::{CloudSqlRegistrar, DriverRegistrar, ProxyConnectOptions, ProxyDriver};
