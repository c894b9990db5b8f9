//! Error types for stratus
//!
//! Every failure of the connector is surfaced as an [`Error`] and left to the
//! caller to handle (usually by aborting startup). Nothing here is retried.

use thiserror::Error;

/// Result type alias for stratus operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Driver name did not match any known strategy
    #[error("unsupported database: {0}")]
    UnsupportedDriver(String),

    /// The authenticating proxy driver could not be registered
    #[error("failed to register driver '{driver}': {reason}")]
    Register { driver: String, reason: String },

    /// The low-level connection could not be opened
    #[error("failed to open connection: {reason}")]
    Open { reason: String },

    /// The pool could not be opened on top of the connection
    #[error("unable to open db: {0}")]
    Pool(#[from] sqlx::Error),

    /// A pool option rejected the settings
    #[error("db opts failure: {option}: {reason}")]
    PoolOption { option: String, reason: String },

    /// The global handle was read before `connect` succeeded
    #[error("database accessed before initialized")]
    Uninitialized,

    /// `connect` was called after the global handle was already set
    #[error("database already initialized")]
    AlreadyInitialized,

    /// Configuration could not be read or is invalid
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl Error {
    /// Create a driver registration error
    pub fn register(driver: impl Into<String>, reason: impl ToString) -> Self {
        Self::Register {
            driver: driver.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a low-level open error
    pub fn open(reason: impl ToString) -> Self {
        Self::Open {
            reason: reason.to_string(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
