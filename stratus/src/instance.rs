//! Process-wide database handle
//!
//! The handle is set once by [`connect`] (normally from `main`) and read
//! everywhere else through [`instance`]. Code that can take the handle as an
//! argument should prefer passing a [`Database`] around instead.

use once_cell::sync::OnceCell;
use tracing::info;

use crate::database::{Connector, Database};
use crate::error::{Error, Result};
use crate::options::PoolOption;

static INSTANCE: OnceCell<Database> = OnceCell::new();

/// Connect with the default settings and store the handle process-wide.
///
/// # Example
///
/// ```ignore
/// stratus::connect(
///     "postgres",
///     "postgres://localhost/app",
///     vec![Box::new(MaxConnections(20)), Box::new(MaxIdleConnections(5))],
/// )
/// .await?;
/// let db = stratus::instance();
/// ```
pub async fn connect(
    driver: &str,
    dsn: &str,
    options: Vec<Box<dyn PoolOption>>,
) -> Result<&'static Database> {
    Connector::new(driver, dsn).options(options).connect().await
}

impl Connector {
    /// Open the pool and store it as the process-wide handle.
    ///
    /// On failure the process-wide handle is left untouched. Fails with
    /// [`Error::AlreadyInitialized`] if a handle is already stored.
    pub async fn connect(self) -> Result<&'static Database> {
        if INSTANCE.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let db = self.open().await?;
        let db = INSTANCE
            .try_insert(db)
            .map_err(|_| Error::AlreadyInitialized)?;

        info!(driver = %db.driver(), "database instance initialized");
        Ok(db)
    }
}

/// The process-wide handle.
///
/// # Panics
///
/// Panics if called before a successful [`connect`]. That is a programming
/// error; use [`try_instance`] where the caller can recover.
pub fn instance() -> &'static Database {
    match INSTANCE.get() {
        Some(db) => db,
        None => panic!("database accessed before initialized"),
    }
}

/// The process-wide handle, or [`Error::Uninitialized`].
pub fn try_instance() -> Result<&'static Database> {
    INSTANCE.get().ok_or(Error::Uninitialized)
}

/// Whether [`connect`] has stored a handle
pub fn is_initialized() -> bool {
    INSTANCE.get().is_some()
}
