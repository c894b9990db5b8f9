//! Driver identifiers and connection strategy selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Name the authenticating proxy driver is registered under
pub const CLOUDSQL_POSTGRES: &str = "cloudsql-postgres";

/// Connection strategy selected by the driver name.
///
/// Names are matched case-insensitively: `postgres` and `postgresql` open
/// directly from the connection string, `cloudsql-postgres` goes through the
/// authenticated Cloud SQL driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Driver {
    Postgres,
    CloudSqlPostgres,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::CloudSqlPostgres => CLOUDSQL_POSTGRES,
        }
    }

    /// Whether this driver authenticates through the cloud proxy
    pub fn is_proxy(&self) -> bool {
        matches!(self, Driver::CloudSqlPostgres)
    }
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_lowercase();
        match name.as_str() {
            CLOUDSQL_POSTGRES => Ok(Driver::CloudSqlPostgres),
            "postgresql" | "postgres" => Ok(Driver::Postgres),
            _ => Err(Error::UnsupportedDriver(name)),
        }
    }
}

impl TryFrom<String> for Driver {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Driver> for String {
    fn from(driver: Driver) -> Self {
        driver.as_str().to_string()
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
