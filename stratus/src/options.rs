//! Pool options
//!
//! Options are small named records applied, in order, to a [`PoolSettings`]
//! before the pool is opened. The first option that fails stops the sequence
//! and its error is returned from the connector; later options never run.

use std::fmt;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, Result};

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a free connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Limit used for `MaxConnections(0)`: the largest `max_connections` a
/// Postgres server accepts. The server's own setting is the effective cap.
pub const UNBOUNDED_MAX_CONNECTIONS: u32 = 262_143;

/// Failure reported by a [`PoolOption`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OptionError(pub String);

impl OptionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Pool sizing and lifetime settings, mutated by [`PoolOption`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of open connections
    pub max_connections: u32,
    /// Idle connections kept after release; `None` keeps up to the maximum
    pub max_idle_connections: Option<u32>,
    /// Connections older than this are closed; `None` keeps them forever
    pub max_lifetime: Option<Duration>,
    /// Idle connections above the retained count are closed after this
    pub idle_timeout: Option<Duration>,
    /// How long `acquire` waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_idle_connections: None,
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolSettings {
    /// Build sqlx pool options for sizing and lifetimes.
    ///
    /// The idle cap is not expressible here; the connector enforces it when
    /// connections are released.
    pub fn to_pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .max_lifetime(self.max_lifetime)
            .idle_timeout(self.idle_timeout)
            .acquire_timeout(self.acquire_timeout)
    }
}

/// A named setting applied to [`PoolSettings`] while connecting.
///
/// Implement this for options that need to validate their input; the
/// provided options never fail.
pub trait PoolOption: fmt::Debug + Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    fn apply(&self, settings: &mut PoolSettings) -> std::result::Result<(), OptionError>;
}

/// Set the maximum number of open connections. `0` removes the client-side
/// limit (see [`UNBOUNDED_MAX_CONNECTIONS`]).
///
/// Lowering the limit below the idle cap lowers the cap too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxConnections(pub u32);

impl PoolOption for MaxConnections {
    fn name(&self) -> &str {
        "max_connections"
    }

    fn apply(&self, settings: &mut PoolSettings) -> std::result::Result<(), OptionError> {
        let max = if self.0 == 0 {
            UNBOUNDED_MAX_CONNECTIONS
        } else {
            self.0.min(UNBOUNDED_MAX_CONNECTIONS)
        };
        settings.max_connections = max;
        settings.max_idle_connections = settings.max_idle_connections.map(|idle| idle.min(max));
        Ok(())
    }
}

/// Set how many idle connections the pool retains. Connections released
/// while the pool already holds this many idle ones are closed; `0` closes
/// every released connection.
///
/// Capped at the current maximum open connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxIdleConnections(pub u32);

impl PoolOption for MaxIdleConnections {
    fn name(&self) -> &str {
        "max_idle_connections"
    }

    fn apply(&self, settings: &mut PoolSettings) -> std::result::Result<(), OptionError> {
        settings.max_idle_connections = Some(self.0.min(settings.max_connections));
        Ok(())
    }
}

/// Set how long a connection may be reused. A zero duration keeps
/// connections forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnMaxLifetime(pub Duration);

impl PoolOption for ConnMaxLifetime {
    fn name(&self) -> &str {
        "conn_max_lifetime"
    }

    fn apply(&self, settings: &mut PoolSettings) -> std::result::Result<(), OptionError> {
        settings.max_lifetime = (!self.0.is_zero()).then_some(self.0);
        Ok(())
    }
}

/// Set how long a connection may sit idle before it is closed. A zero
/// duration keeps idle connections forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnMaxIdleTime(pub Duration);

impl PoolOption for ConnMaxIdleTime {
    fn name(&self) -> &str {
        "conn_max_idle_time"
    }

    fn apply(&self, settings: &mut PoolSettings) -> std::result::Result<(), OptionError> {
        settings.idle_timeout = (!self.0.is_zero()).then_some(self.0);
        Ok(())
    }
}

/// Set how long acquiring a connection may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireTimeout(pub Duration);

impl PoolOption for AcquireTimeout {
    fn name(&self) -> &str {
        "acquire_timeout"
    }

    fn apply(&self, settings: &mut PoolSettings) -> std::result::Result<(), OptionError> {
        settings.acquire_timeout = self.0;
        Ok(())
    }
}

/// Apply `options` in order, stopping at the first failure.
pub fn apply_options(settings: &mut PoolSettings, options: &[Box<dyn PoolOption>]) -> Result<()> {
    for option in options {
        debug!(option = option.name(), "applying pool option");
        option.apply(settings).map_err(|err| Error::PoolOption {
            option: option.name().to_string(),
            reason: err.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Recording {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl PoolOption for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn apply(&self, _settings: &mut PoolSettings) -> std::result::Result<(), OptionError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                Err(OptionError::new("rejected"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let options: Vec<Box<dyn PoolOption>> = vec![
            Box::new(Recording { name: "a", fail: false, log: log.clone() }),
            Box::new(Recording { name: "b", fail: true, log: log.clone() }),
            Box::new(Recording { name: "c", fail: false, log: log.clone() }),
        ];

        let mut settings = PoolSettings::default();
        let err = apply_options(&mut settings, &options).unwrap_err();

        match err {
            Error::PoolOption { option, reason } => {
                assert_eq!(option, "b");
                assert_eq!(reason, "rejected");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_options_apply_in_order() {
        let options: Vec<Box<dyn PoolOption>> = vec![
            Box::new(MaxConnections(20)),
            Box::new(MaxIdleConnections(5)),
            Box::new(MaxConnections(3)),
        ];
        let mut settings = PoolSettings::default();
        apply_options(&mut settings, &options).unwrap();

        assert_eq!(settings.max_connections, 3);
        // lowering the max pulls the idle count down with it
        assert_eq!(settings.max_idle_connections, Some(3));
    }

    #[test]
    fn test_idle_capped_at_max() {
        let mut settings = PoolSettings::default();
        MaxConnections(4).apply(&mut settings).unwrap();
        MaxIdleConnections(8).apply(&mut settings).unwrap();
        assert_eq!(settings.max_idle_connections, Some(4));
    }

    #[test]
    fn test_zero_max_is_unbounded() {
        let mut settings = PoolSettings::default();
        MaxConnections(0).apply(&mut settings).unwrap();
        assert_eq!(settings.max_connections, UNBOUNDED_MAX_CONNECTIONS);

        MaxConnections(u32::MAX).apply(&mut settings).unwrap();
        assert_eq!(settings.max_connections, UNBOUNDED_MAX_CONNECTIONS);
    }

    #[test]
    fn test_idle_uncapped_by_default() {
        let mut settings = PoolSettings::default();
        MaxConnections(3).apply(&mut settings).unwrap();
        assert_eq!(settings.max_idle_connections, None);
    }

    #[test]
    fn test_zero_durations_disable_limits() {
        let mut settings = PoolSettings::default();
        ConnMaxLifetime(Duration::ZERO).apply(&mut settings).unwrap();
        ConnMaxIdleTime(Duration::ZERO).apply(&mut settings).unwrap();
        assert_eq!(settings.max_lifetime, None);
        assert_eq!(settings.idle_timeout, None);

        ConnMaxLifetime(Duration::from_secs(60)).apply(&mut settings).unwrap();
        assert_eq!(settings.max_lifetime, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_pool_options_reflect_settings() {
        let settings = PoolSettings {
            max_connections: 7,
            max_idle_connections: Some(2),
            acquire_timeout: Duration::from_secs(3),
            ..PoolSettings::default()
        };
        let opts = settings.to_pool_options();
        assert_eq!(opts.get_max_connections(), 7);
        // the idle cap never forces connections open
        assert_eq!(opts.get_min_connections(), 0);
        assert_eq!(opts.get_acquire_timeout(), Duration::from_secs(3));
    }
}
