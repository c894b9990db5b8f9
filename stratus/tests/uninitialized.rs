//! Process-wide handle before any successful connect
//!
//! Kept in its own test binary so no other test can initialize the handle.

use stratus::{Error, MaxConnections, OptionError, PoolOption, PoolSettings};

#[derive(Debug)]
struct Rejecting;

impl PoolOption for Rejecting {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn apply(&self, _settings: &mut PoolSettings) -> Result<(), OptionError> {
        Err(OptionError::new("always fails"))
    }
}

#[test]
#[should_panic(expected = "database accessed before initialized")]
fn instance_panics_before_connect() {
    stratus::instance();
}

#[test]
fn try_instance_reports_uninitialized() {
    assert!(matches!(stratus::try_instance(), Err(Error::Uninitialized)));
}

#[tokio::test]
async fn unsupported_drivers_leave_handle_unset() {
    for driver in ["mysql", "sqlite3", "mssql", "POSTGRES9"] {
        let err = stratus::connect(driver, "postgres://localhost/app", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedDriver(_)), "{driver}");
        assert!(!stratus::is_initialized());
    }
}

#[tokio::test]
async fn failing_option_leaves_handle_unset() {
    let options: Vec<Box<dyn PoolOption>> = vec![Box::new(MaxConnections(4)), Box::new(Rejecting)];
    let err = stratus::connect("postgres", "postgres://localhost/app", options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PoolOption { .. }));
    assert!(!stratus::is_initialized());
    assert!(stratus::try_instance().is_err());
}
