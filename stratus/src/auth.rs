//! Credential selection for the Cloud SQL driver

use std::path::{Path, PathBuf};

use tracing::debug;

/// Default location of the service account key used by deployed instances.
pub const CREDENTIALS_FILE: &str = "/etc/sql/auth.json";

/// Option passed to the authenticating driver when it is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOption {
    /// Log in with an IAM access token instead of a database password
    IamAuthN,
    /// Sign tokens with the service account key at this path
    CredentialsFile(PathBuf),
}

/// Build the registration options for the Cloud SQL driver.
///
/// IAM authentication is always requested. When a key file exists at
/// `credentials_file` it is used, otherwise the driver falls back to ambient
/// credentials (application default credentials or the metadata server).
/// A missing file is not an error: local development relies on ambient
/// credentials.
pub fn auth_options(credentials_file: &Path) -> Vec<AuthOption> {
    let mut options = vec![AuthOption::IamAuthN];

    if credentials_file.is_file() {
        debug!(path = %credentials_file.display(), "using credentials file");
        options.push(AuthOption::CredentialsFile(credentials_file.to_path_buf()));
    } else {
        debug!(
            path = %credentials_file.display(),
            "no credentials file, using ambient credentials"
        );
    }

    options
}

/// The credentials file named in `options`, if any
pub fn credentials_file(options: &[AuthOption]) -> Option<&Path> {
    options.iter().find_map(|opt| match opt {
        AuthOption::CredentialsFile(path) => Some(path.as_path()),
        AuthOption::IamAuthN => None,
    })
}
