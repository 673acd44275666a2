//! Environment-driven configuration for the Firebase bootstrap.
//!
//! Everything required to initialise a [`FirebaseApp`](crate::FirebaseApp) is
//! gathered and validated up front, so configuration problems surface as one
//! typed [`ConfigError`] at startup instead of an opaque failure on the first
//! request.

use std::env;

use crate::service_account::ServiceAccount;

/// Environment variable that, when set, points the Firestore client at a
/// local emulator (e.g. `127.0.0.1:8081`) instead of the live service.
pub const FIRESTORE_EMULATOR_ENV_VAR: &str = "FIRESTORE_EMULATOR_HOST";

/// A configuration problem that prevents the Firebase clients from being
/// initialised. All variants are fatal: the intended use is to propagate them
/// out of `main` and abort startup.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnvVar(&'static str),

    #[error("service account JSON is malformed: {0}")]
    MalformedServiceAccount(#[from] serde_json::Error),

    #[error("service account field {field} {problem}")]
    InvalidServiceAccount {
        field: &'static str,
        problem: &'static str,
    },

    #[error("failed to read service account file: {0}")]
    ServiceAccountFile(#[from] std::io::Error),
}

/// Validated inputs for [`FirebaseApp::initialise`](crate::FirebaseApp::initialise).
pub struct AppConfig {
    pub(crate) service_account: ServiceAccount,
    pub(crate) firestore_host: Option<String>,
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    ///
    /// `FIREBASE_SERVICE_ACCOUNT` is required and must contain the
    /// JSON-serialized service account object. `FIRESTORE_EMULATOR_HOST` is
    /// optional and redirects the Firestore client to an emulator.
    pub fn from_env() -> Result<Self, ConfigError> {
        let service_account = ServiceAccount::from_env()?;
        let firestore_host = env::var(FIRESTORE_EMULATOR_ENV_VAR)
            .ok()
            .map(|host| format!("https://{host}"));

        Ok(Self {
            service_account,
            firestore_host,
        })
    }

    /// Creates a configuration from an already-loaded service account.
    pub fn new(service_account: ServiceAccount) -> Self {
        Self {
            service_account,
            firestore_host: None,
        }
    }

    /// Overrides the Firestore host URL, e.g. to target an emulator.
    pub fn firestore_host(mut self, host_url: impl Into<String>) -> Self {
        self.firestore_host = Some(host_url.into());
        self
    }

    pub fn service_account(&self) -> &ServiceAccount {
        &self.service_account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_service_account;

    #[test]
    fn builder_overrides_firestore_host() {
        let config =
            AppConfig::new(test_service_account()).firestore_host("https://127.0.0.1:8081");

        assert_eq!(
            config.firestore_host.as_deref(),
            Some("https://127.0.0.1:8081")
        );
        assert_eq!(config.service_account().project_id, "test-project");
    }
}
