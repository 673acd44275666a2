//! Process-level bootstrap for the Firebase Admin services.
//!
//! [`FirebaseApp`] replaces the implicit module-level singleton you may know
//! from the official Admin SDKs. The credentials are loaded once, validated,
//! and the resulting client handles are passed explicitly to whichever parts
//! of the application need them.

use crate::auth::FirebaseAuthClient;
use crate::config::AppConfig;
use crate::error::FirebaseError;
use crate::firestore::client::{FirestoreClient, FirestoreClientOptions};

/// A Firebase project together with its managed service clients, initialised
/// once at process startup.
///
/// Initialisation is expected to happen exactly once per process. Nothing
/// prevents calling [`FirebaseApp::initialise`] a second time; you simply end
/// up with two independent sets of clients, each with its own connections and
/// token caches. Re-initialisation as a hot-reload mechanism is not
/// supported.
pub struct FirebaseApp {
    project_id: String,
    firestore: FirestoreClient,
    auth: FirebaseAuthClient,
}

impl FirebaseApp {
    /// Initialises the app from the process environment.
    ///
    /// Reads the service account from the `FIREBASE_SERVICE_ACCOUNT`
    /// environment variable and fails with a
    /// [`ConfigError`](crate::config::ConfigError) if it is unset, malformed,
    /// or unusable.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let app = kindling::FirebaseApp::from_env().await?;
    /// println!("Connected to project {}", app.project_id());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn from_env() -> Result<Self, FirebaseError> {
        Self::initialise(AppConfig::from_env()?).await
    }

    /// Initialises clients for the project described by `config`.
    #[tracing::instrument(name = "Initialise Firebase app", skip(config))]
    pub async fn initialise(config: AppConfig) -> Result<Self, FirebaseError> {
        let AppConfig {
            service_account,
            firestore_host,
        } = config;

        let project_id = service_account.project_id.clone();
        tracing::debug!(%project_id, "Initialising Firebase app");

        let mut firestore_options = FirestoreClientOptions::default();
        if let Some(host_url) = firestore_host {
            firestore_options = firestore_options.host_url(host_url);
        }

        let firestore =
            FirestoreClient::initialise(service_account.clone(), firestore_options).await?;
        let auth = FirebaseAuthClient::new(service_account)?;

        Ok(Self {
            project_id,
            firestore,
            auth,
        })
    }

    /// The ID of the Firebase project the clients are connected to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns a handle to the document database.
    ///
    /// Handles share the underlying gRPC channel, so handing a clone to each
    /// consumer is cheap.
    pub fn firestore(&self) -> FirestoreClient {
        self.firestore.clone()
    }

    /// Returns the authentication client.
    pub fn auth(&self) -> &FirebaseAuthClient {
        &self.auth
    }
}
