//! # Kindling
//!
//! Kindling bootstraps the Firebase Admin services for a backend process. It
//! loads a service account from the environment, validates it, and hands you
//! ready-to-use clients for:
//!
//! - **Firestore**: the managed document database
//! - **Firebase Auth**: ID token verification and user management
//!
//! ## Quick start
//!
//! Put the service account JSON for your project (downloadable from the
//! Firebase console) into the `FIREBASE_SERVICE_ACCOUNT` environment variable
//! and initialise the app once at startup:
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kindling::{firestore::collection, FirebaseApp};
//!
//! let app = FirebaseApp::from_env().await?;
//!
//! // The document database handle
//! let mut db = app.firestore();
//! db.set_document(
//!     &collection("greetings").doc("first"),
//!     &serde_json::json!({ "message": "Hi Mom" }),
//! )
//! .await?;
//!
//! // The authentication handle
//! # let id_token = String::new();
//! let claims = app.auth().verify_id_token(&id_token).await?;
//! println!("Request was made by user {}", claims.user_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## No singletons
//!
//! Unlike the official Admin SDKs, there is no process-wide singleton and no
//! module-level mutable state. [`FirebaseApp::initialise`] gives you owned
//! client handles; pass them explicitly to whichever components need database
//! or auth access. Missing or malformed configuration surfaces as a single
//! typed [`ConfigError`](config::ConfigError) before any network-capable
//! client is built, so a broken deployment fails at startup rather than on
//! the first request.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod firestore;
mod service_account;

pub use app::FirebaseApp;
pub use config::AppConfig;
pub use service_account::ServiceAccount;

#[cfg(test)]
pub(crate) mod test_support;
