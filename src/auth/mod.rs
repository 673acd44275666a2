//! # Firebase Auth
//!
//! Admin client for the identity service of a Firebase project: verify the ID
//! tokens your frontend sends along with its requests, mint custom tokens,
//! and manage user accounts.
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kindling::auth::models::NewUser;
//!
//! let app = kindling::FirebaseApp::from_env().await?;
//! let auth = app.auth();
//!
//! let user_id = auth
//!     .create_user(NewUser {
//!         email: "caesar@rome.it".to_string(),
//!         password: "venividivici".to_string(),
//!         display_name: Some("Julius Caesar".to_string()),
//!     })
//!     .await?;
//!
//! let user = auth.get_user(&user_id).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::FirebaseError;
use crate::ServiceAccount;

use self::credential::{AccessTokenManager, UserTokenManager};
use self::error::AuthApiError;
use self::models::{IdTokenClaims, NewUser, User};

mod credential;
mod error;
pub mod models;

/// Admin client for Firebase Auth.
///
/// Obtained from [`FirebaseApp::auth`](crate::FirebaseApp::auth) or
/// constructed directly with [`FirebaseAuthClient::new`]. Methods take
/// `&self`; the client can be shared freely behind a reference.
pub struct FirebaseAuthClient {
    http_client: reqwest::Client,
    api_url: String,
    access_tokens: AccessTokenManager,
    user_tokens: UserTokenManager,
}

impl FirebaseAuthClient {
    /// Creates an authentication client for the project the service account
    /// belongs to. No network traffic happens until the first call; the
    /// OAuth token for the REST API is fetched lazily.
    pub fn new(service_account: ServiceAccount) -> Result<Self, FirebaseError> {
        let http_client = reqwest::Client::builder()
            .https_only(true)
            .build()
            .context("Failed to create HTTP client")?;

        let api_url = format!(
            "https://identitytoolkit.googleapis.com/v1/projects/{}/accounts",
            service_account.project_id
        );
        let user_tokens = UserTokenManager::new(service_account.clone(), http_client.clone());
        let access_tokens = AccessTokenManager::new(service_account, http_client.clone());

        Ok(Self {
            http_client,
            api_url,
            access_tokens,
            user_tokens,
        })
    }

    fn url(&self, action: &str) -> String {
        format!("{}{}", self.api_url, action)
    }

    /// Verifies an ID token as minted by a Firebase client SDK signing in.
    ///
    /// Fails if the token is in a bad format, expired, not issued for this
    /// project, or if the signature does not check out against Google's
    /// current public keys.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<IdTokenClaims, FirebaseError> {
        self.user_tokens
            .decode_id_token(id_token)
            .await
            .map_err(FirebaseError::ValidateTokenError)
    }

    /// Creates and signs a custom token for the given user ID, which a client
    /// can exchange for an ID token by signing in with it.
    pub fn create_custom_token(&self, user_id: &str) -> Result<String, FirebaseError> {
        self.user_tokens
            .create_custom_token(user_id)
            .map_err(FirebaseError::Other)
    }

    /// Creates a new user account and returns its ID.
    ///
    /// Fails with [`EmailAlreadyExists`](FirebaseError::EmailAlreadyExists)
    /// if the email address is already taken.
    pub async fn create_user(&self, new_user: NewUser) -> Result<String, FirebaseError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SignUpResponse {
            local_id: String,
        }

        let mut body = serde_json::json!({
            "email": new_user.email,
            "password": new_user.password,
        });
        if let Some(display_name) = new_user.display_name {
            body["displayName"] = display_name.into();
        }

        let response: SignUpResponse = self.post(self.url(""), &body).await?;

        Ok(response.local_id)
    }

    /// Looks up a user by ID, returning `None` if no such user exists.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, FirebaseError> {
        #[derive(Deserialize)]
        struct LookupResponse {
            #[serde(default)]
            users: Vec<User>,
        }

        let body = serde_json::json!({ "localId": [user_id] });

        let mut response: LookupResponse = self.post(self.url(":lookup"), &body).await?;

        Ok(response.users.pop())
    }

    /// Deletes a user account.
    ///
    /// Fails with [`UserNotFound`](FirebaseError::UserNotFound) if there is
    /// no user with the given ID.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), FirebaseError> {
        #[derive(Deserialize)]
        struct DeleteResponse {}

        let body = serde_json::json!({ "localId": user_id });

        let DeleteResponse {} = self.post(self.url(":delete"), &body).await?;

        Ok(())
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, FirebaseError> {
        let access_token = self
            .access_tokens
            .get_access_token()
            .await
            .context("Failed to authorize request to Firebase Auth")?;

        let res = self
            .http_client
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .context("Failed to send request to Firebase Auth")?;

        if res.status().is_success() {
            let response = res
                .json()
                .await
                .context("Failed to read response from Firebase Auth")?;
            Ok(response)
        } else {
            let api_error: AuthApiError = res
                .json()
                .await
                .context("Failed to read error response from Firebase Auth")?;
            Err(api_error.into())
        }
    }
}
