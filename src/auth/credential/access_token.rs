use anyhow::Context;
use jsonwebtoken::{get_current_timestamp, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ServiceAccount;

const GOOGLE_TOKEN_AUDIENCE: &str = "https://accounts.google.com/o/oauth2/token";
const GOOGLE_TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";

static OAUTH_SCOPES: Lazy<String> = Lazy::new(|| {
    [
        "https://www.googleapis.com/auth/cloud-platform",
        "https://www.googleapis.com/auth/identitytoolkit",
        "https://www.googleapis.com/auth/userinfo.email",
    ]
    .join(" ")
});

/// Exchanges the service account credentials for OAuth2 access tokens to the
/// identity-toolkit REST API, via the JWT-bearer grant. Tokens are cached
/// until they expire.
pub(crate) struct AccessTokenManager {
    service_account: ServiceAccount,
    current_access_token: RwLock<Option<AccessToken>>,
    http_client: reqwest::Client,
}

impl AccessTokenManager {
    pub(crate) fn new(service_account: ServiceAccount, http_client: reqwest::Client) -> Self {
        Self {
            service_account,
            current_access_token: RwLock::new(None),
            http_client,
        }
    }

    pub(crate) async fn get_access_token(&self) -> anyhow::Result<String> {
        match self.get_non_expired_token().await {
            Some(token) => Ok(token),
            None => {
                let mut token_guard = self.current_access_token.write().await;
                let access_token = self.fetch_access_token().await?;
                let token = access_token.access_token.clone();
                *token_guard = Some(access_token);
                Ok(token)
            }
        }
    }

    async fn get_non_expired_token(&self) -> Option<String> {
        match self.current_access_token.read().await.as_ref() {
            Some(token) if !token.has_expired() => Some(token.access_token.clone()),
            _ => None,
        }
    }

    #[tracing::instrument(name = "Fetch Auth access token", skip(self))]
    async fn fetch_access_token(&self) -> Result<AccessToken, anyhow::Error> {
        let jwt = self.create_auth_jwt()?;

        let post_data = format!(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer&assertion={}",
            jwt
        );

        let res = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(post_data)
            .send()
            .await
            .context("Failed to send auth token request to Google")?;

        anyhow::ensure!(
            res.status().is_success(),
            "Failed to get auth token from Google (status {}): {}",
            res.status(),
            res.text().await.unwrap_or_default()
        );

        let res_body = res
            .json::<AccessTokenResponse>()
            .await
            .context("Failed to read auth token response from Google")?;

        anyhow::ensure!(
            res_body.token_type == "Bearer",
            "Google did not return a Bearer token"
        );

        Ok(AccessToken {
            access_token: res_body.access_token,
            expires_at: get_current_timestamp() + res_body.expires_in,
        })
    }

    fn create_auth_jwt(&self) -> Result<String, anyhow::Error> {
        let issued_at_time = get_current_timestamp();

        let claims = Claims {
            scope: &OAUTH_SCOPES,
            aud: GOOGLE_TOKEN_AUDIENCE,
            iss: &self.service_account.client_email,
            iat: issued_at_time,
            exp: issued_at_time + (60 * 60),
        };

        let header = Header::new(Algorithm::RS256);
        let encoding_key = EncodingKey::from_rsa_pem(self.service_account.private_key.as_bytes())
            .context("Failed to create JWT encoding key from the given private key")?;

        jsonwebtoken::encode(&header, &claims, &encoding_key).context("Failed to encode JWT")
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    scope: &'a str,
    aud: &'a str,
    iss: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
    token_type: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    access_token: String,
    expires_at: u64,
}

impl AccessToken {
    fn has_expired(&self) -> bool {
        get_current_timestamp() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_service_account;

    #[test]
    fn signs_a_decodable_grant_jwt() {
        let manager = AccessTokenManager::new(test_service_account(), reqwest::Client::new());

        let jwt = manager.create_auth_jwt().unwrap();
        let header = jsonwebtoken::decode_header(&jwt).unwrap();

        assert_eq!(header.alg, Algorithm::RS256);
    }
}
