use anyhow::Context;
use jsonwebtoken::{get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::models::IdTokenClaims;
use crate::ServiceAccount;

use super::public_keys::PublicKeys;

const FIREBASE_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Verifies ID tokens issued to users of the project and mints custom tokens
/// for them.
pub(crate) struct UserTokenManager {
    public_keys: PublicKeys,
    service_account: ServiceAccount,
}

impl UserTokenManager {
    pub(crate) fn new(service_account: ServiceAccount, http_client: reqwest::Client) -> Self {
        Self {
            public_keys: PublicKeys::new(http_client),
            service_account,
        }
    }

    /// Verifies an ID token based on the docs at <https://firebase.google.com/docs/auth/admin/verify-id-tokens#verify_id_tokens_using_a_third-party_jwt_library>
    ///
    /// Fails if the token is in a bad format, expired, not issued for this
    /// project, or if the signature is invalid.
    pub(crate) async fn decode_id_token(&self, token: &str) -> Result<IdTokenClaims, anyhow::Error> {
        let header = jsonwebtoken::decode_header(token).context("Invalid ID token format")?;

        if header.alg != Algorithm::RS256 {
            anyhow::bail!("Invalid ID token JWT algorithm");
        }

        let public_key_id = header
            .kid
            .context("ID token is missing public key ID in header")?;

        let public_key = self
            .public_keys
            .get(&public_key_id)
            .await?
            .context("Unrecognized public key in header of ID token")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.service_account.project_id]);
        validation.set_issuer(&[&format!(
            "https://securetoken.google.com/{}",
            &self.service_account.project_id
        )]);

        let decoded = jsonwebtoken::decode::<IdTokenClaims>(
            token,
            &DecodingKey::from_rsa_pem(public_key.as_ref())
                .context("Invalid public key format in ID token")?,
            &validation,
        )
        .context("Failed to decode ID token")?;

        Ok(decoded.claims)
    }

    /// Creates and signs a custom token for a user ID, which the user can use
    /// to authenticate against Firebase services.
    ///
    /// See the official [Firebase Auth docs for creating custom tokens](https://firebase.google.com/docs/auth/admin/create-custom-tokens#create_custom_tokens_using_a_third-party_jwt_library).
    pub(crate) fn create_custom_token(&self, uid: &str) -> Result<String, anyhow::Error> {
        let issued_at_time = get_current_timestamp();

        let claims = CustomTokenClaims {
            iss: &self.service_account.client_email,
            sub: &self.service_account.client_email,
            aud: FIREBASE_AUDIENCE,
            iat: issued_at_time,
            exp: issued_at_time + (60 * 60),
            uid,
        };

        let header = Header::new(Algorithm::RS256);
        let encoding_key = EncodingKey::from_rsa_pem(self.service_account.private_key.as_bytes())
            .context("Failed to create JWT encoding key from the given private key")?;

        jsonwebtoken::encode(&header, &claims, &encoding_key)
            .context("Failed to create custom token JWT")
    }
}

#[derive(Serialize)]
struct CustomTokenClaims<'a> {
    aud: &'a str,
    iat: u64,
    exp: u64,
    iss: &'a str,
    sub: &'a str,
    uid: &'a str,
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::test_support::{test_service_account, TEST_PUBLIC_KEY};

    fn manager() -> UserTokenManager {
        UserTokenManager::new(test_service_account(), reqwest::Client::new())
    }

    #[tokio::test]
    async fn rejects_garbage_tokens() {
        let result = manager().decode_id_token("not-a-jwt").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_non_rs256_tokens() {
        // Signed with HS256, which Firebase never uses for ID tokens.
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "user_id": "mallory", "exp": get_current_timestamp() + 60 }),
            &EncodingKey::from_secret(b"guessable"),
        )
        .unwrap();

        let err = manager().decode_id_token(&token).await.unwrap_err();
        assert!(err.to_string().contains("JWT algorithm"));
    }

    #[test]
    fn custom_tokens_verify_against_the_key_pair() {
        #[derive(Debug, Deserialize)]
        struct Claims {
            uid: String,
            iss: String,
        }

        let token = manager().create_custom_token("some-user-id").unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[FIREBASE_AUDIENCE]);

        let decoded = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.uid, "some-user-id");
        assert_eq!(
            decoded.claims.iss,
            "firebase-adminsdk@test-project.iam.gserviceaccount.com"
        );
    }
}
