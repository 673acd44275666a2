use anyhow::Context;
use jsonwebtoken::{get_current_timestamp, Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::{error::FirebaseError, ServiceAccount};

/// Tokens are minted with a one hour lifetime, per the [Firebase API docs](https://firebase.google.com/docs/auth/admin/create-custom-tokens#create_custom_tokens_using_a_third-party_jwt_library).
const TOKEN_LIFETIME_SECS: u64 = 60 * 60;
/// A token is replaced this long before it actually expires, so a request
/// never goes out with a token that dies in flight.
const EXPIRY_BUFFER_SECS: u64 = 5 * 60;

/// Produces the self-signed JWTs that authenticate Firestore requests,
/// reusing a minted token until shortly before it expires.
#[derive(Clone)]
pub(super) struct FirestoreTokenProvider {
    service_account: ServiceAccount,
    current_token: Option<MintedToken>,
}

#[derive(Clone)]
struct MintedToken {
    jwt: String,
    /// Seconds since the Unix epoch at which we stop using this token.
    refresh_at: u64,
}

impl FirestoreTokenProvider {
    pub(super) fn new(service_account: ServiceAccount) -> Self {
        Self {
            service_account,
            current_token: None,
        }
    }

    pub(super) fn get_token(&mut self) -> Result<String, FirebaseError> {
        match &self.current_token {
            Some(token) if token.refresh_at > get_current_timestamp() => Ok(token.jwt.clone()),
            _ => {
                let token = mint_token(&self.service_account)?;
                let jwt = token.jwt.clone();
                self.current_token = Some(token);
                Ok(jwt)
            }
        }
    }
}

fn mint_token(service_account: &ServiceAccount) -> Result<MintedToken, anyhow::Error> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(service_account.private_key_id.clone());

    let issued_at_time = get_current_timestamp();
    let claims = FirestoreJwtClaims {
        iss: &service_account.client_email,
        sub: &service_account.client_email,
        aud: "https://firestore.googleapis.com/",
        iat: issued_at_time,
        exp: issued_at_time + TOKEN_LIFETIME_SECS,
        uid: &service_account.client_id,
    };

    let encoding_key = EncodingKey::from_rsa_pem(service_account.private_key.as_ref())
        .context("Failed to create JWT encoding key from the given private key")?;

    let jwt = jsonwebtoken::encode(&header, &claims, &encoding_key)
        .context("Failed to create Firestore JWT")?;

    Ok(MintedToken {
        jwt,
        refresh_at: claims.exp - EXPIRY_BUFFER_SECS,
    })
}

#[derive(Serialize)]
struct FirestoreJwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
    uid: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_service_account;

    #[test]
    fn reuses_token_until_it_nears_expiry() {
        let mut token_provider = FirestoreTokenProvider::new(test_service_account());

        let initial_token = token_provider.get_token().unwrap();

        // Wait so that a newly minted token would get a different issued-at
        // time and thereby different contents.
        std::thread::sleep(std::time::Duration::from_secs(1));

        // Some time passes, but the token is still comfortably valid.
        token_provider.current_token.as_mut().unwrap().refresh_at -= 50 * 60;
        let reused_token = token_provider.get_token().unwrap();
        assert_eq!(initial_token, reused_token);

        // Enough time passes that the refresh deadline is crossed.
        token_provider.current_token.as_mut().unwrap().refresh_at -= 10 * 60;
        let new_token = token_provider.get_token().unwrap();
        assert_ne!(initial_token, new_token);
    }
}
