use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::sync::RwLock;

/// Fallback refresh interval when Google's response carries no usable
/// `Cache-Control: max-age` directive.
const DEFAULT_MAX_AGE_SECS: u64 = 5 * 60;

/// The x509 public key certificates that Firebase signs ID tokens with,
/// fetched from Google's PKI endpoint and cached for as long as the response
/// headers allow.
pub(crate) struct PublicKeys {
    public_key_map: RwLock<Option<PublicKeyMap>>,
    http_client: reqwest::Client,
}

impl PublicKeys {
    pub(crate) fn new(http_client: reqwest::Client) -> Self {
        Self {
            public_key_map: RwLock::new(None),
            http_client,
        }
    }

    /// Returns the PEM-encoded public key with the given ID, or `None` if
    /// Google currently advertises no such key.
    pub(crate) async fn get(&self, key_id: &str) -> Result<Option<String>, anyhow::Error> {
        if self.should_update().await {
            self.update().await?;
        }

        let public_key_map = self.public_key_map.read().await;

        let key = public_key_map
            .as_ref()
            .context("Public key map was not present")?
            .keys
            .get(key_id)
            .map(|s| s.to_owned());

        Ok(key)
    }

    async fn update(&self) -> Result<(), anyhow::Error> {
        let mut public_key_map = self.public_key_map.write().await;

        let pkm = PublicKeyMap::fetch(&self.http_client).await.map_err(|e| {
            tracing::error!("Failed to fetch public keys: {}", e);
            e
        })?;

        *public_key_map = Some(pkm);

        Ok(())
    }

    async fn should_update(&self) -> bool {
        match self.public_key_map.read().await.as_ref() {
            None => true,
            Some(pkm) if Instant::now() >= pkm.update_by => true,
            _ => false,
        }
    }
}

struct PublicKeyMap {
    update_by: Instant,
    keys: HashMap<String, String>,
}

impl PublicKeyMap {
    const PUBLIC_KEYS_URL: &'static str =
        "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

    async fn fetch(client: &reqwest::Client) -> Result<Self, anyhow::Error> {
        tracing::debug!("Refreshing x509 public key certificates from Google");

        let res = client.get(Self::PUBLIC_KEYS_URL).send().await?;

        anyhow::ensure!(
            res.status().is_success(),
            "Google PKI returned status {}",
            res.status()
        );

        let max_age = res
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_MAX_AGE_SECS);

        let certificates = res.json::<HashMap<String, String>>().await?;
        let mut public_keys = HashMap::with_capacity(certificates.len());

        for (key_id, certificate_pem) in certificates {
            let certificate = openssl::x509::X509::from_pem(certificate_pem.as_bytes())?;
            let public_key_bytes = certificate.public_key()?.public_key_to_pem()?;
            let public_key = String::from_utf8(public_key_bytes)?;
            public_keys.insert(key_id, public_key);
        }

        Ok(Self {
            update_by: Instant::now() + Duration::from_secs(max_age),
            keys: public_keys,
        })
    }
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|seconds| seconds.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_max_age_directives() {
        assert_eq!(
            parse_max_age("public, max-age=21600, must-revalidate, no-transform"),
            Some(21600)
        );
        assert_eq!(parse_max_age("max-age=0"), Some(0));
        assert_eq!(parse_max_age("no-store"), None);
        assert_eq!(parse_max_age("max-age=not-a-number"), None);
    }
}
