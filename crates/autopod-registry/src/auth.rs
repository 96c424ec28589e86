//! Docker Registry v2 authentication.
//!
//! Supports Docker Hub and OCI-compliant registries with token
//! authentication.

use crate::error::{RegistryError, Result};
use reqwest::{Client, StatusCode, header};
use tracing::debug;

/// Docker Hub registry URL.
const DOCKER_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// WWW-Authenticate challenge parsed from a 401 response.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    pub service: String,
}

/// Parses a `Bearer realm="...",service="..."` challenge header.
pub fn parse_challenge(header: &str) -> Result<AuthChallenge> {
    let rest = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| RegistryError::Protocol(format!("unsupported auth challenge: {header}")))?;

    let mut challenge = AuthChallenge::default();
    for part in rest.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        let value = value.trim_matches('"');
        match key {
            "realm" => challenge.realm = value.to_string(),
            "service" => challenge.service = value.to_string(),
            _ => {}
        }
    }

    if challenge.realm.is_empty() {
        return Err(RegistryError::Protocol(format!(
            "auth challenge missing realm: {header}"
        )));
    }
    Ok(challenge)
}

/// Converts a registry hostname to a base URL.
#[must_use]
pub fn registry_to_url(registry: &str) -> String {
    match registry {
        "docker.io" => DOCKER_REGISTRY_URL.to_string(),
        r if r.starts_with("http://") || r.starts_with("https://") => r.to_string(),
        r => format!("https://{r}"),
    }
}

/// Minimal registry client used to prove credentials at login time.
pub struct AuthClient {
    client: Client,
}

impl AuthClient {
    /// Creates the client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("autopod/0.1")
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }

    /// Validates credentials against a registry.
    ///
    /// Probes `/v2/`; a 401 carries the token-service challenge, which is
    /// followed with basic auth. A token grant proves the credentials.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when the registry rejects the credentials
    /// and `Unavailable` when it cannot be reached.
    pub async fn validate(&self, registry: &str, username: &str, secret: &str) -> Result<()> {
        let base = registry_to_url(registry);
        let probe = self
            .client
            .get(format!("{base}/v2/"))
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        if probe.status().is_success() {
            // Registry does not require auth; accept the login as-is.
            debug!(registry, "registry accepts anonymous access");
            return Ok(());
        }
        if probe.status() != StatusCode::UNAUTHORIZED {
            return Err(RegistryError::Protocol(format!(
                "unexpected status probing {base}/v2/: {}",
                probe.status()
            )));
        }

        let challenge = probe
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                RegistryError::Protocol("401 without WWW-Authenticate challenge".to_string())
            })
            .and_then(parse_challenge)?;

        let token = self
            .client
            .get(&challenge.realm)
            .query(&[("service", challenge.service.as_str()), ("account", username)])
            .basic_auth(username, Some(secret))
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        if token.status().is_success() {
            Ok(())
        } else {
            Err(RegistryError::unauthenticated(format!(
                "registry {registry} rejected credentials for {username}"
            )))
        }
    }
}

impl Default for AuthClient {
    fn default() -> Self {
        Self::new()
    }
}
