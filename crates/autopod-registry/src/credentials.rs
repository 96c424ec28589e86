//! Credential storage and push tagging.

use crate::auth::{registry_to_url, AuthClient};
use crate::error::{RegistryError, Result};
use autopod_runtime::ContainerRuntime;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

/// One registry login. The secret is held behind [`SecretString`] so it
/// cannot leak through `Debug` output or logs.
pub struct RegistryCredential {
    /// Registry hostname.
    pub registry: String,
    /// Account name.
    pub username: String,
    /// When the login was validated.
    pub logged_in_at: DateTime<Utc>,
    secret: SecretString,
}

/// Login state for one registry, as reported to callers. Deliberately has
/// no secret field.
#[derive(Debug, Clone, Serialize)]
pub struct LoginStatus {
    pub logged_in: bool,
    pub username: Option<String>,
}

/// Result of a successful push.
#[derive(Debug, Clone, Serialize)]
pub struct PushReceipt {
    /// Fully qualified name the image was pushed as.
    pub tagged_name: String,
    /// Registry base URL.
    pub registry_url: String,
    /// Command a consumer can run to pull the image.
    pub pull_command: String,
}

/// Stores registry logins and performs authenticated pushes.
///
/// One active credential per registry; re-login overwrites, logout clears.
pub struct CredentialManager {
    credentials: RwLock<HashMap<String, RegistryCredential>>,
    auth: AuthClient,
}

impl CredentialManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(HashMap::new()),
            auth: AuthClient::new(),
        }
    }

    /// Validates credentials against the registry and stores them.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the registry rejects the credentials,
    /// `Unavailable` if it cannot be reached.
    pub async fn login(
        &self,
        registry: &str,
        username: &str,
        secret: SecretString,
    ) -> Result<()> {
        self.auth
            .validate(registry, username, secret.expose_secret())
            .await?;

        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| RegistryError::Protocol("lock poisoned".to_string()))?;
        credentials.insert(
            registry.to_string(),
            RegistryCredential {
                registry: registry.to_string(),
                username: username.to_string(),
                logged_in_at: Utc::now(),
                secret,
            },
        );
        info!(registry, username, "registry login stored");
        Ok(())
    }

    /// Stores a credential without contacting the registry. Test seam.
    #[cfg(any(test, feature = "testing"))]
    pub fn seed_credential(&self, registry: &str, username: &str, secret: SecretString) {
        self.credentials.write().unwrap().insert(
            registry.to_string(),
            RegistryCredential {
                registry: registry.to_string(),
                username: username.to_string(),
                logged_in_at: Utc::now(),
                secret,
            },
        );
    }

    /// Clears the stored credential for a registry. Logging out of a
    /// registry that was never logged in is a no-op.
    pub fn logout(&self, registry: &str) -> Result<()> {
        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| RegistryError::Protocol("lock poisoned".to_string()))?;
        if credentials.remove(registry).is_some() {
            info!(registry, "registry login cleared");
        }
        Ok(())
    }

    /// Reports login state for a registry. Never includes the secret.
    #[must_use]
    pub fn status(&self, registry: &str) -> LoginStatus {
        let credentials = match self.credentials.read() {
            Ok(c) => c,
            Err(_) => {
                return LoginStatus {
                    logged_in: false,
                    username: None,
                }
            }
        };
        match credentials.get(registry) {
            Some(c) => LoginStatus {
                logged_in: true,
                username: Some(c.username.clone()),
            },
            None => LoginStatus {
                logged_in: false,
                username: None,
            },
        }
    }

    /// Pushes a local image to a registry under the stored identity.
    ///
    /// The push name is decided here, at push time, so the same local image
    /// can be pushed to multiple identities:
    /// `registry/username/imageName:latest`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a prior successful login for the
    /// registry.
    pub async fn push(
        &self,
        image: &str,
        registry: &str,
        runtime: &dyn ContainerRuntime,
    ) -> Result<PushReceipt> {
        let (username, secret) = {
            let credentials = self
                .credentials
                .read()
                .map_err(|_| RegistryError::Protocol("lock poisoned".to_string()))?;
            let credential = credentials.get(registry).ok_or_else(|| {
                RegistryError::unauthenticated(format!("push requires a prior {registry} login"))
            })?;
            (
                credential.username.clone(),
                credential.secret.expose_secret().to_string(),
            )
        };

        let tagged_name = tagged_name(registry, &username, image);
        runtime.tag_image(image, &tagged_name).await?;
        runtime
            .push(&tagged_name, Some((&username, &secret)))
            .await?;
        info!(image, tagged = %tagged_name, "image pushed");

        Ok(PushReceipt {
            pull_command: format!("docker pull {tagged_name}"),
            registry_url: registry_to_url(registry),
            tagged_name,
        })
    }
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the push name for an image: `registry/username/imageName:latest`.
/// Any registry prefix or tag on the local name is discarded.
#[must_use]
pub fn tagged_name(registry: &str, username: &str, image: &str) -> String {
    let base = image
        .rsplit('/')
        .next()
        .unwrap_or(image)
        .split(':')
        .next()
        .unwrap_or(image);
    format!("{registry}/{username}/{base}:latest")
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopod_runtime::testing::InMemoryRuntime;

    #[test]
    fn tagging_convention() {
        assert_eq!(
            tagged_name("docker.io", "alice", "demo"),
            "docker.io/alice/demo:latest"
        );
        assert_eq!(
            tagged_name("docker.io", "alice", "localhost/demo:build-3"),
            "docker.io/alice/demo:latest"
        );
    }

    #[tokio::test]
    async fn push_without_login_is_unauthenticated() {
        let manager = CredentialManager::new();
        let runtime = InMemoryRuntime::new();

        let err = manager.push("demo", "docker.io", &runtime).await.unwrap_err();
        assert!(matches!(err, RegistryError::Unauthenticated(_)));
        assert!(runtime.pushed_images().is_empty());
    }

    #[tokio::test]
    async fn push_after_login_uses_push_time_tagging() {
        let manager = CredentialManager::new();
        manager.seed_credential("docker.io", "alice", SecretString::from("hunter2".to_string()));
        let runtime = InMemoryRuntime::new();

        let receipt = manager.push("demo", "docker.io", &runtime).await.unwrap();
        assert_eq!(receipt.tagged_name, "docker.io/alice/demo:latest");
        assert_eq!(runtime.pushed_images(), vec!["docker.io/alice/demo:latest"]);
        assert!(receipt.pull_command.ends_with("docker.io/alice/demo:latest"));
    }

    #[test]
    fn logout_clears_login_state() {
        let manager = CredentialManager::new();
        manager.seed_credential("docker.io", "alice", SecretString::from("hunter2".to_string()));
        assert!(manager.status("docker.io").logged_in);

        manager.logout("docker.io").unwrap();
        let status = manager.status("docker.io");
        assert!(!status.logged_in);
        assert!(status.username.is_none());

        // Logging out twice is fine.
        manager.logout("docker.io").unwrap();
    }
}
