//! Service account credentials and the memoized Drive handle.
//!
//! `CredentialProvider::get_client` reads the credentials on every attempt
//! until one succeeds, then hands out the same `DriveAuth` for the rest of
//! the process. The handle wraps a `yup_oauth2` service account
//! authenticator that trades signed assertions for short-lived access tokens
//! restricted to read-only Drive access, and caches them until expiry.

use std::sync::Arc;

use data_encoding::{BASE64, BASE64_NOPAD};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::config::CredentialSettings;
use crate::error::{ConfigError, Result, SheetFinderError, UpstreamError};

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Where credentials come from. Read on every uncached `get_client` call.
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Result<CredentialSettings>;
}

/// Current process environment, falling back to the values from the config
/// file loaded at startup.
pub struct EnvCredentialSource {
    fallback: CredentialSettings,
}

impl EnvCredentialSource {
    pub fn new(fallback: CredentialSettings) -> Self {
        Self { fallback }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn load(&self) -> Result<CredentialSettings> {
        Ok(CredentialSettings::from_env()?.or(&self.fallback))
    }
}

#[derive(Deserialize)]
struct ServiceAccountJson {
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A service account key, not yet checked by the signer.
pub struct ServiceAccount {
    key: ServiceAccountKey,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.key.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// The base64 bundle wins when both shapes are configured.
    pub fn from_settings(settings: &CredentialSettings) -> Result<Self> {
        if let Some(ref bundle) = settings.credentials_base64 {
            return Self::from_base64_bundle(bundle);
        }

        match (&settings.service_account_email, &settings.private_key) {
            (Some(email), Some(key)) => Self::from_parts(email, key, DEFAULT_TOKEN_URI),
            _ => Err(ConfigError::MissingCredentials.into()),
        }
    }

    pub fn from_base64_bundle(encoded: &str) -> Result<Self> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(compact.as_bytes())
            .or_else(|_| BASE64_NOPAD.decode(compact.trim_end_matches('=').as_bytes()))
            .map_err(|e| malformed(format!("credentials bundle is not valid base64: {}", e)))?;

        let json: ServiceAccountJson = serde_json::from_slice(&bytes)
            .map_err(|e| malformed(format!("credentials bundle is not valid JSON: {}", e)))?;

        let email = json
            .client_email
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| malformed("credentials bundle has no client_email".to_string()))?;
        let key = json
            .private_key
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| malformed("credentials bundle has no private_key".to_string()))?;
        let token_uri = json
            .token_uri
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Self::from_parts(&email, &key, &token_uri)
    }

    pub fn from_parts(client_email: &str, private_key_pem: &str, token_uri: &str) -> Result<Self> {
        let client_email = client_email.trim();
        if client_email.is_empty() {
            return Err(malformed("service account email is empty".to_string()));
        }

        // Dashboards often store the PEM with literal "\n" sequences
        let private_key = private_key_pem.replace("\\n", "\n");
        if !private_key.contains("PRIVATE KEY-----") {
            return Err(malformed("private key is not a PEM block".to_string()));
        }

        let key: ServiceAccountKey = serde_json::from_value(serde_json::json!({
            "type": "service_account",
            "client_email": client_email,
            "private_key": private_key,
            "token_uri": token_uri,
        }))
        .map_err(|e| malformed(format!("service account key rejected: {}", e)))?;

        Ok(Self { key })
    }

    #[cfg(test)]
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    #[cfg(test)]
    pub fn token_uri(&self) -> &str {
        &self.key.token_uri
    }
}

fn malformed(reason: String) -> SheetFinderError {
    ConfigError::MalformedCredentials { reason }.into()
}

/// Authenticated read-only Drive handle. The authenticator caches tokens.
pub struct DriveAuth {
    client_email: String,
    authenticator: DefaultAuthenticator,
}

impl DriveAuth {
    /// Build the authenticator. A key the signer cannot load is reported as
    /// malformed credentials.
    pub async fn connect(account: ServiceAccount) -> Result<Self> {
        let client_email = account.key.client_email.clone();
        let authenticator = ServiceAccountAuthenticator::builder(account.key)
            .build()
            .await
            .map_err(|e| malformed(format!("private key rejected: {}", e)))?;

        Ok(Self {
            client_email,
            authenticator,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Bearer token for Drive calls.
    pub async fn access_token(&self) -> Result<String> {
        debug!("Requesting a Drive access token");
        let token = self
            .authenticator
            .token(&[DRIVE_READONLY_SCOPE])
            .await
            .map_err(|e| {
                warn!("Token endpoint rejected the assertion: {}", e);
                UpstreamError::Auth {
                    message: e.to_string(),
                }
            })?;

        match token.token() {
            Some(value) => Ok(value.to_string()),
            None => Err(UpstreamError::Auth {
                message: "token response carried no access token".to_string(),
            }
            .into()),
        }
    }
}

/// Lazily builds and memoizes the `DriveAuth` handle.
pub struct CredentialProvider {
    source: Arc<dyn CredentialSource>,
    handle: OnceCell<Arc<DriveAuth>>,
}

impl CredentialProvider {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            handle: OnceCell::new(),
        }
    }

    /// Concurrent first calls are serialized by the cell. A failure leaves
    /// the cell empty so the next call starts over.
    pub async fn get_client(&self) -> Result<Arc<DriveAuth>> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let settings = self.source.load()?;
                let account = ServiceAccount::from_settings(&settings)?;
                let auth = DriveAuth::connect(account).await?;
                info!("Drive client initialized for {}", auth.client_email());
                Ok::<_, SheetFinderError>(Arc::new(auth))
            })
            .await?;

        Ok(handle.clone())
    }

    /// Whether credentials are currently present, without validating them.
    pub fn is_configured(&self) -> bool {
        self.handle.initialized()
            || self
                .source
                .load()
                .map(|settings| settings.is_configured())
                .unwrap_or(false)
    }
}
