use std::sync::Arc;

use crate::config::{Config, QueryMode};
use crate::core::services::credentials::{CredentialProvider, EnvCredentialSource};
use crate::core::services::drive::{DriveGateway, FileStore};
use crate::core::services::gemini::{CompletionModel, GeminiClient};
use crate::error::Result;

/// Builds the outbound clients from configuration. All of them share one
/// connection pool.
pub struct ClientFactory {
    config: Arc<Config>,
}

impl ClientFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// No per-call timeout: the request deadline bounds the whole search.
    pub fn create_http_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sheet-finder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))?;

        Ok(client)
    }

    pub fn create_credential_provider(&self) -> Arc<CredentialProvider> {
        let source = EnvCredentialSource::new(self.config.credentials.clone());
        Arc::new(CredentialProvider::new(Arc::new(source)))
    }

    pub fn create_file_store(
        &self,
        http: reqwest::Client,
        credentials: Arc<CredentialProvider>,
    ) -> Arc<dyn FileStore> {
        Arc::new(DriveGateway::new(http, &self.config.drive_base_url, credentials))
    }

    /// `None` in direct mode or when no API key is configured.
    pub fn create_completion_model(&self, http: reqwest::Client) -> Option<Arc<dyn CompletionModel>> {
        if self.config.query_mode == QueryMode::Direct {
            return None;
        }

        let api_key = self.config.gemini_api_key.as_deref()?;
        let model: Arc<dyn CompletionModel> = Arc::new(GeminiClient::new(
            http,
            &self.config.gemini_base_url,
            &self.config.gemini_model,
            api_key,
        ));
        Some(model)
    }
}
