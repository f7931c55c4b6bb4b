use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, QueryMode};
use crate::core::model::{DriveFile, SearchRequest};
use crate::core::search::{self, SearchOutcome, SearchPipeline};
use crate::core::services::credentials::CredentialProvider;
use crate::core::services::drive::FileStore;
use crate::core::services::gemini::CompletionModel;
use crate::core::translator::QueryTranslator;
use crate::error::{Result, SheetFinderError};
use crate::services::ClientFactory;

/// Configuration status reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Everything a request handler needs, built once at startup.
pub struct AppServices {
    config: Arc<Config>,
    credentials: Arc<CredentialProvider>,
    store: Arc<dyn FileStore>,
    pipeline: Option<SearchPipeline>,
    request_deadline: Duration,
}

impl AppServices {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let factory = ClientFactory::new(config.clone());

        let http = factory.create_http_client()?;
        let credentials = factory.create_credential_provider();
        let store = factory.create_file_store(http.clone(), credentials.clone());
        let model = factory.create_completion_model(http);

        Ok(Self::from_parts(config, credentials, store, model))
    }

    /// Assemble from prebuilt collaborators. The search pipeline is only
    /// built when the folder id and, in model mode, the model are present.
    pub fn from_parts(
        config: Arc<Config>,
        credentials: Arc<CredentialProvider>,
        store: Arc<dyn FileStore>,
        model: Option<Arc<dyn CompletionModel>>,
    ) -> Self {
        let translator = match config.query_mode {
            QueryMode::Model => model.map(|m| QueryTranslator::new(m, config.enforce_folder_scope)),
            QueryMode::Direct => None,
        };

        let pipeline = match (config.drive_folder_id.as_deref(), config.query_mode, translator) {
            (Some(folder), QueryMode::Direct, _) => Some(SearchPipeline::new(
                None,
                store.clone(),
                folder,
                config.search_page_size,
            )),
            (Some(folder), QueryMode::Model, Some(translator)) => Some(SearchPipeline::new(
                Some(translator),
                store.clone(),
                folder,
                config.search_page_size,
            )),
            _ => None,
        };

        match pipeline {
            Some(ref p) => info!("Search ready in {} mode for folder {}", p.mode(), p.folder_id()),
            None => warn!("Search is not available until the missing settings are provided"),
        }

        Self {
            request_deadline: Duration::from_secs(config.request_deadline_secs),
            config,
            credentials,
            store,
            pipeline,
        }
    }

    #[cfg(test)]
    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline = deadline;
        self
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn pipeline(&self) -> Result<&SearchPipeline> {
        if let Some(ref pipeline) = self.pipeline {
            return Ok(pipeline);
        }

        self.config.require_folder_id()?;
        self.config.require_gemini_api_key()?;
        Err(anyhow::anyhow!("search pipeline is not configured").into())
    }

    /// One search under the request deadline. Validation happens before the
    /// configuration check so an empty request is always a 400.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        request.validate()?;
        let pipeline = self.pipeline()?;

        match tokio::time::timeout(self.request_deadline, pipeline.run_detailed(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Search exceeded the {:?} deadline", self.request_deadline);
                Err(SheetFinderError::Timeout {
                    seconds: self.request_deadline.as_secs(),
                })
            }
        }
    }

    pub async fn enumerate_folder(&self) -> Result<Vec<DriveFile>> {
        let folder_id = self.config.require_folder_id()?;
        search::enumerate_folder(self.store.as_ref(), folder_id).await
    }

    /// An unset secret never authorizes.
    pub fn rebuild_authorized(&self, supplied: Option<&str>) -> bool {
        match (self.config.rebuild_secret.as_deref(), supplied) {
            (Some(expected), Some(supplied)) => {
                ring::constant_time::verify_slices_are_equal(expected.as_bytes(), supplied.as_bytes()).is_ok()
            }
            _ => false,
        }
    }

    /// Configuration presence only. Makes no outbound calls.
    pub fn health(&self) -> HealthReport {
        let missing = self.config.missing_settings(self.credentials.is_configured());
        if missing.is_empty() {
            HealthReport {
                status: "ok",
                message: None,
            }
        } else {
            HealthReport {
                status: "error",
                message: Some(format!("Missing environment variables: {}", missing.join(", "))),
            }
        }
    }

    /// Initialize the Drive handle and fetch one access token.
    pub async fn auth_check(&self) -> Result<String> {
        let auth = self.credentials.get_client().await?;
        auth.access_token().await?;
        info!("Credential check passed for {}", auth.client_email());
        Ok(format!("Drive client initialized for {}", auth.client_email()))
    }
}
