use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use directories::ProjectDirs;
use tracing::debug;

use crate::error::{ConfigError, Result};

pub mod env;
pub mod validation;

use env::{EnvParser, EnvVars};
use validation::ConfigValidator;

/// Largest page the interactive search path may request.
pub const MAX_SEARCH_PAGE_SIZE: u32 = 50;

/// How the Drive query string is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Ask the hosted language model to write the query.
    #[default]
    Model,
    /// Build the query from the structured fields without a model call.
    Direct,
}

impl FromStr for QueryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" | "llm" => Ok(QueryMode::Model),
            "direct" => Ok(QueryMode::Direct),
            other => Err(ConfigError::InvalidValue {
                field: "query_mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Model => write!(f, "model"),
            QueryMode::Direct => write!(f, "direct"),
        }
    }
}

/// Service account credentials in either of the two accepted shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub service_account_email: Option<String>,
    pub private_key: Option<String>,
    /// Base64-encoded service account JSON bundle
    pub credentials_base64: Option<String>,
}

impl CredentialSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            service_account_email: EnvParser::parse_string(EnvVars::SERVICE_ACCOUNT_EMAIL)?,
            private_key: EnvParser::parse_string(EnvVars::PRIVATE_KEY)?,
            credentials_base64: EnvParser::parse_string(EnvVars::CREDENTIALS_BASE64)?,
        })
    }

    /// Fill unset fields from `fallback`.
    pub fn or(self, fallback: &CredentialSettings) -> Self {
        Self {
            service_account_email: self.service_account_email.or_else(|| fallback.service_account_email.clone()),
            private_key: self.private_key.or_else(|| fallback.private_key.clone()),
            credentials_base64: self.credentials_base64.or_else(|| fallback.credentials_base64.clone()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials_base64.is_some()
            || (self.service_account_email.is_some() && self.private_key.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// Gemini model used for query translation
    pub gemini_model: String,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Drive folder every query is scoped to
    pub drive_folder_id: Option<String>,

    /// Drive API base URL
    pub drive_base_url: String,

    pub credentials: CredentialSettings,

    /// Shared secret for the bulk enumeration endpoint
    pub rebuild_secret: Option<String>,

    pub bind_address: String,

    pub port: u16,

    /// Page cap for interactive search
    pub search_page_size: u32,

    /// Wall-clock ceiling for one search request, in seconds
    pub request_deadline_secs: u64,

    pub query_mode: QueryMode,

    /// Reject model output that lost the folder restriction
    pub enforce_folder_scope: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            drive_folder_id: None,
            drive_base_url: "https://www.googleapis.com".to_string(),
            credentials: CredentialSettings::default(),
            rebuild_secret: None,
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            search_page_size: MAX_SEARCH_PAGE_SIZE,
            request_deadline_secs: 10,
            query_mode: QueryMode::Model,
            enforce_folder_scope: true,
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Try to load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        let config_file = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::FileNotFound { path }.into());
                }
                Some(path)
            }
            None => Self::default_config_path().filter(|p| p.exists()),
        };

        if let Some(ref path) = config_file {
            debug!("Loading configuration from {}", path.display());
            config = Self::from_file(path)?;
        }

        // Environment variables have the highest priority
        config.load_from_env()?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    fn load_from_env(&mut self) -> Result<()> {
        if let Some(key) = EnvParser::parse_first(&[EnvVars::GEMINI_API_KEY, EnvVars::GEMINI_API_KEY_LEGACY])? {
            self.gemini_api_key = Some(key);
        }

        if let Some(model) = EnvParser::parse_string(EnvVars::GEMINI_MODEL)? {
            self.gemini_model = model;
        }

        if let Some(url) = EnvParser::parse_string(EnvVars::GEMINI_BASE_URL)? {
            self.gemini_base_url = url;
        }

        if let Some(folder) = EnvParser::parse_string(EnvVars::DRIVE_FOLDER_ID)? {
            self.drive_folder_id = Some(folder);
        }

        if let Some(url) = EnvParser::parse_string(EnvVars::DRIVE_BASE_URL)? {
            self.drive_base_url = url;
        }

        self.credentials = CredentialSettings::from_env()?.or(&self.credentials);

        if let Some(secret) = EnvParser::parse_string(EnvVars::REBUILD_SECRET)? {
            self.rebuild_secret = Some(secret);
        }

        if let Some(bind) = EnvParser::parse_string(EnvVars::BIND)? {
            self.bind_address = bind;
        }

        if let Some(port) = EnvParser::parse_u16(EnvVars::PORT)? {
            self.port = port;
        } else if let Some(port) = EnvParser::parse_u16(EnvVars::PLATFORM_PORT)? {
            self.port = port;
        }

        if let Some(size) = EnvParser::parse_u64(EnvVars::PAGE_SIZE, 1, MAX_SEARCH_PAGE_SIZE as u64)? {
            self.search_page_size = size as u32;
        }

        if let Some(deadline) = EnvParser::parse_u64(EnvVars::REQUEST_DEADLINE, 1, 300)? {
            self.request_deadline_secs = deadline;
        }

        if let Some(mode) = EnvParser::parse_string(EnvVars::QUERY_MODE)? {
            self.query_mode = mode.parse()?;
        }

        if let Some(enforce) = EnvParser::parse_bool(EnvVars::ENFORCE_FOLDER_SCOPE)? {
            self.enforce_folder_scope = enforce;
        }

        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_url(&self.gemini_base_url, "gemini_base_url")?;
        ConfigValidator::validate_url(&self.drive_base_url, "drive_base_url")?;

        ConfigValidator::validate_range(self.search_page_size, 1, MAX_SEARCH_PAGE_SIZE, "search_page_size")?;
        ConfigValidator::validate_range(self.request_deadline_secs, 1, 300, "request_deadline_secs")?;

        if let Some(ref folder) = self.drive_folder_id {
            ConfigValidator::validate_folder_id(folder)?;
        }

        Ok(())
    }

    pub fn require_folder_id(&self) -> Result<&str> {
        self.drive_folder_id
            .as_deref()
            .ok_or_else(|| missing(EnvVars::DRIVE_FOLDER_ID))
    }

    pub fn require_gemini_api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| missing(EnvVars::GEMINI_API_KEY))
    }

    /// Names of required settings that are absent. Credentials are checked
    /// by the caller because they are re-read from the environment.
    pub fn missing_settings(&self, credentials_configured: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini_api_key.is_none() && self.query_mode == QueryMode::Model {
            missing.push(EnvVars::GEMINI_API_KEY);
        }
        if self.drive_folder_id.is_none() {
            missing.push(EnvVars::DRIVE_FOLDER_ID);
        }
        if !credentials_configured {
            missing.push("GOOGLE_CREDENTIALS_BASE64 (or GOOGLE_SERVICE_ACCOUNT_EMAIL + GOOGLE_PRIVATE_KEY)");
        }
        missing
    }

    /// Key/value view of the effective configuration with secrets masked.
    pub fn redacted(&self) -> Vec<(&'static str, String)> {
        vec![
            ("gemini_api_key", mask(&self.gemini_api_key)),
            ("gemini_model", self.gemini_model.clone()),
            ("gemini_base_url", self.gemini_base_url.clone()),
            ("drive_folder_id", self.drive_folder_id.clone().unwrap_or_else(|| "<unset>".to_string())),
            ("drive_base_url", self.drive_base_url.clone()),
            ("credentials.service_account_email", self.credentials.service_account_email.clone().unwrap_or_else(|| "<unset>".to_string())),
            ("credentials.private_key", mask(&self.credentials.private_key)),
            ("credentials.credentials_base64", mask(&self.credentials.credentials_base64)),
            ("rebuild_secret", mask(&self.rebuild_secret)),
            ("bind_address", self.bind_address.clone()),
            ("port", self.port.to_string()),
            ("search_page_size", self.search_page_size.to_string()),
            ("request_deadline_secs", self.request_deadline_secs.to_string()),
            ("query_mode", self.query_mode.to_string()),
            ("enforce_folder_scope", self.enforce_folder_scope.to_string()),
        ]
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "sheet-finder", "sheet-finder")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::default_config_path()
    }
}

fn missing(field: &str) -> crate::error::SheetFinderError {
    ConfigError::MissingSetting { field: field.to_string() }.into()
}

fn mask(value: &Option<String>) -> String {
    match value {
        Some(_) => "********".to_string(),
        None => "<unset>".to_string(),
    }
}
