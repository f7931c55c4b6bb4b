//! Error handling for sheet-finder
//!
//! Every failure in the search pipeline is typed. The HTTP layer maps the
//! top-level variant to a status code and passes the `Display` text through
//! to the caller; nothing is retried or swallowed on the way up.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetFinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(String),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    #[error("Search timed out after {seconds}s; the result set is likely too large or the upstream too slow")]
    Timeout { seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing credentials: set GOOGLE_CREDENTIALS_BASE64 or both GOOGLE_SERVICE_ACCOUNT_EMAIL and GOOGLE_PRIVATE_KEY")]
    MissingCredentials,

    #[error("malformed credentials: {reason}")]
    MalformedCredentials { reason: String },

    #[error("Missing required setting: {field}")]
    MissingSetting { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("the language model returned an empty completion")]
    EmptyCompletion,

    #[error("generated query is not scoped to folder {folder_id}: {query}")]
    OutOfScope { folder_id: String, query: String },

    #[error("language model request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("language model rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("prompt rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Drive rejected the credentials: {message}")]
    Auth { message: String },

    #[error("Drive search failed: {message}")]
    Search { message: String },
}

pub type Result<T> = std::result::Result<T, SheetFinderError>;

impl SheetFinderError {
    /// Short category name used in logs and diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            SheetFinderError::Config(_) => "configuration",
            SheetFinderError::Validation(_) => "validation",
            SheetFinderError::Translation(_) => "translation",
            SheetFinderError::Upstream(UpstreamError::Auth { .. }) => "upstream_auth",
            SheetFinderError::Upstream(UpstreamError::Search { .. }) => "upstream_search",
            SheetFinderError::Timeout { .. } => "timeout",
            SheetFinderError::Internal(_) => "internal",
        }
    }
}

impl From<toml::de::Error> for SheetFinderError {
    fn from(err: toml::de::Error) -> Self {
        SheetFinderError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<std::io::Error> for SheetFinderError {
    fn from(err: std::io::Error) -> Self {
        SheetFinderError::Config(ConfigError::Io(err))
    }
}

impl From<handlebars::RenderError> for SheetFinderError {
    fn from(err: handlebars::RenderError) -> Self {
        SheetFinderError::Translation(TranslationError::Template(err))
    }
}
