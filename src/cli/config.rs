use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Config as AppConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration with secrets masked
    Show,

    /// Show configuration file path
    Path,

    /// List all available configuration keys
    Keys,
}

const KEYS: &[(&str, &str, &str)] = &[
    ("gemini_api_key", "GEMINI_API_KEY", "Gemini API key (legacy alias API_KEY)"),
    ("gemini_model", "SHEET_FINDER_GEMINI_MODEL", "Model used for query translation"),
    ("gemini_base_url", "SHEET_FINDER_GEMINI_BASE_URL", "Gemini API base URL"),
    ("drive_folder_id", "GOOGLE_DRIVE_FOLDER_ID", "Folder every search is scoped to"),
    ("drive_base_url", "SHEET_FINDER_DRIVE_BASE_URL", "Drive API base URL"),
    ("credentials.service_account_email", "GOOGLE_SERVICE_ACCOUNT_EMAIL", "Service account email"),
    ("credentials.private_key", "GOOGLE_PRIVATE_KEY", "Service account PKCS#8 private key"),
    ("credentials.credentials_base64", "GOOGLE_CREDENTIALS_BASE64", "Base64 service account JSON"),
    ("rebuild_secret", "REBUILD_SECRET", "Secret for GET /index"),
    ("bind_address", "SHEET_FINDER_BIND", "Server bind address"),
    ("port", "SHEET_FINDER_PORT / PORT", "Server port"),
    ("search_page_size", "SHEET_FINDER_PAGE_SIZE", "Results per search, 1-50"),
    ("request_deadline_secs", "SHEET_FINDER_REQUEST_DEADLINE", "Search deadline in seconds"),
    ("query_mode", "SHEET_FINDER_QUERY_MODE", "model or direct"),
    ("enforce_folder_scope", "SHEET_FINDER_ENFORCE_FOLDER_SCOPE", "Reject unscoped model output"),
];

pub async fn execute(args: ConfigArgs, config: &AppConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            println!("Current configuration:");
            for (key, value) in config.redacted() {
                println!("  {}: {}", key, value);
            }
        }

        ConfigCommands::Path => match AppConfig::config_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("No configuration directory available on this platform"),
        },

        ConfigCommands::Keys => {
            println!("Available configuration keys:");
            for (key, env, description) in KEYS {
                println!("  {:<36} {:<36} {}", key, env, description);
            }
            println!("\nEnvironment variables override the config file. Secrets are never written to disk.");
        }
    }

    Ok(())
}
