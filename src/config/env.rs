use std::env;
use crate::error::{ConfigError, Result, SheetFinderError};

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const GEMINI_API_KEY: &'static str = "GEMINI_API_KEY";
    pub const GEMINI_API_KEY_LEGACY: &'static str = "API_KEY";
    pub const GEMINI_MODEL: &'static str = "SHEET_FINDER_GEMINI_MODEL";
    pub const GEMINI_BASE_URL: &'static str = "SHEET_FINDER_GEMINI_BASE_URL";
    pub const DRIVE_FOLDER_ID: &'static str = "GOOGLE_DRIVE_FOLDER_ID";
    pub const DRIVE_BASE_URL: &'static str = "SHEET_FINDER_DRIVE_BASE_URL";
    pub const SERVICE_ACCOUNT_EMAIL: &'static str = "GOOGLE_SERVICE_ACCOUNT_EMAIL";
    pub const PRIVATE_KEY: &'static str = "GOOGLE_PRIVATE_KEY";
    pub const CREDENTIALS_BASE64: &'static str = "GOOGLE_CREDENTIALS_BASE64";
    pub const REBUILD_SECRET: &'static str = "REBUILD_SECRET";
    pub const BIND: &'static str = "SHEET_FINDER_BIND";
    pub const PORT: &'static str = "SHEET_FINDER_PORT";
    pub const PLATFORM_PORT: &'static str = "PORT";
    pub const PAGE_SIZE: &'static str = "SHEET_FINDER_PAGE_SIZE";
    pub const REQUEST_DEADLINE: &'static str = "SHEET_FINDER_REQUEST_DEADLINE";
    pub const QUERY_MODE: &'static str = "SHEET_FINDER_QUERY_MODE";
    pub const ENFORCE_FOLDER_SCOPE: &'static str = "SHEET_FINDER_ENFORCE_FOLDER_SCOPE";
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Parse environment variable as string. Blank values count as unset.
    pub fn parse_string(var_name: &str) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                Ok(Some(trimmed))
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(invalid(var_name, "<non-UTF-8>")),
        }
    }

    /// First of `names` that is set, in order.
    pub fn parse_first(names: &[&str]) -> Result<Option<String>> {
        for name in names {
            if let Some(value) = Self::parse_string(name)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Parse environment variable as boolean with validation
    pub fn parse_bool(var_name: &str) -> Result<Option<bool>> {
        if let Some(value_str) = Self::parse_string(var_name)? {
            match value_str.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(invalid(var_name, &value_str)),
            }
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as u64 with range validation
    pub fn parse_u64(var_name: &str, min: u64, max: u64) -> Result<Option<u64>> {
        if let Some(value_str) = Self::parse_string(var_name)? {
            let value = value_str
                .parse::<u64>()
                .map_err(|_| invalid(var_name, &value_str))?;

            if value < min || value > max {
                return Err(invalid(var_name, &format!("{} (must be between {} and {})", value, min, max)));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as u16 (ports)
    pub fn parse_u16(var_name: &str) -> Result<Option<u16>> {
        Ok(Self::parse_u64(var_name, 1, u16::MAX as u64)?.map(|v| v as u16))
    }
}

fn invalid(field: &str, value: &str) -> SheetFinderError {
    SheetFinderError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}
