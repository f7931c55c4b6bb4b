use url::Url;
use crate::error::{ConfigError, Result};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a URL string
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidValue {
            field: field_name.to_string(),
            value: format!("'{}': {}", url, e),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidValue {
                field: field_name.to_string(),
                value: format!("'{}': scheme must be http or https", url),
            }
            .into());
        }
        Ok(())
    }

    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ConfigError::InvalidValue {
                field: field_name.to_string(),
                value: format!("{} (must be between {} and {})", value, min, max),
            }
            .into());
        }
        Ok(())
    }

    /// Drive ids are URL-safe base64-ish tokens. Anything that would break
    /// out of a quoted query literal is rejected.
    pub fn validate_folder_id(folder_id: &str) -> Result<()> {
        let ok = !folder_id.is_empty()
            && folder_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !ok {
            return Err(ConfigError::InvalidValue {
                field: "drive_folder_id".to_string(),
                value: folder_id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
