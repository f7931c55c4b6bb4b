use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetFinderError};

pub const EMPTY_REQUEST_MESSAGE: &str = "At least one search parameter is required.";

/// The three free-text search fields submitted by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub song_title: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub lyrics: Option<String>,
}

impl SearchRequest {
    pub fn new(song_title: Option<&str>, key: Option<&str>, lyrics: Option<&str>) -> Self {
        Self {
            song_title: song_title.map(str::to_string),
            key: key.map(str::to_string),
            lyrics: lyrics.map(str::to_string),
        }
    }

    pub fn title(&self) -> Option<&str> {
        present(&self.song_title)
    }

    pub fn key(&self) -> Option<&str> {
        present(&self.key)
    }

    pub fn lyrics(&self) -> Option<&str> {
        present(&self.lyrics)
    }

    /// True when every field is absent, empty or whitespace.
    pub fn is_empty(&self) -> bool {
        self.title().is_none() && self.key().is_none() && self.lyrics().is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(SheetFinderError::Validation(EMPTY_REQUEST_MESSAGE.to_string()));
        }
        Ok(())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Metadata projection of one file in the shared folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response body of the bulk enumeration endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FolderListing {
    pub success: bool,
    pub count: usize,
    pub files: Vec<DriveFile>,
}

impl From<Vec<DriveFile>> for FolderListing {
    fn from(files: Vec<DriveFile>) -> Self {
        Self {
            success: true,
            count: files.len(),
            files,
        }
    }
}
