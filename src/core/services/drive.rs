use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::MAX_SEARCH_PAGE_SIZE;
use crate::core::model::{DriveFile, FilePage};
use crate::core::services::credentials::CredentialProvider;
use crate::error::{Result, UpstreamError};

pub const SEARCH_FIELDS: &str = "files(id, name, mimeType)";
pub const BULK_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";
pub const BULK_PAGE_SIZE: u32 = 1000;

/// Read-only listing over the storage provider.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    async fn list_page(
        &self,
        query: &str,
        fields: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FilePage>;

    /// One page of at most `page_size` matches. Results past the cap are
    /// dropped, never fetched.
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<DriveFile>> {
        let page_size = page_size.clamp(1, MAX_SEARCH_PAGE_SIZE);
        let page = self.list_page(query, SEARCH_FIELDS, page_size, None).await?;
        let mut files = page.files;
        files.truncate(page_size as usize);
        Ok(files)
    }

    /// Every match across all pages, uncapped.
    async fn list_all(&self, query: &str) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .list_page(query, BULK_FIELDS, BULK_PAGE_SIZE, page_token.as_deref())
                .await?;
            pages += 1;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Enumerated {} files over {} page(s)", files.len(), pages);
        Ok(files)
    }
}

#[derive(Deserialize)]
struct DriveErrorBody {
    error: DriveErrorDetail,
}

#[derive(Deserialize)]
struct DriveErrorDetail {
    #[serde(default)]
    message: String,
}

/// Drive v3 `files.list` over the memoized service account handle.
pub struct DriveGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialProvider>,
}

impl DriveGateway {
    pub fn new(client: reqwest::Client, base_url: &str, credentials: Arc<CredentialProvider>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }
}

#[async_trait::async_trait]
impl FileStore for DriveGateway {
    async fn list_page(
        &self,
        query: &str,
        fields: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FilePage> {
        let auth = self.credentials.get_client().await?;
        let token = auth.access_token().await?;

        let page_size = page_size.to_string();
        let mut params = vec![("q", query), ("fields", fields), ("pageSize", page_size.as_str())];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token));
        }

        debug!("Listing Drive files with q={}", query);

        let response = self
            .client
            .get(self.files_url())
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| UpstreamError::Search {
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<DriveErrorBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or(raw);
            warn!("Drive files.list returned {}", status);

            let message = format!("{} {}", status.as_u16(), message);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpstreamError::Auth { message },
                _ => UpstreamError::Search { message },
            }
            .into());
        }

        let page: FilePage = response.json().await.map_err(|e| UpstreamError::Search {
            message: format!("invalid files.list response: {}", e),
        })?;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetFinderError;
    use crate::test_utils::{sample_files, FakeGoogle, MockFileStore};

    #[tokio::test]
    async fn test_search_empty_page_is_empty_vec() {
        let store = MockFileStore::new(Vec::new());
        let files = store.search("'F123' in parents", 50).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_search_truncates_overfull_page() {
        let store = MockFileStore::new(sample_files(80)).ignoring_page_size();
        let files = store.search("q", 50).await.unwrap();
        assert_eq!(files.len(), 50);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_is_single_page() {
        let store = MockFileStore::new(sample_files(120));
        let files = store.search("q", 50).await.unwrap();
        assert_eq!(files.len(), 50);
        assert_eq!(store.calls(), 1);
        assert_eq!(store.last_fields().as_deref(), Some(SEARCH_FIELDS));
    }

    #[tokio::test]
    async fn test_list_all_accumulates_every_page() {
        let store = MockFileStore::new(sample_files(2500));
        let files = store.list_all("q").await.unwrap();
        assert_eq!(files.len(), 2500);
        assert_eq!(store.calls(), 3);
        assert_eq!(files[0].id, "file-0");
        assert_eq!(files[2499].id, "file-2499");
        assert_eq!(store.last_fields().as_deref(), Some(BULK_FIELDS));
    }

    #[tokio::test]
    async fn test_gateway_lists_through_fake_drive() {
        let server = FakeGoogle::start().await;
        server.set_files(sample_files(3));
        let gateway = DriveGateway::new(reqwest::Client::new(), &server.base_url(), server.credential_provider());

        let files = gateway.search("'F123' in parents and trashed = false", 50).await.unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(server.last_query().as_deref(), Some("'F123' in parents and trashed = false"));
        assert_eq!(server.last_fields().as_deref(), Some(SEARCH_FIELDS));
        assert_eq!(server.token_requests(), 1);
    }

    #[tokio::test]
    async fn test_gateway_paginates_bulk_listing() {
        let server = FakeGoogle::start().await;
        server.set_files(sample_files(2100));
        let gateway = DriveGateway::new(reqwest::Client::new(), &server.base_url(), server.credential_provider());

        let files = gateway.list_all("q").await.unwrap();
        assert_eq!(files.len(), 2100);
        assert_eq!(server.list_requests(), 3);
        // One token serves every page
        assert_eq!(server.token_requests(), 1);
    }

    #[tokio::test]
    async fn test_gateway_maps_provider_errors() {
        let server = FakeGoogle::start().await;
        let gateway = DriveGateway::new(reqwest::Client::new(), &server.base_url(), server.credential_provider());

        server.fail_listing(400, "Invalid Value");
        let err = gateway.search("broken query", 50).await.unwrap_err();
        assert!(matches!(err, SheetFinderError::Upstream(UpstreamError::Search { .. })));
        assert!(err.to_string().contains("Invalid Value"));

        server.fail_listing(403, "Insufficient Permission");
        let err = gateway.search("q", 50).await.unwrap_err();
        assert!(matches!(err, SheetFinderError::Upstream(UpstreamError::Auth { .. })));
    }
}
