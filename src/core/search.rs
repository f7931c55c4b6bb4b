//! The search pipeline: validate, translate, search.
//!
//! One linear pass per request. A failure at any stage ends the request
//! with that stage's error; nothing is retried and no partial result is
//! returned.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::QueryMode;
use crate::core::model::{DriveFile, SearchRequest};
use crate::core::query::DriveQuery;
use crate::core::services::drive::FileStore;
use crate::core::translator::QueryTranslator;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    Idle,
    Validating,
    Translating,
    Searching,
    Done,
    Failed,
}

impl SearchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStage::Idle => "idle",
            SearchStage::Validating => "validating",
            SearchStage::Translating => "translating",
            SearchStage::Searching => "searching",
            SearchStage::Done => "done",
            SearchStage::Failed => "failed",
        }
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one search, with the query that produced it.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub query: String,
    pub files: Vec<DriveFile>,
}

pub struct SearchPipeline {
    translator: Option<QueryTranslator>,
    store: Arc<dyn FileStore>,
    folder_id: String,
    page_size: u32,
}

impl SearchPipeline {
    /// `translator` may be `None` only in direct mode.
    pub fn new(
        translator: Option<QueryTranslator>,
        store: Arc<dyn FileStore>,
        folder_id: &str,
        page_size: u32,
    ) -> Self {
        Self {
            translator,
            store,
            folder_id: folder_id.to_string(),
            page_size,
        }
    }

    pub fn mode(&self) -> QueryMode {
        if self.translator.is_some() {
            QueryMode::Model
        } else {
            QueryMode::Direct
        }
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    #[cfg(test)]
    pub async fn run(&self, request: &SearchRequest) -> Result<Vec<DriveFile>> {
        Ok(self.run_detailed(request).await?.files)
    }

    pub async fn run_detailed(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let mut stage = SearchStage::Idle;
        let result = self.drive_stages(request, &mut stage).await;

        match result {
            Ok(outcome) => {
                debug!("search stage: {} -> {}", stage, SearchStage::Done);
                info!("Found {} file(s)", outcome.files.len());
                Ok(outcome)
            }
            Err(e) => {
                warn!("search failed while {} ({}): {}", stage, e.category(), e);
                debug!("search stage: {} -> {}", stage, SearchStage::Failed);
                Err(e)
            }
        }
    }

    async fn drive_stages(&self, request: &SearchRequest, stage: &mut SearchStage) -> Result<SearchOutcome> {
        advance(stage, SearchStage::Validating);
        request.validate()?;
        debug!(
            "search params: title={:?} key={:?} lyrics={:?}",
            request.title(),
            request.key(),
            request.lyrics()
        );

        advance(stage, SearchStage::Translating);
        let query = match self.translator {
            Some(ref translator) => translator.translate(request, &self.folder_id).await?,
            None => DriveQuery::for_request(request, &self.folder_id).to_string(),
        };

        advance(stage, SearchStage::Searching);
        let files = self.store.search(&query, self.page_size).await?;

        Ok(SearchOutcome { query, files })
    }
}

/// Every non-trashed, non-folder item in `folder_id`, across all pages.
/// Needs no model, so it runs without a configured pipeline.
pub async fn enumerate_folder(store: &dyn FileStore, folder_id: &str) -> Result<Vec<DriveFile>> {
    let query = DriveQuery::folder_contents(folder_id).to_string();
    info!("Enumerating folder {}", folder_id);
    let files = store.list_all(&query).await?;
    info!("Fetched {} files", files.len());
    Ok(files)
}

fn advance(stage: &mut SearchStage, next: SearchStage) {
    debug!("search stage: {} -> {}", stage, next);
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SheetFinderError, TranslationError, UpstreamError};
    use crate::test_utils::{sample_files, MockCompletionModel, MockFileStore};

    const CLEAN_QUERY: &str = "'F123' in parents and trashed = false and name contains 'Grace'";

    fn pipeline(reply: Option<&str>, store: MockFileStore) -> (SearchPipeline, Arc<MockCompletionModel>, Arc<MockFileStore>) {
        let model = Arc::new(MockCompletionModel::new(reply));
        let store = Arc::new(store);
        let translator = QueryTranslator::new(model.clone(), true);
        (SearchPipeline::new(Some(translator), store.clone(), "F123", 50), model, store)
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_outbound_calls() {
        let (pipeline, model, store) = pipeline(Some(CLEAN_QUERY), MockFileStore::new(sample_files(3)));

        for request in [
            SearchRequest::default(),
            SearchRequest::new(Some(""), Some("  "), Some("")),
        ] {
            let err = pipeline.run(&request).await.unwrap_err();
            assert!(matches!(err, SheetFinderError::Validation(_)));
        }

        assert_eq!(model.calls(), 0);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_happy_path_passes_query_through() {
        let (pipeline, model, store) = pipeline(
            Some(&format!("```\n{}\n```", CLEAN_QUERY)),
            MockFileStore::new(sample_files(3)),
        );

        let outcome = pipeline
            .run_detailed(&SearchRequest::new(Some("Grace"), None, None))
            .await
            .unwrap();

        assert_eq!(outcome.query, CLEAN_QUERY);
        assert_eq!(outcome.files.len(), 3);
        assert_eq!(model.calls(), 1);
        assert_eq!(store.calls(), 1);
        assert_eq!(store.last_query().as_deref(), Some(CLEAN_QUERY));
    }

    #[tokio::test]
    async fn test_translation_failure_skips_search() {
        let (pipeline, model, store) = pipeline(None, MockFileStore::new(sample_files(3)));

        let err = pipeline
            .run(&SearchRequest::new(None, Some("G"), None))
            .await
            .unwrap_err();

        assert!(matches!(err, SheetFinderError::Translation(TranslationError::EmptyCompletion)));
        assert_eq!(model.calls(), 1);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_search_failure_is_not_retried() {
        let (pipeline, model, store) = pipeline(
            Some(CLEAN_QUERY),
            MockFileStore::new(Vec::new()).failing("Invalid Value"),
        );

        let err = pipeline
            .run(&SearchRequest::new(Some("Grace"), None, None))
            .await
            .unwrap_err();

        assert!(matches!(err, SheetFinderError::Upstream(UpstreamError::Search { .. })));
        assert!(err.to_string().contains("Invalid Value"));
        assert_eq!(model.calls(), 1);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_results_is_empty_vec() {
        let (pipeline, _, _) = pipeline(Some(CLEAN_QUERY), MockFileStore::new(Vec::new()));
        let files = pipeline
            .run(&SearchRequest::new(Some("Grace"), None, None))
            .await
            .unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_direct_mode_builds_query_without_model() {
        let store = Arc::new(MockFileStore::new(sample_files(2)));
        let pipeline = SearchPipeline::new(None, store.clone(), "F123", 50);
        assert_eq!(pipeline.mode(), QueryMode::Direct);

        let outcome = pipeline
            .run_detailed(&SearchRequest::new(Some("Amazing Grace"), Some("G"), Some("saved a wretch")))
            .await
            .unwrap();

        assert_eq!(
            outcome.query,
            "'F123' in parents and trashed = false and name contains 'Amazing Grace' and name contains 'G' and fullText contains 'saved a wretch'"
        );
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_page_cap_applies_to_search_but_not_enumeration() {
        let store = Arc::new(MockFileStore::new(sample_files(1200)).ignoring_page_size());
        let pipeline = SearchPipeline::new(None, store.clone(), "F123", 50);

        let files = pipeline
            .run(&SearchRequest::new(Some("Grace"), None, None))
            .await
            .unwrap();
        assert_eq!(files.len(), 50);

        let store = Arc::new(MockFileStore::new(sample_files(1200)));
        let all = enumerate_folder(store.as_ref(), "F123").await.unwrap();
        assert_eq!(all.len(), 1200);
        assert_eq!(store.calls(), 2);
        assert_eq!(
            store.last_query().as_deref(),
            Some("'F123' in parents and trashed = false and mimeType != 'application/vnd.google-apps.folder'")
        );
    }
}
