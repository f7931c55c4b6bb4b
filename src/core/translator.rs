use std::sync::Arc;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::model::SearchRequest;
use crate::core::query::{self, DriveQuery, Predicate};
use crate::core::services::gemini::CompletionModel;
use crate::error::{Result, SheetFinderError, TranslationError};

const NOT_PROVIDED: &str = "N/A";

const INSTRUCTION_TEMPLATE: &str = r#"You are an expert Google Drive API search query generator. Your task is to convert a search for a music sheet into an optimized 'q' parameter for the 'files.list' API method.

Search criteria:
- Song Title: "{{title}}"
- Key (Music): "{{key}}"
- Lyrics Snippet: "{{lyrics}}"

Follow these rules when writing the query string:
1. Restrict the search to files inside the folder with ID '{{folder_id}}'. Use "{{scope}}".
2. Files must not be in the trash ('trashed = false').
3. For Song Title and Key, use the 'name contains' operator. If both are provided, join them with 'and'.
4. For Lyrics Snippet, use the 'fullText contains' operator.
5. Combine all conditions with 'and'.
6. If a criterion is N/A, do not include it in the query.
7. Escape any single quote inside a search term with a backslash (e.g. 'it\'s').
8. Return ONLY the raw query string, with no explanation or markdown formatting.

Required conditions:
{{conditions}}

Example: for Song Title "Amazing Grace", Key "G" and Lyrics Snippet "saved a wretch", the output should be:
{{example}}
"#;

#[derive(Serialize)]
struct InstructionContext<'a> {
    title: &'a str,
    key: &'a str,
    lyrics: &'a str,
    folder_id: &'a str,
    scope: String,
    conditions: String,
    example: String,
}

/// Turns the structured search fields into a Drive query with one model call.
pub struct QueryTranslator {
    model: Arc<dyn CompletionModel>,
    handlebars: Handlebars<'static>,
    enforce_folder_scope: bool,
}

impl QueryTranslator {
    pub fn new(model: Arc<dyn CompletionModel>, enforce_folder_scope: bool) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        Self {
            model,
            handlebars,
            enforce_folder_scope,
        }
    }

    /// Render the natural-language instruction sent to the model.
    pub fn build_instruction(&self, request: &SearchRequest, folder_id: &str) -> Result<String> {
        let scope = DriveQuery::scoped(folder_id);
        let mut conditions: Vec<String> = scope.predicates().iter().map(Predicate::to_string).collect();
        conditions.extend(query::field_predicates(request).iter().map(Predicate::to_string));

        let example_request = SearchRequest::new(Some("Amazing Grace"), Some("G"), Some("saved a wretch"));

        let context = InstructionContext {
            title: request.title().unwrap_or(NOT_PROVIDED),
            key: request.key().unwrap_or(NOT_PROVIDED),
            lyrics: request.lyrics().unwrap_or(NOT_PROVIDED),
            folder_id,
            scope: Predicate::InParents(folder_id.to_string()).to_string(),
            conditions: conditions
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n"),
            example: DriveQuery::for_request(&example_request, folder_id).to_string(),
        };

        Ok(self.handlebars.render_template(INSTRUCTION_TEMPLATE, &context)?)
    }

    pub async fn translate(&self, request: &SearchRequest, folder_id: &str) -> Result<String> {
        if folder_id.is_empty() {
            return Err(SheetFinderError::Validation("folder id must not be empty".to_string()));
        }
        request.validate()?;

        let instruction = self.build_instruction(request, folder_id)?;
        debug!("Built translation prompt ({} chars)", instruction.len());

        let completion = self
            .model
            .complete(&instruction)
            .await?
            .filter(|text| !text.trim().is_empty())
            .ok_or(TranslationError::EmptyCompletion)?;

        debug!("Raw model output: {}", completion);
        let cleaned = query::sanitize_completion(&completion);
        if cleaned.is_empty() {
            return Err(TranslationError::EmptyCompletion.into());
        }

        if self.enforce_folder_scope && !query::has_folder_scope(&cleaned, folder_id) {
            warn!("Model output dropped the folder restriction");
            return Err(TranslationError::OutOfScope {
                folder_id: folder_id.to_string(),
                query: cleaned,
            }
            .into());
        }

        info!("Translated query: {}", cleaned);
        Ok(cleaned)
    }
}
