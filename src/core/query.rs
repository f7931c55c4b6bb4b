//! Drive `q` grammar helpers.
//!
//! Builds the same query shape the translator asks the model for, so direct
//! mode, the prompt's required-conditions list and the scope guard all agree
//! on one grammar. Also holds the best-effort cleanup applied to model output.

use std::fmt;

use crate::core::model::SearchRequest;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    InParents(String),
    NotTrashed,
    NameContains(String),
    FullTextContains(String),
    MimeTypeNot(String),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::InParents(id) => write!(f, "'{}' in parents", escape_literal(id)),
            Predicate::NotTrashed => write!(f, "trashed = false"),
            Predicate::NameContains(v) => write!(f, "name contains '{}'", escape_literal(v)),
            Predicate::FullTextContains(v) => write!(f, "fullText contains '{}'", escape_literal(v)),
            Predicate::MimeTypeNot(v) => write!(f, "mimeType != '{}'", escape_literal(v)),
        }
    }
}

/// A conjunction of predicates, rendered joined by `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveQuery {
    predicates: Vec<Predicate>,
}

impl DriveQuery {
    /// Folder scope plus the not-trashed filter every query carries.
    pub fn scoped(folder_id: &str) -> Self {
        Self {
            predicates: vec![
                Predicate::InParents(folder_id.to_string()),
                Predicate::NotTrashed,
            ],
        }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Query for an interactive search: title and key as name matches,
    /// lyrics as a full-text match, absent fields omitted.
    pub fn for_request(request: &SearchRequest, folder_id: &str) -> Self {
        let mut query = Self::scoped(folder_id);
        for predicate in field_predicates(request) {
            query = query.and(predicate);
        }
        query
    }

    /// Every non-trashed, non-folder item in the folder.
    pub fn folder_contents(folder_id: &str) -> Self {
        Self::scoped(folder_id).and(Predicate::MimeTypeNot(FOLDER_MIME_TYPE.to_string()))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

impl fmt::Display for DriveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, " and ")?;
            }
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

/// Predicates contributed by the populated fields only, in title, key,
/// lyrics order.
pub fn field_predicates(request: &SearchRequest) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    if let Some(title) = request.title() {
        predicates.push(Predicate::NameContains(title.to_string()));
    }
    if let Some(key) = request.key() {
        predicates.push(Predicate::NameContains(key.to_string()));
    }
    if let Some(lyrics) = request.lyrics() {
        predicates.push(Predicate::FullTextContains(lyrics.to_string()));
    }
    predicates
}

/// True when `query` still restricts results to `folder_id`: it must open
/// with the folder predicate, continue only through `and`, and have no
/// top-level `or` that could widen it.
pub fn has_folder_scope(query: &str, folder_id: &str) -> bool {
    let scope = Predicate::InParents(folder_id.to_string()).to_string();
    let rest = match query.strip_prefix(&scope) {
        Some(rest) => rest,
        None => return false,
    };

    if !rest.trim().is_empty() {
        let joined_by_and = rest.starts_with(char::is_whitespace)
            && rest
                .trim_start()
                .strip_prefix("and")
                .map(|after| after.starts_with(|c: char| c.is_whitespace() || c == '('))
                .unwrap_or(false);
        if !joined_by_and {
            return false;
        }
    }

    !has_top_level_or(query)
}

/// Scan outside quoted literals for an `or` at parenthesis depth zero.
/// Unbalanced quotes or parentheses count as unsafe.
fn has_top_level_or(query: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_literal = false;
    let mut escaped = false;
    let mut word = String::new();

    for c in query.chars().chain(std::iter::once(' ')) {
        if in_literal {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '\'' {
                in_literal = false;
            }
            continue;
        }

        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if depth == 0 && word.eq_ignore_ascii_case("or") {
            return true;
        }
        word.clear();

        match c {
            '\'' => in_literal = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => {}
        }
    }

    in_literal || depth != 0
}

/// Strip a markdown fence the model sometimes wraps its answer in.
///
/// Only the exact shape "```[lang]\n...```" is handled. Anything else is
/// returned trimmed but otherwise untouched, so clean input is a fixed point.
pub fn sanitize_completion(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.len() < 6 || !trimmed.starts_with("```") || !trimmed.ends_with("```") {
        return trimmed.to_string();
    }

    let inner = trimmed[3..trimmed.len() - 3].trim();

    if let Some((first_line, rest)) = inner.split_once('\n') {
        let tag = first_line.trim();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_lowercase()) {
            return rest.trim().to_string();
        }
    }

    inner.to_string()
}
