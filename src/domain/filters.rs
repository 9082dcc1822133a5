//! Validated browsing filters.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

const MAX_CODE_LEN: usize = 2;
const MAX_TAG_LEN: usize = 64;
const MAX_KEYWORD_LEN: usize = 100;

/// Token used in cache keys and query strings when no tag restricts a search.
pub const ALL_TAGS_TOKEN: &str = "all";

/// Ordering applied to keyword search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchSort {
    /// Manual sort order, then newest first.
    #[default]
    Default,
    /// Most recently updated first.
    Updated,
    /// Most recently created first.
    Created,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Default => "default",
            SearchSort::Updated => "updated",
            SearchSort::Created => "created",
        }
    }

    /// Parse an optional client value; absent or blank means [`SearchSort::Default`].
    pub fn parse_optional(value: Option<&str>) -> Result<Self, DomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(SearchSort::Default),
            Some(raw) => raw.parse(),
        }
    }
}

impl FromStr for SearchSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(SearchSort::Default),
            "updated" => Ok(SearchSort::Updated),
            "created" => Ok(SearchSort::Created),
            other => Err(DomainError::validation(format!(
                "unknown sort `{other}`; expected default, updated or created"
            ))),
        }
    }
}

impl fmt::Display for SearchSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag restriction on a search. `None`, blank and the literal `all` are the same filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TagFilter {
    #[default]
    All,
    Only(String),
}

impl TagFilter {
    pub fn parse_optional(value: Option<&str>) -> Result<Self, DomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(TagFilter::All),
            Some(raw) if raw.eq_ignore_ascii_case(ALL_TAGS_TOKEN) => Ok(TagFilter::All),
            Some(raw) => Ok(TagFilter::Only(tag_name(raw)?)),
        }
    }

    /// Value used in cache keys.
    pub fn token(&self) -> &str {
        match self {
            TagFilter::All => ALL_TAGS_TOKEN,
            TagFilter::Only(tag) => tag,
        }
    }

    pub fn as_tag(&self) -> Option<&str> {
        match self {
            TagFilter::All => None,
            TagFilter::Only(tag) => Some(tag),
        }
    }
}

/// Validate a tag name used as a path filter.
pub fn tag_name(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("tag must not be blank"));
    }
    if trimmed.chars().count() > MAX_TAG_LEN {
        return Err(DomainError::validation(format!(
            "tag exceeds {MAX_TAG_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a search keyword.
pub fn keyword(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("keyword must not be blank"));
    }
    if trimmed.chars().count() > MAX_KEYWORD_LEN {
        return Err(DomainError::validation(format!(
            "keyword exceeds {MAX_KEYWORD_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a short classification code (country or target audience).
///
/// Stored codes are at most two alphanumeric characters.
pub fn classification_code(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_CODE_LEN
        && trimmed.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(DomainError::validation(format!("invalid {field} value")));
    }
    Ok(trimmed.to_string())
}
