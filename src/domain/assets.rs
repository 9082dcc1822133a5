//! Asset locators in their two forms.
//!
//! Everything persisted or cached holds a [`RelativePath`]. Only the CDN translator
//! produces an [`AbsoluteUrl`], and only on the way out of a response.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Origin-independent asset locator, always rooted at `/` unless empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativePath(String);

impl RelativePath {
    /// Build a relative path from raw input, normalizing it to a leading `/`.
    ///
    /// Absolute URLs must go through the translator first; this only fixes the root.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize_path(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Delivery-form locator returned to clients.
///
/// Carries a fully-qualified URL when a CDN origin is configured and enabled; in
/// pass-through deployments it holds the relative path verbatim. It deliberately
/// implements `Serialize` only, so it cannot be read back out of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AbsoluteUrl(String);

impl AbsoluteUrl {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AbsoluteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root a path at exactly one `/`. Empty input stays empty.
///
/// A leading run of `/` or `\` collapses, so the result is never scheme-relative.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!("/{}", path.trim_start_matches(['/', '\\']))
}

/// True when the value already carries an `http://` or `https://` scheme.
pub fn is_absolute_url(value: &str) -> bool {
    has_prefix_ignore_case(value, "http://") || has_prefix_ignore_case(value, "https://")
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
