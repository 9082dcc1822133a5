//! Translation between stored relative asset paths and delivery URLs.
//!
//! The translator is pure: it never performs I/O and never fails. A misconfigured origin
//! degrades to pass-through with a warning.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};
use url::Url;

use crate::config::CdnSettings;
use crate::domain::assets::{AbsoluteUrl, RelativePath, is_absolute_url, normalize_path};

/// Stand-in origin for encoding redirect paths when no CDN origin applies.
const LOCAL_ORIGIN: &str = "http://localhost";

/// A configured origin, validated once at construction.
#[derive(Debug, Clone)]
enum Origin {
    Unset,
    Malformed(String),
    Valid(String),
}

impl Origin {
    fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Origin::Unset;
        };
        let valid = is_absolute_url(raw) && Url::parse(raw).is_ok_and(|url| url.has_host());
        if !valid {
            return Origin::Malformed(raw.to_string());
        }
        Origin::Valid(raw.trim_end_matches('/').to_string())
    }

    fn valid(&self) -> Option<&str> {
        match self {
            Origin::Valid(base) => Some(base),
            Origin::Unset | Origin::Malformed(_) => None,
        }
    }
}

pub struct PathTranslator {
    enabled: bool,
    base: Origin,
    fallback: Origin,
    cache_max_age: u64,
    warned_base: AtomicBool,
}

impl PathTranslator {
    pub fn new(settings: &CdnSettings) -> Self {
        let fallback = Origin::parse(settings.fallback_url.as_deref());
        if let Origin::Malformed(raw) = &fallback {
            warn!(
                fallback = %raw,
                "CDN fallback URL is malformed; fallback requests use the primary origin"
            );
        }
        Self {
            enabled: settings.enabled,
            base: Origin::parse(settings.base_url.as_deref()),
            fallback,
            cache_max_age: settings.cache_max_age,
            warned_base: AtomicBool::new(false),
        }
    }

    /// Translator that always returns its input; used when no CDN fronts the assets.
    pub fn pass_through() -> Self {
        Self::new(&CdnSettings {
            enabled: false,
            ..CdnSettings::default()
        })
    }

    /// Asset `max-age` in seconds for `Cache-Control` headers.
    pub fn cache_max_age(&self) -> u64 {
        self.cache_max_age
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Join a relative path onto the primary origin.
    ///
    /// Empty input, absolute input, a disabled CDN and a missing or malformed origin all
    /// return the input unchanged.
    pub fn to_absolute(&self, path: &str) -> String {
        if path.is_empty() || is_absolute_url(path) || !self.enabled {
            return path.to_string();
        }
        match self.base.valid() {
            Some(base) => join(base, path),
            None => {
                self.warn_unusable_base();
                path.to_string()
            }
        }
    }

    pub fn to_absolute_batch(&self, paths: Option<&[String]>) -> Option<Vec<String>> {
        paths.map(|paths| paths.iter().map(|path| self.to_absolute(path)).collect())
    }

    /// Like [`to_absolute`](Self::to_absolute), but joins onto the fallback origin when asked
    /// and one is configured.
    pub fn to_absolute_with_fallback(&self, path: &str, use_fallback: bool) -> String {
        let fallback = match (use_fallback, self.fallback.valid()) {
            (true, Some(fallback)) => fallback,
            _ => return self.to_absolute(path),
        };
        if path.is_empty() || is_absolute_url(path) {
            return path.to_string();
        }
        join(fallback, path)
    }

    /// Reduce a delivery URL to its relative path. Relative input is returned unchanged.
    pub fn to_relative(&self, url: &str) -> String {
        if !is_absolute_url(url) {
            return url.to_string();
        }
        for origin in [&self.base, &self.fallback] {
            if let Some(rest) = origin.valid().and_then(|base| strip_origin(url, base)) {
                return rest;
            }
        }
        match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(err) => {
                warn!(url, error = %err, "Failed to extract relative path from URL");
                url.to_string()
            }
        }
    }

    pub fn to_relative_batch(&self, urls: Option<&[String]>) -> Option<Vec<String>> {
        urls.map(|urls| urls.iter().map(|url| self.to_relative(url)).collect())
    }

    /// Ingest a client-supplied locator in either form.
    pub fn relative(&self, input: &str) -> RelativePath {
        RelativePath::new(self.to_relative(input.trim()))
    }

    pub fn absolute(&self, path: &RelativePath) -> AbsoluteUrl {
        AbsoluteUrl::new(self.to_absolute(path.as_str()))
    }

    pub fn absolute_all(&self, paths: Option<&[RelativePath]>) -> Option<Vec<AbsoluteUrl>> {
        paths.map(|paths| paths.iter().map(|path| self.absolute(path)).collect())
    }

    /// `Location` value for an asset redirect.
    ///
    /// Every path segment is percent-encoded. Without a usable origin the result is a path
    /// rooted at a single `/`, never a scheme-relative `//host` reference.
    pub fn redirect_location(&self, path: &RelativePath, use_fallback: bool) -> Option<String> {
        let origin = self.delivery_origin(use_fallback);
        let mut url = Url::parse(origin.unwrap_or(LOCAL_ORIGIN)).ok()?;
        let joined = format!(
            "{}{}",
            url.path().trim_end_matches('/'),
            normalize_path(path.as_str())
        );
        url.set_path(&joined);
        match origin {
            Some(_) => Some(url.into()),
            None => Some(normalize_path(url.path())),
        }
    }

    fn delivery_origin(&self, use_fallback: bool) -> Option<&str> {
        if let (true, Some(fallback)) = (use_fallback, self.fallback.valid()) {
            return Some(fallback);
        }
        if !self.enabled {
            return None;
        }
        let base = self.base.valid();
        if base.is_none() {
            self.warn_unusable_base();
        }
        base
    }

    fn warn_unusable_base(&self) {
        let (reason, base) = match &self.base {
            Origin::Unset => ("CDN base URL is not configured", ""),
            Origin::Malformed(raw) => ("CDN base URL is malformed", raw.as_str()),
            Origin::Valid(_) => return,
        };
        if self.warned_base.swap(true, Ordering::Relaxed) {
            debug!(reason, base, "Returning relative asset path unchanged");
        } else {
            warn!(reason, base, "Returning relative asset paths unchanged");
        }
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{base}{}", normalize_path(path))
}

/// Strip `base` from `url` when it matches up to a path boundary.
fn strip_origin(url: &str, base: &str) -> Option<String> {
    let head = url.get(..base.len())?;
    if !head.eq_ignore_ascii_case(base) {
        return None;
    }
    let rest = &url[base.len()..];
    match rest.chars().next() {
        None => Some("/".to_string()),
        Some('/') => Some(rest.to_string()),
        Some('?') | Some('#') => Some(format!("/{rest}")),
        Some(_) => None,
    }
}
