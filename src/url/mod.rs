//! URL handling module for site-sync
//!
//! This module provides dedup-key normalization, pseudo-URL allow-rules,
//! href resolution and the link transforms applied before enqueueing.

mod normalize;
mod pseudo;

pub use normalize::normalize_url;
pub use pseudo::PseudoUrl;

use url::Url;

/// A discovered link ready to be enqueued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// URL the request will fetch
    pub url: String,

    /// Key deciding whether the link was already seen this session
    pub unique_key: String,
}

/// How discovered links are rewritten before they are enqueued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlTransform {
    /// Drop the query string (and fragment) from the URL and its key
    pub omit_search_params: bool,

    /// Keep the fragment in the URL and its key
    pub keep_fragment: bool,
}

impl UrlTransform {
    /// Applies the transform to an absolute URL
    ///
    /// # Examples
    ///
    /// ```
    /// use site_sync::url::UrlTransform;
    /// use url::Url;
    ///
    /// let url = Url::parse("https://x.com/p?x=1#f").unwrap();
    ///
    /// let omit = UrlTransform { omit_search_params: true, keep_fragment: false };
    /// assert_eq!(omit.apply(&url).unique_key, "https://x.com/p");
    ///
    /// let keep = UrlTransform { omit_search_params: false, keep_fragment: true };
    /// assert_eq!(keep.apply(&url).unique_key, "https://x.com/p?x=1#f");
    /// ```
    pub fn apply(&self, url: &Url) -> LinkTarget {
        let mut url = url.clone();

        if self.omit_search_params {
            url.set_query(None);
            if !self.keep_fragment {
                url.set_fragment(None);
            }
            let stripped = url.to_string();
            return LinkTarget {
                url: stripped.clone(),
                unique_key: stripped,
            };
        }

        let unique_key = normalize_url(url.as_str(), self.keep_fragment)
            .map(|normalized| normalized.to_string())
            .unwrap_or_else(|_| url.to_string());

        if !self.keep_fragment {
            url.set_fragment(None);
        }

        LinkTarget {
            url: url.to_string(),
            unique_key,
        }
    }
}

/// Resolves an href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => Some(absolute_url),
        _ => None,
    }
}
