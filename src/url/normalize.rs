use crate::UrlError;
use url::Url;

/// Click-id query parameters dropped during normalization; `utm_*` is matched by prefix
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "msclkid", "mc_eid"];

/// Normalizes a URL into the canonical form used for dedup keys
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host (the `url` crate lowercases the scheme)
/// 4. Remove a trailing slash from the path, except for the root `/`
/// 5. Remove tracking query parameters (`utm_*`, click ids)
/// 6. Sort remaining query parameters by key, keeping values in order
/// 7. Remove the fragment unless `keep_fragment` is set
///
/// # Examples
///
/// ```
/// use site_sync::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM/Docs/?b=2&a=1&utm_source=x#top", false).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/Docs?a=1&b=2");
///
/// let url = normalize_url("https://example.com/docs#top", true).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs#top");
/// ```
pub fn normalize_url(url_str: &str, keep_fragment: bool) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    if !keep_fragment {
        url.set_fragment(None);
    }

    Ok(url)
}

/// Query pairs without tracking parameters, stably sorted by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_") && !TRACKING_PARAMS.iter().any(|param| *param == *key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    kept.sort_by(|a, b| a.0.cmp(&b.0));
    kept
}
