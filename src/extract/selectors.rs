use crate::crawler::Page;
use crate::extract::SelectorSpec;
use crate::SyncError;

/// Raw markup extracted for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub key: String,
    pub markup: String,
}

/// Evaluates every selector of `selectors` against `page`
///
/// Matched elements contribute their inner HTML, joined by a single space.
/// When that is empty the `content` attribute of the first match is used
/// instead (meta tags). Fields with nothing to offer are left out.
pub fn extract_fields(page: &dyn Page, selectors: &SelectorSpec) -> Result<Vec<RawField>, SyncError> {
    let mut fields = Vec::with_capacity(selectors.len());

    for (key, selector) in selectors.iter() {
        let elements = page.query_all(selector)?;
        let Some(first) = elements.first() else {
            continue;
        };

        let joined = elements
            .iter()
            .map(|element| element.inner_html.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let markup = if joined.trim().is_empty() {
            match first.attr("content") {
                Some(content) if !content.is_empty() => content.to_string(),
                _ => continue,
            }
        } else {
            joined
        };

        fields.push(RawField {
            key: key.to_string(),
            markup,
        });
    }

    Ok(fields)
}
