//! Record extraction for site-sync
//!
//! This module turns a rendered page into records:
//! - `selectors`: field -> selector mapping evaluated against a page
//! - `text`: markup to plain text conversion
//! - `builder`: record assembly and stamping
//! - `validate`: required-attribute filtering

mod builder;
mod selectors;
mod text;
mod validate;

pub use builder::{build_record, RecordStamp, MAX_FIELD_LENGTH};
pub use selectors::{extract_fields, RawField};
pub use text::{html_to_text, truncate_chars};
pub use validate::{is_missing, validate_records, ValidationOutcome};

use crate::config::SelectorEntry;

/// Ordered mapping of field name to CSS selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSpec {
    entries: Vec<(String, String)>,
}

impl SelectorSpec {
    /// Builds a spec from `(field, selector)` pairs; a repeated field keeps its last selector
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            match entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        Self { entries }
    }

    /// Builds a spec from the `[[selectors]]` config entries
    pub fn from_entries(entries: &[SelectorEntry]) -> Self {
        Self::new(entries.iter().map(|e| (e.key.as_str(), e.value.as_str())))
    }

    /// Iterates `(field, selector)` pairs in configuration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_configuration_order() {
        let spec = SelectorSpec::new([("title", "h1"), ("body", "main"), ("desc", "meta")]);
        let keys: Vec<_> = spec.keys().collect();
        assert_eq!(keys, vec!["title", "body", "desc"]);
    }

    #[test]
    fn test_repeated_key_keeps_last_selector() {
        let spec = SelectorSpec::new([("title", "h1"), ("title", "h2")]);
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.get("title"), Some("h2"));
    }

    #[test]
    fn test_from_entries() {
        let spec = SelectorSpec::from_entries(&[SelectorEntry {
            key: "title".to_string(),
            value: "h1".to_string(),
        }]);
        assert_eq!(spec.iter().collect::<Vec<_>>(), vec![("title", "h1")]);
    }
}
