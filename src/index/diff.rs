use crate::index::IndexSnapshot;
use crate::record::{Record, FIELD_CRAWLED_AT, FIELD_DEBUG, FIELD_OBJECT_ID};
use std::collections::{BTreeMap, HashMap};

/// Fields that change on every crawl and never make a record "changed"
const IGNORED_FIELDS: &[&str] = &[FIELD_OBJECT_ID, FIELD_CRAWLED_AT, FIELD_DEBUG];

/// The changes that bring an index in line with a fresh crawl, keyed by url
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    /// New records, without an `objectID`
    pub to_add: BTreeMap<String, Record>,

    /// Changed records, carrying the indexed record's `objectID`
    pub to_update: BTreeMap<String, Record>,

    /// Indexed records no longer produced by the crawl
    ///
    /// Extra indexed records sharing a url are removed too; they are keyed by
    /// `"<url> (<objectID>)"`.
    pub to_remove: BTreeMap<String, Record>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of records touched
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_remove.len()
    }
}

/// Returns true if the two records differ in any field that matters
///
/// Fields are compared by exact JSON equality over the union of both field
/// sets, leaving out the bookkeeping fields in `IGNORED_FIELDS`.
pub fn records_differ(indexed: &Record, fresh: &Record) -> bool {
    let compared = |record: &Record| {
        record
            .fields()
            .filter(|(key, _)| !IGNORED_FIELDS.contains(&key.as_str()))
            .count()
    };

    if compared(indexed) != compared(fresh) {
        return true;
    }

    fresh
        .fields()
        .filter(|(key, _)| !IGNORED_FIELDS.contains(&key.as_str()))
        .any(|(key, value)| indexed.get(key) != Some(value))
}

/// Computes the add/update/remove sets between the indexed snapshot and a fresh crawl
///
/// Records without a url are skipped on both sides. When the crawl produced
/// several records for one url the last one wins; when the index holds
/// several, the first one is reconciled and the others are removed.
pub fn compute_diff(snapshot: &IndexSnapshot, records: &[Record]) -> DiffResult {
    let mut diff = DiffResult::default();

    let mut indexed: HashMap<&str, &Record> = HashMap::with_capacity(snapshot.len());
    for record in snapshot.records() {
        let Some(url) = record.url() else {
            tracing::warn!(
                "Ignoring indexed record {} without a url",
                record.object_id().unwrap_or("?")
            );
            continue;
        };

        if !indexed.contains_key(url) {
            indexed.insert(url, record);
            continue;
        }

        match record.object_id() {
            Some(object_id) => {
                tracing::warn!("Removing duplicate indexed record {} for {}", object_id, url);
                diff.to_remove
                    .insert(format!("{} ({})", url, object_id), record.clone());
            }
            None => tracing::warn!("Ignoring duplicate indexed record without objectID for {}", url),
        }
    }

    let mut fresh: HashMap<&str, &Record> = HashMap::with_capacity(records.len());
    for record in records {
        if let Some(url) = record.url() {
            fresh.insert(url, record);
        }
    }

    for (&url, &record) in &fresh {
        match indexed.get(url) {
            None => {
                diff.to_add.insert(url.to_string(), record.clone());
            }
            Some(&existing) if records_differ(existing, record) => {
                let mut updated = record.clone();
                if let Some(object_id) = existing.get(FIELD_OBJECT_ID) {
                    updated.insert(FIELD_OBJECT_ID, object_id.clone());
                }
                diff.to_update.insert(url.to_string(), updated);
            }
            Some(_) => {}
        }
    }

    for (&url, &record) in &indexed {
        if !fresh.contains_key(url) {
            diff.to_remove.insert(url.to_string(), record.clone());
        }
    }

    diff
}
