use crate::config::SnapshotErrors;
use crate::index::{IndexError, SearchIndex};
use crate::record::Record;
use crate::SyncError;

/// The records currently indexed for one crawler identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    records: Vec<Record>,
}

impl IndexSnapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads every record indexed with `crawledBy` equal to `crawled_by`
///
/// Pages are requested `batch_size` hits at a time until the index stops
/// returning a cursor. What happens on failure depends on `policy`: `Fail`
/// surfaces `SnapshotRetrieval`, `Empty` logs it and returns an empty snapshot.
pub async fn read_snapshot(
    index: &dyn SearchIndex,
    crawled_by: &str,
    batch_size: u32,
    policy: SnapshotErrors,
) -> Result<IndexSnapshot, SyncError> {
    match browse_all(index, crawled_by, batch_size).await {
        Ok(records) => {
            tracing::info!(
                "Index snapshot for '{}' holds {} record(s)",
                crawled_by,
                records.len()
            );
            Ok(IndexSnapshot::new(records))
        }
        Err(source) => match policy {
            SnapshotErrors::Fail => Err(SyncError::SnapshotRetrieval {
                crawled_by: crawled_by.to_string(),
                source,
            }),
            SnapshotErrors::Empty => {
                tracing::warn!(
                    "Failed to read index snapshot for '{}', continuing with an empty one: {}",
                    crawled_by,
                    source
                );
                Ok(IndexSnapshot::default())
            }
        },
    }
}

async fn browse_all(
    index: &dyn SearchIndex,
    crawled_by: &str,
    batch_size: u32,
) -> Result<Vec<Record>, IndexError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = index.browse(crawled_by, cursor.as_deref(), batch_size).await?;
        tracing::debug!("Browsed {} hit(s) for '{}'", page.hits.len(), crawled_by);
        records.extend(page.hits);

        match page.cursor {
            Some(next) if !next.is_empty() => {
                if cursor.as_deref() == Some(next.as_str()) {
                    return Err(IndexError::Decode(format!(
                        "browse cursor '{}' did not advance",
                        next
                    )));
                }
                cursor = Some(next);
            }
            _ => break,
        }
    }

    Ok(records)
}
