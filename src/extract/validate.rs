use crate::record::Record;
use serde_json::Value;

/// Records that passed validation and the number that did not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub records: Vec<Record>,
    pub dropped: usize,
}

/// Returns true if a field value counts as missing
///
/// Absent, `null`, `false`, zero and the empty string are all missing.
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

/// Keeps the records that carry a `url` and every required attribute
///
/// Order is preserved. Dropped records are counted, never raised.
pub fn validate_records(records: Vec<Record>, required_attributes: &[String]) -> ValidationOutcome {
    let total = records.len();

    let records: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            record.url().is_some()
                && required_attributes
                    .iter()
                    .all(|attribute| !is_missing(record.get(attribute)))
        })
        .collect();

    let dropped = total - records.len();
    if dropped > 0 {
        tracing::debug!("Dropped {} of {} record(s) missing required attributes", dropped, total);
    }

    ValidationOutcome { records, dropped }
}
