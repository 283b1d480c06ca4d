//! Metadata value normalization.
use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::record::{FieldValue, Record, INCHI, INCHIKEY, ION_MODE, SMILES};

static IONMODE_POSITIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^p|^\+|^pos").expect("valid positive ion mode pattern"));

static IONMODE_NEGATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^n|^-|^neg").expect("valid negative ion mode pattern"));

/// Values that stand in for a missing structure
const NULL_MARKERS: &[&str] = &["na", "n/a", "null", "none", "nan"];

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";

/// Map an ion mode string onto `positive` or `negative`.
///
/// The positive pattern is tested first, and anything matching neither is
/// returned as-is.
pub fn normalize_ionmode(value: &str) -> Cow<'_, str> {
    if IONMODE_POSITIVE.is_match(value) {
        Cow::Borrowed(POSITIVE)
    } else if IONMODE_NEGATIVE.is_match(value) {
        Cow::Borrowed(NEGATIVE)
    } else {
        Cow::Borrowed(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NormalizerParameters {
    /// Reject records that carry none of the `identity_fields`
    pub require_identity_fields: bool,
    pub identity_fields: Vec<String>,
}

impl Default for NormalizerParameters {
    fn default() -> Self {
        Self {
            require_identity_fields: true,
            identity_fields: [SMILES, INCHI, INCHIKEY]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Trim text values and canonicalize the ion mode, leaving other fields alone.
///
/// Absent fields are not an error.
pub fn normalize(mut record: Record) -> Record {
    for (key, value) in record.iter_mut() {
        if let FieldValue::Text(text) = value {
            let trimmed = text.trim();
            if key == ION_MODE {
                *text = normalize_ionmode(trimmed).into_owned();
            } else if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
        }
    }
    record
}

fn is_null_marker(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || NULL_MARKERS.iter().any(|m| value.eq_ignore_ascii_case(m))
}

/// Whether at least one structure identifier carries a usable value
pub fn has_identity(record: &Record, params: &NormalizerParameters) -> bool {
    params
        .identity_fields
        .iter()
        .filter_map(|k| record.get_text(k))
        .any(|v| !is_null_marker(v))
}

/// Normalize a record's values, returning `None` when the record lacks every
/// structure identity field and `params` requires one.
pub fn normalize_values(record: Record, params: &NormalizerParameters) -> Option<Record> {
    let record = normalize(record);
    if params.require_identity_fields && !has_identity(&record, params) {
        None
    } else {
        Some(record)
    }
}
