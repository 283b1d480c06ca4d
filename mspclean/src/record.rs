//! The in-memory representation of a single MSP library entry.
use std::fmt::Display;

use indexmap::{map::Iter, IndexMap};

use crate::peaks::PeakParseError;

pub const NAME: &str = "NAME";
pub const PRECURSOR_MZ: &str = "PRECURSORMZ";
pub const PRECURSOR_TYPE: &str = "PRECURSORTYPE";
pub const ION_MODE: &str = "IONMODE";
pub const CHARGE: &str = "CHARGE";
pub const SMILES: &str = "SMILES";
pub const INCHI: &str = "INCHI";
pub const INCHIKEY: &str = "INCHIKEY";
pub const NUM_PEAKS: &str = "NUM PEAKS";
pub const PEAKS_LIST: &str = "PEAKS_LIST";

/// The two unparsed tokens of a single peak line.
///
/// Peaks are kept as text until the peak list is canonicalized so that a
/// single malformed value rejects its own record instead of the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawPeak {
    pub mz: String,
    pub intensity: String,
}

impl RawPeak {
    pub fn new(mz: impl Into<String>, intensity: impl Into<String>) -> Self {
        Self {
            mz: mz.into(),
            intensity: intensity.into(),
        }
    }

    /// Split a peak line into its peaks.
    ///
    /// A line may carry several `mz intensity` pairs separated by `;`. Tokens
    /// after the intensity (e.g. a quoted annotation) are ignored. Returns `None`
    /// if any pair is missing its intensity.
    pub fn split_line(line: &str) -> Option<Vec<RawPeak>> {
        let mut peaks = Vec::new();
        for pair in line.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let mut tokens = pair.split_ascii_whitespace();
            let mz = tokens.next()?;
            let intensity = tokens.next()?;
            peaks.push(RawPeak::new(mz, intensity));
        }
        Some(peaks)
    }
}

impl<M: Into<String>, I: Into<String>> From<(M, I)> for RawPeak {
    fn from(value: (M, I)) -> Self {
        Self::new(value.0, value.1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    Text(String),
    Peaks(Vec<RawPeak>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::Peaks(_) => None,
        }
    }

    /// Whether the value carries no information at all
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Peaks(p) => p.is_empty(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<RawPeak>> for FieldValue {
    fn from(value: Vec<RawPeak>) -> Self {
        Self::Peaks(value)
    }
}

/// A spectrum's metadata and peak list, keyed by case-sensitive field name.
///
/// Field order follows insertion order so that a record can be written back
/// out in the order it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(key)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_text())
    }

    /// Insert a value, keeping the position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a value, preserving the order of the remaining fields
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.shift_remove(key)
    }

    /// Insert a value so that it is the last field of the record
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        self.fields.shift_remove(&key);
        self.fields.insert(key, value.into());
    }

    pub fn iter(&self) -> Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, FieldValue> {
        self.fields.iter_mut()
    }

    /// A label for log messages
    pub fn name(&self) -> &str {
        self.get_text(NAME).unwrap_or("<unnamed>")
    }

    /// Remove the peak list from the record, splitting it into [`RawPeak`]s if it was
    /// stored as text.
    ///
    /// A text peak list with an unsplittable line yields an error so the caller can
    /// reject the record.
    pub fn take_peaks(&mut self) -> Option<Result<Vec<RawPeak>, PeakParseError>> {
        match self.remove(PEAKS_LIST)? {
            FieldValue::Peaks(peaks) => Some(Ok(peaks)),
            FieldValue::Text(text) => {
                let mut peaks = Vec::new();
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    match RawPeak::split_line(line) {
                        Some(mut batch) => peaks.append(&mut batch),
                        None => return Some(Err(PeakParseError::MalformedLine(line.to_string()))),
                    }
                }
                Some(Ok(peaks))
            }
        }
    }

    /// The number of peaks that the peak list holds, without parsing them
    pub fn peak_count(&self) -> usize {
        match self.get(PEAKS_LIST) {
            Some(FieldValue::Peaks(p)) => p.len(),
            Some(FieldValue::Text(t)) => t.lines().filter(|l| !l.trim().is_empty()).count(),
            None => 0,
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut this = Self::new();
        for (k, v) in iter {
            this.insert(k, v);
        }
        this
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a FieldValue);

    type IntoIter = Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record({}, {} fields)", self.name(), self.len())
    }
}
