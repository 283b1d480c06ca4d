//! Per-record validation and cleaning.
//!
//! A record moves through a fixed sequence of checks: it must have a peak list,
//! survive value normalization, carry a positive precursor m/z, and keep at least
//! one peak after canonicalization. The first failing check decides the
//! [`RejectionReason`].
use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::filters::PeakFilter;
use crate::normalize::{normalize_values, NormalizerParameters};
use crate::peaks::canonicalize;
use crate::record::{FieldValue, Record, NUM_PEAKS, PEAKS_LIST, PRECURSOR_MZ};
use crate::tally::CleaningTally;

static FLOAT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+[.,]?\d*(?:[Ee][+-]?\d+)?").expect("valid float token pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The peak list was absent, empty, or emptied by filtering
    NoPeakList,
    /// The precursor m/z was absent, had no numeric token, or was not positive
    BadPrecursorMz,
    /// None of the structure identity fields had a value
    MissingIdentityFields,
    /// A peak value could not be read as a number
    UnparseablePeaks,
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RejectionReason::NoPeakList => "no peak list",
            RejectionReason::BadPrecursorMz => "bad precursor m/z",
            RejectionReason::MissingIdentityFields => "missing identity fields",
            RejectionReason::UnparseablePeaks => "unparseable peaks",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleaningOutcome {
    Accepted {
        record: Record,
        minimum_peaks_not_met: bool,
    },
    Rejected {
        reason: RejectionReason,
        minimum_peaks_not_met: bool,
    },
}

impl CleaningOutcome {
    fn rejected(reason: RejectionReason) -> Self {
        Self::Rejected {
            reason,
            minimum_peaks_not_met: false,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { reason, .. } => Some(*reason),
        }
    }

    pub fn minimum_peaks_not_met(&self) -> bool {
        match self {
            Self::Accepted {
                minimum_peaks_not_met,
                ..
            }
            | Self::Rejected {
                minimum_peaks_not_met,
                ..
            } => *minimum_peaks_not_met,
        }
    }

    pub fn tally(&self) -> CleaningTally {
        CleaningTally::from_outcome(self)
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Accepted { record, .. } => Some(record),
            Self::Rejected { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CleaningParameters {
    pub normalizer: NormalizerParameters,
}

/// Extract the first numeric token from a precursor m/z value.
///
/// Returns the token with `,` replaced by `.` and its parsed value, which
/// may be zero or negative.
pub fn parse_precursor_mz(value: &str) -> Option<(String, f64)> {
    let token = FLOAT_TOKEN.find(value)?.as_str().replace(',', ".");
    let mz: f64 = token.parse().ok()?;
    mz.is_finite().then_some((token, mz))
}

/// Validate, normalize and canonicalize one record
pub fn clean_record<F: PeakFilter + ?Sized>(
    mut record: Record,
    params: &CleaningParameters,
    filter: &F,
) -> CleaningOutcome {
    let raw_peaks = match record.take_peaks() {
        Some(Ok(peaks)) if !peaks.is_empty() => Ok(peaks),
        Some(Err(e)) => Err(e),
        _ => {
            trace!("{} has no peak list", record.name());
            return CleaningOutcome::rejected(RejectionReason::NoPeakList);
        }
    };

    let Some(mut record) = normalize_values(record, &params.normalizer) else {
        return CleaningOutcome::rejected(RejectionReason::MissingIdentityFields);
    };

    let Some(precursor) = record.get_text(PRECURSOR_MZ) else {
        trace!("{} has no precursor m/z", record.name());
        return CleaningOutcome::rejected(RejectionReason::BadPrecursorMz);
    };

    let (token, precursor_mz) = match parse_precursor_mz(precursor) {
        Some((token, mz)) if mz > 0.0 => (token, mz),
        _ => {
            debug!(
                "{} has an unusable precursor m/z {precursor:?}",
                record.name()
            );
            return CleaningOutcome::rejected(RejectionReason::BadPrecursorMz);
        }
    };
    record.insert(PRECURSOR_MZ, token);

    let peaks = match raw_peaks.and_then(|raw| canonicalize(&raw, precursor_mz, filter)) {
        Ok(peaks) => peaks,
        Err(e) => {
            debug!("{}: {e}", record.name());
            return CleaningOutcome::rejected(RejectionReason::UnparseablePeaks);
        }
    };

    let minimum_peaks_not_met = peaks.minimum_not_met;
    if peaks.is_empty() {
        return CleaningOutcome::Rejected {
            reason: RejectionReason::NoPeakList,
            minimum_peaks_not_met,
        };
    }

    record.push(NUM_PEAKS, peaks.len().to_string());
    record.push(PEAKS_LIST, FieldValue::Text(peaks.to_table()));
    CleaningOutcome::Accepted {
        record,
        minimum_peaks_not_met,
    }
}
