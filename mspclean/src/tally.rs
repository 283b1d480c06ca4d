use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::cleaning::{CleaningOutcome, RejectionReason};

/// Counters summed over many cleaning calls.
///
/// Unparseable peak lists are counted both in `unparseable_peaks` and in
/// `no_peaks_list`, which is the counter reported for empty peak lists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CleaningTally {
    pub spectra_seen: usize,
    pub spectra_accepted: usize,
    pub no_peaks_list: usize,
    pub no_or_bad_precursor_mz: usize,
    pub no_identity_fields: usize,
    pub minimum_peaks_not_met: usize,
    pub unparseable_peaks: usize,
}

impl CleaningTally {
    pub fn rejected(&self) -> usize {
        self.spectra_seen - self.spectra_accepted
    }

    /// The counter contribution of a single outcome
    pub fn from_outcome(outcome: &CleaningOutcome) -> Self {
        let mut tally = Self {
            spectra_seen: 1,
            minimum_peaks_not_met: outcome.minimum_peaks_not_met() as usize,
            ..Default::default()
        };
        match outcome.rejection() {
            None => tally.spectra_accepted = 1,
            Some(RejectionReason::NoPeakList) => tally.no_peaks_list = 1,
            Some(RejectionReason::UnparseablePeaks) => {
                tally.no_peaks_list = 1;
                tally.unparseable_peaks = 1;
            }
            Some(RejectionReason::BadPrecursorMz) => tally.no_or_bad_precursor_mz = 1,
            Some(RejectionReason::MissingIdentityFields) => tally.no_identity_fields = 1,
        }
        tally
    }
}

impl From<&CleaningOutcome> for CleaningTally {
    fn from(value: &CleaningOutcome) -> Self {
        Self::from_outcome(value)
    }
}

impl Add for CleaningTally {
    type Output = CleaningTally;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for CleaningTally {
    fn add_assign(&mut self, rhs: Self) {
        self.spectra_seen += rhs.spectra_seen;
        self.spectra_accepted += rhs.spectra_accepted;
        self.no_peaks_list += rhs.no_peaks_list;
        self.no_or_bad_precursor_mz += rhs.no_or_bad_precursor_mz;
        self.no_identity_fields += rhs.no_identity_fields;
        self.minimum_peaks_not_met += rhs.minimum_peaks_not_met;
        self.unparseable_peaks += rhs.unparseable_peaks;
    }
}

impl Sum for CleaningTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Self::add)
    }
}

impl<'a> Sum<&'a CleaningTally> for CleaningTally {
    fn sum<I: Iterator<Item = &'a CleaningTally>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, x| acc + *x)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::Record;

    #[test]
    fn test_sum() {
        let outcomes = vec![
            CleaningOutcome::Accepted {
                record: Record::new(),
                minimum_peaks_not_met: true,
            },
            CleaningOutcome::Rejected {
                reason: RejectionReason::UnparseablePeaks,
                minimum_peaks_not_met: false,
            },
            CleaningOutcome::Rejected {
                reason: RejectionReason::BadPrecursorMz,
                minimum_peaks_not_met: false,
            },
        ];
        let tally: CleaningTally = outcomes.iter().map(CleaningTally::from).sum();
        assert_eq!(tally.spectra_seen, 3);
        assert_eq!(tally.spectra_accepted, 1);
        assert_eq!(tally.rejected(), 2);
        assert_eq!(tally.no_peaks_list, 1);
        assert_eq!(tally.unparseable_peaks, 1);
        assert_eq!(tally.no_or_bad_precursor_mz, 1);
        assert_eq!(tally.minimum_peaks_not_met, 1);
        assert_eq!(tally.no_identity_fields, 0);
    }
}
