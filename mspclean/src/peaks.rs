//! Peak coercion, ordering and the canonical fixed-precision peak table.
use std::fmt::{Display, Write};

use thiserror::Error;

use crate::filters::{FilteredPeaks, PeakFilter};
use crate::record::RawPeak;

/// The number of fractional digits written for every peak value
pub const PEAK_DECIMALS: usize = 8;

const PEAK_SCALE: f64 = 1e8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeakParseError {
    #[error("Could not parse m/z value {0:?}")]
    InvalidMZ(String),
    #[error("Could not parse intensity value {0:?}")]
    InvalidIntensity(String),
    #[error("Malformed peak line {0:?}")]
    MalformedLine(String),
}

/// A single centroided (m/z, intensity) pair
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

impl Peak {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }

    /// Round both values to the table precision
    pub fn rounded(&self) -> Self {
        Self::new(round_to_table(self.mz), round_to_table(self.intensity))
    }
}

impl From<(f64, f64)> for Peak {
    fn from(value: (f64, f64)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl TryFrom<&RawPeak> for Peak {
    type Error = PeakParseError;

    fn try_from(value: &RawPeak) -> Result<Self, Self::Error> {
        let mz = parse_value(&value.mz).ok_or_else(|| PeakParseError::InvalidMZ(value.mz.clone()))?;
        let intensity = parse_value(&value.intensity)
            .ok_or_else(|| PeakParseError::InvalidIntensity(value.intensity.clone()))?;
        Ok(Self::new(mz, intensity))
    }
}

impl Display for Peak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.rounded();
        write!(f, "{:.*} {:.*}", PEAK_DECIMALS, p.mz, PEAK_DECIMALS, p.intensity)
    }
}

fn parse_value(token: &str) -> Option<f64> {
    let token = token.trim();
    let value: f64 = if token.contains(',') {
        token.replace(',', ".").parse().ok()?
    } else {
        token.parse().ok()?
    };
    value.is_finite().then_some(value)
}

/// Round to [`PEAK_DECIMALS`] places, breaking ties towards the even neighbor
pub fn round_to_table(value: f64) -> f64 {
    let scaled = value * PEAK_SCALE;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round_ties_even() / PEAK_SCALE;
    // Avoid printing "-0.00000000"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Coerce every raw peak to floating point, failing on the first bad token
pub fn coerce_peaks(raw: &[RawPeak]) -> Result<Vec<Peak>, PeakParseError> {
    raw.iter().map(Peak::try_from).collect()
}

/// Stable sort by m/z alone. Intensity never participates in the ordering.
pub fn sort_by_mz(peaks: &mut [Peak]) {
    peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));
}

/// A sorted, filtered peak list ready to be written as a peak table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalPeaks {
    pub peaks: Vec<Peak>,
    pub minimum_not_met: bool,
}

impl CanonicalPeaks {
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.peaks.iter()
    }

    pub fn to_table(&self) -> String {
        format_peak_list(&self.peaks)
    }
}

impl From<FilteredPeaks> for CanonicalPeaks {
    fn from(value: FilteredPeaks) -> Self {
        Self {
            peaks: value.peaks,
            minimum_not_met: value.minimum_not_met,
        }
    }
}

/// Coerce, sort and filter a raw peak list relative to `precursor_mz`.
///
/// Peaks are rounded to table precision before the filter sees them, and again
/// after it, so the filter judges exactly the values that will be written.
/// An empty result is not an error here, the caller decides what to do with it.
pub fn canonicalize<F: PeakFilter + ?Sized>(
    raw: &[RawPeak],
    precursor_mz: f64,
    filter: &F,
) -> Result<CanonicalPeaks, PeakParseError> {
    let mut peaks: Vec<Peak> = coerce_peaks(raw)?.iter().map(Peak::rounded).collect();
    sort_by_mz(&mut peaks);
    let mut result: CanonicalPeaks = filter.filter(peaks, precursor_mz).into();
    result.peaks.iter_mut().for_each(|p| *p = p.rounded());
    Ok(result)
}

/// Render peaks one per line as `mz intensity`, each with [`PEAK_DECIMALS`] fractional digits.
pub fn format_peak_list(peaks: &[Peak]) -> String {
    let mut buffer = String::with_capacity(peaks.len() * 24);
    for (i, peak) in peaks.iter().enumerate() {
        if i > 0 {
            buffer.push('\n');
        }
        // Writing to a String cannot fail
        let _ = write!(buffer, "{peak}");
    }
    buffer
}

/// Read a peak table written by [`format_peak_list`] back into peaks
pub fn parse_peak_table(table: &str) -> Result<Vec<Peak>, PeakParseError> {
    let mut peaks = Vec::new();
    for line in table.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let raw = RawPeak::split_line(line)
            .ok_or_else(|| PeakParseError::MalformedLine(line.to_string()))?;
        for p in raw.iter() {
            peaks.push(Peak::try_from(p)?);
        }
    }
    Ok(peaks)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filters::{FilterParameters, NoFilter, ThresholdFilter};

    fn raw(pairs: &[(&str, &str)]) -> Vec<RawPeak> {
        pairs.iter().map(|(a, b)| RawPeak::new(*a, *b)).collect()
    }

    #[test]
    fn test_rounding() {
        assert_eq!(format!("{}", Peak::new(1.0, 2.5)), "1.00000000 2.50000000");
        assert_eq!(round_to_table(0.123456789), 0.12345679);
        assert_eq!(round_to_table(0.123456781), 0.12345678);
        assert!(round_to_table(-0.000000001).is_sign_positive());
        assert_eq!(format!("{}", Peak::new(-0.000000001, 1.0)), "0.00000000 1.00000000");
    }

    #[test]
    fn test_rounding_ties_to_even() {
        assert_eq!(format!("{:.8}", round_to_table(2.5e-8)), "0.00000002");
        assert_eq!(format!("{:.8}", round_to_table(3.5e-8)), "0.00000004");
        assert_eq!(format!("{:.8}", round_to_table(0.5e-8)), "0.00000000");
    }

    #[test]
    fn test_format_table() {
        let peaks = vec![Peak::new(100.0, 1.0), Peak::new(200.123456789, 50.5)];
        let table = format_peak_list(&peaks);
        assert_eq!(table, "100.00000000 1.00000000\n200.12345679 50.50000000");
        assert!(!table.ends_with('\n'));
        assert_eq!(format_peak_list(&[]), "");
    }

    #[test]
    fn test_coerce_failure() {
        let err = coerce_peaks(&raw(&[("100", "1"), ("abc", "2")])).unwrap_err();
        assert_eq!(err, PeakParseError::InvalidMZ("abc".into()));
        let err = coerce_peaks(&raw(&[("100", "nan")])).unwrap_err();
        assert_eq!(err, PeakParseError::InvalidIntensity("nan".into()));
        let peaks = coerce_peaks(&raw(&[("100,5", "1")])).unwrap();
        assert_eq!(peaks[0].mz, 100.5);
    }

    #[test]
    fn test_sort_is_by_mz_and_stable() {
        let result = canonicalize(
            &raw(&[("300", "1"), ("100", "9"), ("200", "5"), ("100", "3")]),
            500.0,
            &NoFilter,
        )
        .unwrap();
        let pairs: Vec<_> = result.iter().map(|p| (p.mz, p.intensity)).collect();
        assert_eq!(
            pairs,
            vec![(100.0, 9.0), (100.0, 3.0), (200.0, 5.0), (300.0, 1.0)]
        );
        assert!(result.peaks.windows(2).all(|w| w[0].mz <= w[1].mz));
    }

    #[test]
    fn test_table_round_trip() {
        let filter = ThresholdFilter::new(FilterParameters::default());
        let result = canonicalize(
            &raw(&[("150.123456789", "10.000000005"), ("80.1", "2.25"), ("90", "0.333333333")]),
            200.0,
            &filter,
        )
        .unwrap();
        let table = result.to_table();
        let parsed = parse_peak_table(&table).unwrap();
        let expected: Vec<_> = result.iter().map(|p| p.rounded()).collect();
        assert_eq!(parsed, expected);
        assert_eq!(table.lines().count(), result.len());
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let filter = ThresholdFilter::new(FilterParameters {
            min_relative_intensity: 5.0,
            merge_tolerance: Some(crate::filters::MergeTolerance::Da(0.01)),
            ..Default::default()
        });
        let input = raw(&[
            ("120.0001", "40"),
            ("120.005", "60"),
            ("85.2", "1"),
            ("99.999999999", "33.333333333"),
            ("250.0", "10"),
            ("60.0", "100"),
        ]);
        let first = canonicalize(&input, 200.0, &filter).unwrap();
        let table = first.to_table();
        let again_raw = RawPeak::split_line(&table.replace('\n', ";")).unwrap();
        let second = canonicalize(&again_raw, 200.0, &filter).unwrap();
        assert_eq!(second.to_table(), table);
        assert_eq!(first.minimum_not_met, second.minimum_not_met);
    }

    fn recanonicalize(table: &str, precursor_mz: f64, filter: &ThresholdFilter) -> String {
        let again_raw = RawPeak::split_line(&table.replace('\n', ";")).unwrap();
        canonicalize(&again_raw, precursor_mz, filter).unwrap().to_table()
    }

    #[test]
    fn test_intensity_rounding_to_zero_is_removed() {
        let filter = ThresholdFilter::default();
        let first = canonicalize(&raw(&[("50", "100"), ("60", "0.000000004")]), 200.0, &filter)
            .unwrap()
            .to_table();
        assert_eq!(first, "50.00000000 100.00000000");
        assert_eq!(recanonicalize(&first, 200.0, &filter), first);
    }

    #[test]
    fn test_relative_intensity_at_table_precision() {
        let filter = ThresholdFilter::new(FilterParameters {
            min_relative_intensity: 1.0,
            ..Default::default()
        });
        let input = raw(&[("50", "100.00000009"), ("60", "1.000000001"), ("70", "1.5")]);
        let first = canonicalize(&input, 200.0, &filter).unwrap().to_table();
        assert_eq!(recanonicalize(&first, 200.0, &filter), first);
        assert!(first.contains("70.00000000 1.50000000"));
    }
}
