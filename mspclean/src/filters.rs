//! Configurable peak list filters applied after sorting.
//!
//! The [`PeakFilter`] trait is the seam between the canonicalizer and the filtering
//! rules. [`ThresholdFilter`] is the configurable implementation used by the command
//! line tool, driven by a [`FilterParameters`] table.
use mzpeaks::Tolerance;

use crate::peaks::Peak;

/// The peaks that survived filtering and whether there were too few of them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredPeaks {
    pub peaks: Vec<Peak>,
    pub minimum_not_met: bool,
}

impl FilteredPeaks {
    pub fn new(peaks: Vec<Peak>, minimum_not_met: bool) -> Self {
        Self {
            peaks,
            minimum_not_met,
        }
    }
}

/// Filter a peak list sorted by m/z relative to the spectrum's precursor m/z.
///
/// Implementations receive the peaks in ascending m/z order and must return them
/// in ascending m/z order.
pub trait PeakFilter: Send + Sync {
    fn filter(&self, peaks: Vec<Peak>, precursor_mz: f64) -> FilteredPeaks;
}

impl<F: Fn(Vec<Peak>, f64) -> FilteredPeaks + Send + Sync> PeakFilter for F {
    fn filter(&self, peaks: Vec<Peak>, precursor_mz: f64) -> FilteredPeaks {
        (self)(peaks, precursor_mz)
    }
}

/// Pass every peak through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFilter;

impl PeakFilter for NoFilter {
    fn filter(&self, peaks: Vec<Peak>, _precursor_mz: f64) -> FilteredPeaks {
        FilteredPeaks::new(peaks, false)
    }
}

/// The width of the window used to merge neighboring peaks
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeTolerance {
    Da(f64),
    PPM(f64),
}

impl From<MergeTolerance> for Tolerance {
    fn from(value: MergeTolerance) -> Self {
        match value {
            MergeTolerance::Da(x) => Tolerance::Da(x),
            MergeTolerance::PPM(x) => Tolerance::PPM(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterParameters {
    /// Drop peaks with an intensity of zero or less
    pub remove_zero_intensity: bool,
    /// Drop peaks below this m/z
    pub min_mz: f64,
    /// Drop peaks more than `precursor_margin` above the precursor m/z
    pub remove_above_precursor: bool,
    pub precursor_margin: f64,
    /// Merge runs of peaks closer than this, keeping the most intense m/z and summing intensities
    pub merge_tolerance: Option<MergeTolerance>,
    /// Drop peaks below this percentage of the base peak intensity
    pub min_relative_intensity: f64,
    /// Keep at most this many of the most intense peaks
    pub max_peaks: Option<usize>,
    /// Flag spectra with fewer peaks than this after filtering
    pub min_peaks: usize,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            remove_zero_intensity: true,
            min_mz: 0.0,
            remove_above_precursor: true,
            precursor_margin: 1.6,
            merge_tolerance: None,
            min_relative_intensity: 0.0,
            max_peaks: None,
            min_peaks: 1,
        }
    }
}

/// The [`PeakFilter`] configured by [`FilterParameters`].
///
/// Steps run in a fixed order: intensity floor, m/z window, merging, relative
/// intensity, top-N, then the minimum peak count check. Running the filter on its
/// own output yields the same peaks.
#[derive(Debug, Clone, Default)]
pub struct ThresholdFilter {
    pub params: FilterParameters,
}

impl ThresholdFilter {
    pub fn new(params: FilterParameters) -> Self {
        Self { params }
    }

    fn in_window(&self, peak: &Peak, precursor_mz: f64) -> bool {
        if self.params.remove_zero_intensity && peak.intensity <= 0.0 {
            return false;
        }
        if peak.mz < self.params.min_mz {
            return false;
        }
        !(self.params.remove_above_precursor
            && peak.mz > precursor_mz + self.params.precursor_margin)
    }

    fn merge(&self, peaks: Vec<Peak>, tolerance: Tolerance) -> Vec<Peak> {
        let mut merged: Vec<Peak> = Vec::with_capacity(peaks.len());
        let mut last_mz = f64::NEG_INFINITY;
        let mut best_intensity = 0.0;
        for peak in peaks {
            match merged.last_mut() {
                Some(current) if tolerance.test(peak.mz, last_mz) => {
                    if peak.intensity > best_intensity {
                        current.mz = peak.mz;
                        best_intensity = peak.intensity;
                    }
                    current.intensity += peak.intensity;
                }
                _ => {
                    best_intensity = peak.intensity;
                    merged.push(peak);
                }
            }
            last_mz = peak.mz;
        }
        merged
    }

    fn keep_most_intense(&self, peaks: Vec<Peak>, max_peaks: usize) -> Vec<Peak> {
        if peaks.len() <= max_peaks {
            return peaks;
        }
        let mut order: Vec<usize> = (0..peaks.len()).collect();
        order.sort_by(|a, b| peaks[*b].intensity.total_cmp(&peaks[*a].intensity));
        order.truncate(max_peaks);
        order.sort_unstable();
        order.into_iter().map(|i| peaks[i]).collect()
    }
}

impl PeakFilter for ThresholdFilter {
    fn filter(&self, peaks: Vec<Peak>, precursor_mz: f64) -> FilteredPeaks {
        let mut peaks: Vec<Peak> = peaks
            .into_iter()
            .filter(|p| self.in_window(p, precursor_mz))
            .collect();

        if let Some(tol) = self.params.merge_tolerance {
            peaks = self.merge(peaks, tol.into());
        }

        if self.params.min_relative_intensity > 0.0 {
            let base_peak = peaks
                .iter()
                .map(|p| p.intensity)
                .fold(0.0f64, f64::max);
            let threshold = base_peak * self.params.min_relative_intensity / 100.0;
            peaks.retain(|p| p.intensity >= threshold);
        }

        if let Some(max_peaks) = self.params.max_peaks {
            peaks = self.keep_most_intense(peaks, max_peaks);
        }

        let minimum_not_met = peaks.len() < self.params.min_peaks;
        FilteredPeaks::new(peaks, minimum_not_met)
    }
}
