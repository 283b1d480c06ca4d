//! Validate, normalize and canonicalize MSP spectral library records, and split a
//! cleaned library by ion polarity and chromatography method.
pub mod record;
pub mod peaks;
pub mod filters;
pub mod normalize;
pub mod cleaning;
pub mod tally;
pub mod batch;
pub mod splitter;
pub mod msp;

pub use crate::batch::{BatchDriver, BatchOutput, DEFAULT_CHUNK_SIZE};
pub use crate::cleaning::{clean_record, parse_precursor_mz, CleaningOutcome, CleaningParameters, RejectionReason};
pub use crate::filters::{FilterParameters, FilteredPeaks, MergeTolerance, NoFilter, PeakFilter, ThresholdFilter};
pub use crate::msp::{write_record, MspError, MspReader, MspWriter};
pub use crate::normalize::{normalize_ionmode, normalize_values, NormalizerParameters};
pub use crate::peaks::{canonicalize, CanonicalPeaks, Peak, PeakParseError};
pub use crate::record::{FieldValue, RawPeak, Record};
pub use crate::splitter::{split_corpus, ChromatographyMethod, Polarity, SplitCorpus};
pub use crate::tally::CleaningTally;
