use std::path::PathBuf;

use serde::Serialize;

use mspclean::CleaningTally;

/// Counters from the reader thread
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ReadProgress {
    pub lines_read: usize,
    pub entries_read: usize,
    pub malformed_entries: usize,
    pub chunks_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSummary {
    pub label: String,
    pub path: PathBuf,
    pub spectra: usize,
}

/// Everything reported at the end of a run, written out by `--summary-file`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub input: String,
    pub read: ReadProgress,
    pub cleaning: CleaningTally,
    pub unclassified_polarity: usize,
    pub outputs: Vec<OutputSummary>,
}
