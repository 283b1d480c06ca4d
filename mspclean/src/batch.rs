//! Clean many records in parallel and sum up what happened to them.
//!
//! Parallelism comes from whichever `rayon` pool is current when the driver is
//! called, so callers control the worker count with [`rayon::ThreadPool::install`].
//! Records are cleaned chunk by chunk. The chunk size only sets how often progress
//! is reported and has no effect on which records are accepted.
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cleaning::{clean_record, CleaningOutcome, CleaningParameters};
use crate::filters::PeakFilter;
use crate::record::Record;
use crate::tally::CleaningTally;

pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// The records that were accepted and the counters for the whole batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub records: Vec<Record>,
    pub tally: CleaningTally,
}

#[derive(Debug, Clone)]
pub struct BatchDriver<F: PeakFilter> {
    pub params: CleaningParameters,
    pub filter: F,
    chunk_size: usize,
}

impl<F: PeakFilter> BatchDriver<F> {
    pub fn new(params: CleaningParameters, filter: F) -> Self {
        Self {
            params,
            filter,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn clean(&self, record: Record) -> CleaningOutcome {
        clean_record(record, &self.params, &self.filter)
    }

    /// Clean one chunk on the current thread pool
    pub fn clean_chunk(&self, chunk: Vec<Record>) -> (Vec<Record>, CleaningTally) {
        let outcomes: Vec<CleaningOutcome> =
            chunk.into_par_iter().map(|r| self.clean(r)).collect();
        let tally: CleaningTally = outcomes.iter().map(CleaningTally::from).sum();
        let accepted = outcomes
            .into_iter()
            .filter_map(CleaningOutcome::into_record)
            .collect();
        (accepted, tally)
    }

    /// Clean an in-memory batch of records
    pub fn process(&self, records: Vec<Record>) -> BatchOutput {
        let total = records.len();
        let started = Instant::now();
        let mut output = BatchOutput {
            records: Vec::with_capacity(total),
            tally: CleaningTally::default(),
        };

        let chunks = records.into_iter().chunks(self.chunk_size);
        for chunk in &chunks {
            let (mut accepted, tally) = self.clean_chunk(chunk.collect());
            output.records.append(&mut accepted);
            output.tally += tally;
            info!(
                "Cleaned {}/{} spectra | Accepted={}",
                output.tally.spectra_seen, total, output.tally.spectra_accepted
            );
        }
        debug!("Cleaning finished in {:0.3?}", started.elapsed());
        output
    }

    /// Clean chunks as they arrive on `receiver`, sending the accepted records of each
    /// chunk on to `sender`.
    ///
    /// Returns when `receiver` is disconnected and drained.
    pub fn process_stream(
        &self,
        receiver: Receiver<Vec<Record>>,
        sender: Sender<Vec<Record>>,
    ) -> CleaningTally {
        let started = Instant::now();
        let mut total = CleaningTally::default();
        for (chunk_idx, chunk) in receiver.into_iter().enumerate() {
            let (accepted, tally) = self.clean_chunk(chunk);
            total += tally;
            if let Err(e) = sender.send(accepted) {
                warn!("Failed to send cleaned chunk {chunk_idx}: {e}");
            }
            info!(
                "Completed chunk {chunk_idx} | Spectra={} Accepted={}",
                total.spectra_seen, total.spectra_accepted
            );
        }
        debug!("Cleaning finished in {:0.3?}", started.elapsed());
        total
    }
}
