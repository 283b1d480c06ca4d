use std::fs;
use std::io::{self, prelude::*};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::Parser;
use serde::{Deserialize, Serialize};

use flate2::read::MultiGzDecoder;

use thiserror::Error;

use tracing::{debug, info, warn};

use mspclean::{
    split_corpus, BatchDriver, CleaningParameters, CleaningTally, FilterParameters, MspReader,
    MspWriter, NormalizerParameters, ThresholdFilter, DEFAULT_CHUNK_SIZE,
};

use crate::args::{input_stem, positive_usize, OutputPaths};
use crate::proc::read_records;
use crate::progress::{OutputSummary, RunSummary};
use crate::write::{write_output, write_split_outputs, OutputHandle};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Error)]
pub enum MspCleanerError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to open input file {path}: {source}")]
    InputOpenError {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectoryError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read configuration: {0}")]
    ConfigurationError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to write run summary: {0}")]
    SummaryError(
        #[source]
        #[from]
        serde_json::Error,
    ),
}

fn is_gzipped<R: BufRead>(handle: &mut R) -> io::Result<bool> {
    let buf = handle.fill_buf()?;
    Ok(buf.len() >= 2 && buf[..2] == GZIP_MAGIC)
}

/// Clean an MSP spectral library and split it by polarity and chromatography method.
///
/// Read a file or stream, validate and canonicalize every entry, write out the
/// accepted entries, then write one file per polarity and chromatography method.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MspCleaner {
    /// The path to read the input library from, or if '-' is passed, read from STDIN.
    ///
    /// Gzip compressed input is detected automatically.
    #[arg()]
    pub input_file: String,

    /// The directory to write output files to
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mspcleaner.toml` in the working directory.
    /// Environment variables prefixed with `MSPCLEANER_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The number of entries to read before handing them off for cleaning
    #[arg(short = 'c', long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE, value_parser = positive_usize)]
    pub chunk_size: usize,

    /// Compress every output file with gzip
    #[arg(short = 'z', long = "gzip")]
    pub gzip: bool,

    /// Only write the cleaned library, skipping the polarity and chromatography split
    #[arg(long = "no-split")]
    pub no_split: bool,

    /// The path to write a JSON summary of the run to
    #[arg(long = "summary-file")]
    pub summary_file: Option<PathBuf>,

    #[arg(skip)]
    pub filters: FilterParameters,

    #[arg(skip)]
    pub normalizer: NormalizerParameters,
}

impl Default for MspCleaner {
    fn default() -> Self {
        Self {
            input_file: "-".to_string(),
            output_dir: PathBuf::from("."),
            log_file: None,
            config_file: None,
            threads: -1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            gzip: false,
            no_split: false,
            summary_file: None,
            filters: FilterParameters::default(),
            normalizer: NormalizerParameters::default(),
        }
    }
}

impl MspCleaner {
    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MspCleanerError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()?.into()
        };
        debug!("Using {} cores", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| io::Error::other(e).into())
    }

    fn make_batch_driver(&self) -> BatchDriver<ThresholdFilter> {
        let params = CleaningParameters {
            normalizer: self.normalizer.clone(),
        };
        BatchDriver::new(params, ThresholdFilter::new(self.filters.clone()))
            .with_chunk_size(self.chunk_size)
    }

    fn open_input(&self) -> Result<Box<dyn BufRead + Send>, MspCleanerError> {
        let mut handle: Box<dyn BufRead + Send> = if self.input_file == "-" {
            Box::new(io::BufReader::with_capacity(2usize.pow(20), io::stdin()))
        } else {
            let fh = fs::File::open(&self.input_file).map_err(|source| {
                MspCleanerError::InputOpenError {
                    path: self.input_file.clone(),
                    source,
                }
            })?;
            Box::new(io::BufReader::new(fh))
        };
        if is_gzipped(&mut handle)? {
            debug!("Detected gzip compressed input");
            handle = Box::new(io::BufReader::new(MultiGzDecoder::new(handle)));
        }
        Ok(handle)
    }

    pub fn main(&self) -> Result<(), MspCleanerError> {
        info!(
            "mspcleaner v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_dir.display());
        let reader = self.open_input()?;
        fs::create_dir_all(&self.output_dir).map_err(|source| {
            MspCleanerError::OutputDirectoryError {
                path: self.output_dir.clone(),
                source,
            }
        })?;
        self.create_threadpool()?
            .install(|| self.run_workflow(reader))
    }

    fn run_workflow(&self, reader: Box<dyn BufRead + Send>) -> Result<(), MspCleanerError> {
        let paths = OutputPaths::new(
            &self.output_dir,
            &input_stem(&self.input_file),
            self.gzip,
        );
        let writer = MspWriter::new(OutputHandle::create(&paths.cleaned, self.gzip)?);
        let keep_blocks = !self.no_split;

        let (send_raw, recv_raw) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let (send_cleaned, recv_cleaned) = crossbeam_channel::bounded(CHANNEL_CAPACITY);

        let start = Instant::now();
        let chunk_size = self.chunk_size;
        let read_task =
            thread::spawn(move || read_records(MspReader::new(reader), send_raw, chunk_size));
        let write_task =
            thread::spawn(move || write_output(writer, recv_cleaned, keep_blocks));

        let tally = self.make_batch_driver().process_stream(recv_raw, send_cleaned);

        let mut summary = RunSummary {
            input: self.input_file.clone(),
            cleaning: tally,
            ..Default::default()
        };

        let read_result = read_task
            .join()
            .unwrap_or_else(|e| Err(io::Error::other(format!("Reader thread panicked: {e:?}"))));
        let write_result = write_task
            .join()
            .unwrap_or_else(|e| Err(io::Error::other(format!("Writer thread panicked: {e:?}"))));

        summary.read = read_result?;
        let (count, blocks) = write_result?;
        summary.outputs.push(OutputSummary {
            label: "cleaned".to_string(),
            path: paths.cleaned.clone(),
            spectra: count,
        });
        info!("Cleaned: {count} spectra -> {}", paths.cleaned.display());
        let processing_elapsed = start.elapsed();

        self.log_tally(&summary.cleaning);

        if !self.no_split {
            let total = blocks.len();
            let corpus = split_corpus(blocks);
            summary.unclassified_polarity = total - corpus.len();
            if summary.unclassified_polarity > 0 {
                info!(
                    "No detectable polarity: {} spectra left out of the split",
                    summary.unclassified_polarity
                );
            }
            summary
                .outputs
                .extend(write_split_outputs(&corpus, &paths, self.gzip)?);
        }

        if let Some(path) = self.summary_file.as_ref() {
            let handle = io::BufWriter::new(fs::File::create(path)?);
            serde_json::to_writer_pretty(handle, &summary)?;
            debug!("Wrote summary to {}", path.display());
        }

        let elapsed = start.elapsed();
        info!("Elapsed Time: {:0.3?}", processing_elapsed);
        if (elapsed.as_secs_f64() - processing_elapsed.as_secs_f64()) > 2.0 {
            info!("Total Elapsed Time: {:0.3?}", elapsed);
        }
        Ok(())
    }

    fn log_tally(&self, tally: &CleaningTally) {
        info!("Spectra read: {}", tally.spectra_seen);
        info!("Spectra accepted: {}", tally.spectra_accepted);
        info!("No peaks list: {}", tally.no_peaks_list);
        info!("No or bad precursor m/z: {}", tally.no_or_bad_precursor_mz);
        info!("No identity fields: {}", tally.no_identity_fields);
        info!("Minimum peaks not met: {}", tally.minimum_peaks_not_met);
        if tally.unparseable_peaks > 0 {
            warn!("Unparseable peaks: {}", tally.unparseable_peaks);
        }
    }
}
