use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;
use std::time::Instant;

use crossbeam_channel::Receiver;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info};

use mspclean::{MspWriter, Record, SplitCorpus};

use crate::args::OutputPaths;
use crate::progress::OutputSummary;

/// An output file, optionally gzip compressed
pub enum OutputHandle {
    Plain(io::BufWriter<fs::File>),
    Gzip(GzEncoder<io::BufWriter<fs::File>>),
}

impl OutputHandle {
    pub fn create(path: &Path, gzip: bool) -> io::Result<Self> {
        let handle = io::BufWriter::new(fs::File::create(path)?);
        if gzip {
            Ok(Self::Gzip(GzEncoder::new(handle, Compression::best())))
        } else {
            Ok(Self::Plain(handle))
        }
    }

    /// Flush everything, writing the gzip trailer if there is one
    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut handle) => handle.flush(),
            Self::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(handle) => handle.write(buf),
            Self::Gzip(handle) => handle.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(handle) => handle.flush(),
            Self::Gzip(handle) => handle.flush(),
        }
    }
}

fn close_writer(writer: MspWriter<OutputHandle>) -> io::Result<usize> {
    let count = writer.count();
    writer.into_inner()?.finish()?;
    Ok(count)
}

/// Write cleaned records as they arrive, keeping their rendered text if `keep_blocks`
/// is set so that the corpus can be split afterwards.
pub(crate) fn write_output(
    mut writer: MspWriter<OutputHandle>,
    receiver: Receiver<Vec<Record>>,
    keep_blocks: bool,
) -> io::Result<(usize, Vec<String>)> {
    let started = Instant::now();
    let mut blocks = Vec::new();
    let mut checkpoint = 0usize;
    while let Ok(chunk) = receiver.recv() {
        for record in chunk {
            let block = record.to_msp_string();
            writer.write_block(&block)?;
            if keep_blocks {
                blocks.push(block);
            }
        }
        if writer.count() - checkpoint >= 10_000 {
            checkpoint = writer.count();
            info!(
                "Wrote {checkpoint} spectra | {} chunks in the write queue",
                receiver.len()
            );
        }
    }
    let count = close_writer(writer)?;
    debug!("Writing finished in {:0.3?}", started.elapsed());
    Ok((count, blocks))
}

/// Write each bucket of a split corpus to its own file
pub(crate) fn write_split_outputs(
    corpus: &SplitCorpus<String>,
    paths: &OutputPaths,
    gzip: bool,
) -> io::Result<Vec<OutputSummary>> {
    let mut summaries = Vec::with_capacity(4);
    for (polarity, method, bucket) in corpus.buckets() {
        let path = paths.split_path(polarity, method);
        let mut writer = MspWriter::new(OutputHandle::create(path, gzip)?);
        for block in bucket {
            writer.write_block(block)?;
        }
        let spectra = close_writer(writer)?;
        info!("{polarity} {method}: {spectra} spectra -> {}", path.display());
        summaries.push(OutputSummary {
            label: format!("{polarity}_{method}"),
            path: path.to_path_buf(),
            spectra,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use mspclean::split_corpus;

    #[test]
    fn test_gzip_output() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.msp.gz");
        let mut writer = MspWriter::new(OutputHandle::create(&path, true)?);
        writer.write_block("NAME: a\n\n")?;
        assert_eq!(close_writer(writer)?, 1);

        let mut text = String::new();
        MultiGzDecoder::new(fs::File::open(&path)?).read_to_string(&mut text)?;
        assert_eq!(text, "NAME: a\n\n");
        Ok(())
    }

    #[test]
    fn test_write_split_outputs() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = OutputPaths::new(dir.path(), "lib", false);
        let corpus = split_corpus(vec![
            "NAME: a\nIONMODE: positive\n\n".to_string(),
            "NAME: b\nIONMODE: negative\nINSTRUMENTTYPE: GC-EI-TOF\n\n".to_string(),
        ]);
        let summaries = write_split_outputs(&corpus, &paths, false)?;
        let counts: Vec<_> = summaries.iter().map(|s| s.spectra).collect();
        assert_eq!(counts, vec![1, 0, 0, 1]);
        assert_eq!(
            fs::read_to_string(&paths.neg_gc)?,
            "NAME: b\nIONMODE: negative\nINSTRUMENTTYPE: GC-EI-TOF\n\n"
        );
        assert_eq!(fs::read_to_string(&paths.pos_gc)?, "");
        Ok(())
    }
}
