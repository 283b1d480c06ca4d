use std::io::{self, prelude::*};
use std::time::Instant;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use mspclean::{MspError, MspReader, Record};

use crate::progress::ReadProgress;

/// Parse entries from `reader` and send them downstream in chunks of `chunk_size`.
///
/// Malformed entries are logged and skipped. An IO error stops reading.
pub(crate) fn read_records<R: BufRead>(
    mut reader: MspReader<R>,
    sender: Sender<Vec<Record>>,
    chunk_size: usize,
) -> io::Result<ReadProgress> {
    let started = Instant::now();
    let mut progress = ReadProgress::default();
    let mut chunk = Vec::with_capacity(chunk_size);

    let send_chunk = |chunk: Vec<Record>, progress: &mut ReadProgress| {
        progress.chunks_sent += 1;
        if let Err(e) = sender.send(chunk) {
            warn!("Failed to send chunk: {e}");
        }
    };

    for result in reader.by_ref() {
        match result {
            Ok(record) => {
                progress.entries_read += 1;
                chunk.push(record);
                if chunk.len() >= chunk_size {
                    let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
                    send_chunk(full, &mut progress);
                }
            }
            Err(MspError::IOError(e)) => return Err(e),
            Err(e) => {
                progress.malformed_entries += 1;
                warn!("{e}");
            }
        }
    }
    if !chunk.is_empty() {
        send_chunk(chunk, &mut progress);
    }
    progress.lines_read = reader.line_number();

    info!(
        "Read {} entries ({} malformed) from {} lines in {:0.3?}",
        progress.entries_read,
        progress.malformed_entries,
        progress.lines_read,
        started.elapsed()
    );
    debug!("Sent {} chunks", progress.chunks_sent);
    Ok(progress)
}
