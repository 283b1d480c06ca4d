//! Reading and writing NIST-style MSP spectral library text.
//!
//! An MSP entry is a run of `Key: value` header lines, a `Num Peaks` line, and a
//! peak table, with entries separated by blank lines:
//!
//! ```text
//! NAME: Caffeine
//! PRECURSORMZ: 195.0877
//! IONMODE: Positive
//! Num Peaks: 2
//! 138.0662 100
//! 195.0877 42.5
//! ```
//!
//! Header keys are upper-cased and a few common spellings are folded onto the names in
//! [`crate::record`]. Peak values are kept as text, see [`RawPeak`].
use std::io::{self, prelude::*};

use thiserror::Error;
use tracing::{debug, trace};

use crate::record::{
    FieldValue, RawPeak, Record, ION_MODE, NUM_PEAKS, PEAKS_LIST, PRECURSOR_MZ, PRECURSOR_TYPE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MspParserState {
    Between,
    Headers,
    Peaks,
    Done,
    Error,
}

#[derive(Debug, Error)]
pub enum MspError {
    #[error("Encountered a malformed header line at line {0}: {1:?}")]
    MalformedHeaderLine(usize, String),
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

/// Map a header key onto its canonical spelling
pub fn canonical_key(key: &str) -> String {
    let key = key.trim().to_ascii_uppercase();
    match key.as_str() {
        "PRECURSOR_MZ" | "PRECURSOR MZ" | "PEPMASS" => PRECURSOR_MZ.to_string(),
        "PRECURSOR_TYPE" | "PRECURSOR TYPE" | "ADDUCT" => PRECURSOR_TYPE.to_string(),
        "ION_MODE" | "ION MODE" => ION_MODE.to_string(),
        "NUM_PEAKS" | "NUMPEAKS" => NUM_PEAKS.to_string(),
        _ => key,
    }
}

fn is_peak_line(line: &str) -> bool {
    line.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

/// A streaming MSP parser yielding one [`Record`] per entry.
///
/// A malformed entry produces an [`MspError`] and the reader resumes at the next
/// blank line, so iteration can continue past it.
pub struct MspReader<R: BufRead> {
    handle: R,
    pub state: MspParserState,
    line_number: usize,
    error: Option<MspError>,
    buffer: String,
}

impl<R: BufRead> MspReader<R> {
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            state: MspParserState::Between,
            line_number: 0,
            error: None,
            buffer: String::new(),
        }
    }

    /// The number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn set_error(&mut self, error: MspError) -> bool {
        self.state = MspParserState::Error;
        self.error = Some(error);
        false
    }

    fn handle_header(&mut self, line: &str, record: &mut Record) -> bool {
        let Some((key, value)) = line.split_once(':') else {
            return self.set_error(MspError::MalformedHeaderLine(
                self.line_number,
                line.to_string(),
            ));
        };
        let key = canonical_key(key);
        if key.is_empty() {
            return self.set_error(MspError::MalformedHeaderLine(
                self.line_number,
                line.to_string(),
            ));
        }
        let value = value.trim();
        if key == NUM_PEAKS {
            record.insert(NUM_PEAKS, value);
            record.insert(PEAKS_LIST, FieldValue::Peaks(Vec::new()));
            self.state = MspParserState::Peaks;
        } else {
            if let Some(prev) = record.insert(key.as_str(), value) {
                trace!("Replaced duplicate {key} value {prev:?} on line {}", self.line_number);
            }
            self.state = MspParserState::Headers;
        }
        true
    }

    fn handle_peak(&mut self, line: &str, record: &mut Record) -> bool {
        if !is_peak_line(line) {
            return self.handle_header(line, record);
        }
        let Some(value) = record.get_mut(PEAKS_LIST) else {
            return true;
        };
        let batch = RawPeak::split_line(line);
        match value {
            FieldValue::Peaks(peaks) => match batch {
                Some(mut batch) => peaks.append(&mut batch),
                None => {
                    // Keep the peak list as text so the cleaner rejects it as unparseable
                    debug!("Unsplittable peak line {}: {line:?}", self.line_number);
                    let mut table = String::new();
                    for peak in peaks.iter() {
                        table.push_str(&format!("{} {}\n", peak.mz, peak.intensity));
                    }
                    table.push_str(line);
                    *value = FieldValue::Text(table);
                }
            },
            FieldValue::Text(table) => {
                table.push('\n');
                table.push_str(line);
            }
        }
        true
    }

    fn read_line(&mut self) -> io::Result<usize> {
        self.buffer.clear();
        let b = self.handle.read_line(&mut self.buffer)?;
        if b > 0 {
            self.line_number += 1;
        }
        Ok(b)
    }

    /// Discard the rest of a malformed entry
    fn recover(&mut self) -> Result<(), MspError> {
        loop {
            if self.read_line()? == 0 {
                self.state = MspParserState::Done;
                return Ok(());
            }
            if self.buffer.trim().is_empty() {
                self.state = MspParserState::Between;
                return Ok(());
            }
        }
    }

    /// Read the next entry, returning `Ok(None)` at the end of the stream
    pub fn read_next(&mut self) -> Result<Option<Record>, MspError> {
        if self.state == MspParserState::Error {
            if let Err(e) = self.recover() {
                self.state = MspParserState::Done;
                return Err(e);
            }
        }

        let mut record = Record::new();
        loop {
            if self.state == MspParserState::Done {
                break;
            }
            let b = match self.read_line() {
                Ok(b) => b,
                Err(e) => {
                    self.state = MspParserState::Done;
                    return Err(e.into());
                }
            };
            if b == 0 {
                self.state = MspParserState::Done;
                break;
            }

            let line = std::mem::take(&mut self.buffer);
            let trimmed = line.trim();
            let work = match self.state {
                MspParserState::Between => {
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        true
                    } else {
                        self.handle_header(trimmed, &mut record)
                    }
                }
                MspParserState::Headers if trimmed.is_empty() => {
                    self.state = MspParserState::Between;
                    false
                }
                MspParserState::Headers => self.handle_header(trimmed, &mut record),
                MspParserState::Peaks if trimmed.is_empty() => {
                    self.state = MspParserState::Between;
                    false
                }
                MspParserState::Peaks => self.handle_peak(trimmed, &mut record),
                MspParserState::Done | MspParserState::Error => false,
            };
            self.buffer = line;

            if self.state == MspParserState::Error {
                if let Some(err) = self.error.take() {
                    debug!("Skipping malformed entry: {err}");
                    return Err(err);
                }
            }
            if !work {
                break;
            }
        }

        if record.is_empty() {
            Ok(None)
        } else {
            Ok(Some(record))
        }
    }
}

impl<R: BufRead> Iterator for MspReader<R> {
    type Item = Result<Record, MspError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// Write one entry followed by a blank line.
///
/// Fields are written in record order, except that `Num Peaks` and the peak
/// table always come last. The peak count written is the number of peak lines.
pub fn write_record<W: Write>(record: &Record, handle: &mut W) -> io::Result<()> {
    for (key, value) in record.iter() {
        if key == NUM_PEAKS || key == PEAKS_LIST {
            continue;
        }
        if let FieldValue::Text(text) = value {
            writeln!(handle, "{key}: {text}")?;
        }
    }

    match record.get(PEAKS_LIST) {
        Some(FieldValue::Text(table)) => {
            writeln!(handle, "{NUM_PEAKS}: {}", record.peak_count())?;
            for line in table.lines().map(str::trim).filter(|l| !l.is_empty()) {
                writeln!(handle, "{line}")?;
            }
        }
        Some(FieldValue::Peaks(peaks)) => {
            writeln!(handle, "{NUM_PEAKS}: {}", peaks.len())?;
            for peak in peaks {
                writeln!(handle, "{} {}", peak.mz, peak.intensity)?;
            }
        }
        None => {
            if let Some(n) = record.get_text(NUM_PEAKS) {
                writeln!(handle, "{NUM_PEAKS}: {n}")?;
            }
        }
    }
    writeln!(handle)
}

pub fn write_record_to_string(record: &Record) -> String {
    let mut buffer = Vec::new();
    // Writes into a Vec<u8> cannot fail
    let _ = write_record(record, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

impl Record {
    /// Render this record as an MSP entry, see [`write_record`]
    pub fn to_msp_string(&self) -> String {
        write_record_to_string(self)
    }
}

/// Writes MSP entries to a stream, counting them.
pub struct MspWriter<W: Write> {
    handle: io::BufWriter<W>,
    count: usize,
}

impl<W: Write> MspWriter<W> {
    pub fn new(handle: W) -> Self {
        Self {
            handle: io::BufWriter::new(handle),
            count: 0,
        }
    }

    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        write_record(record, &mut self.handle)?;
        self.count += 1;
        Ok(())
    }

    /// Write an entry that is already rendered as text
    pub fn write_block(&mut self, block: &str) -> io::Result<()> {
        self.handle.write_all(block.as_bytes())?;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.handle.into_inner().map_err(|e| e.into_error())
    }
}
