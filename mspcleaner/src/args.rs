use std::path::{Path, PathBuf};

use mspclean::{ChromatographyMethod, Polarity};

pub(crate) fn positive_usize(s: &str) -> Result<usize, String> {
    let value = s.parse::<usize>().map_err(|e| e.to_string())?;
    if value == 0 {
        Err(format!("`{s}` must be greater than zero"))
    } else {
        Ok(value)
    }
}

/// Derive the file name stem for outputs from the input path.
///
/// `.gz` is stripped first, then one more extension, so `lib.msp.gz` becomes `lib`.
/// STDIN is named `stdin`.
pub fn input_stem(input_file: &str) -> String {
    if input_file == "-" {
        return "stdin".to_string();
    }
    let path = Path::new(input_file);
    let path = if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
    {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "library".to_string())
}

/// The paths of every file a run may write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub cleaned: PathBuf,
    pub pos_lc: PathBuf,
    pub pos_gc: PathBuf,
    pub neg_lc: PathBuf,
    pub neg_gc: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, stem: &str, gzip: bool) -> Self {
        let ext = if gzip { "msp.gz" } else { "msp" };
        let make = |suffix: &str| output_dir.join(format!("{stem}_{suffix}.{ext}"));
        Self {
            cleaned: make("cleaned"),
            pos_lc: make("POS_LC"),
            pos_gc: make("POS_GC"),
            neg_lc: make("NEG_LC"),
            neg_gc: make("NEG_GC"),
        }
    }

    pub fn split_path(&self, polarity: Polarity, method: ChromatographyMethod) -> &Path {
        match (polarity, method) {
            (Polarity::Positive, ChromatographyMethod::LC) => &self.pos_lc,
            (Polarity::Positive, ChromatographyMethod::GC) => &self.pos_gc,
            (Polarity::Negative, ChromatographyMethod::LC) => &self.neg_lc,
            (Polarity::Negative, ChromatographyMethod::GC) => &self.neg_gc,
        }
    }
}
