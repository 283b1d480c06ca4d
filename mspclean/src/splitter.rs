//! Partition serialized MSP blocks by ion polarity and chromatography method.
//!
//! The splitter works on the text written by [`crate::msp::write_record`], not on
//! [`Record`](crate::record::Record)s, so it can be run on any existing library file.
//! Blocks whose polarity cannot be determined are dropped.
use std::fmt::Display;
use std::sync::LazyLock;

use itertools::{Either, Itertools};
use regex::{Regex, RegexSet};

static POSITIVE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)CHARGE: [0-9]\n",
        r"(?i)PRECURSORTYPE: .*\+\n",
        r"(?i)IONMODE: p.*\n",
    ])
    .expect("valid positive polarity patterns")
});

static NEGATIVE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)CHARGE: -[0-9]\n",
        r"(?i)PRECURSORTYPE: .*-\n",
        r"(?i)IONMODE: n.*\n",
    ])
    .expect("valid negative polarity patterns")
});

/// `GC` or `EI` with no ASCII letter or digit on either side
static GAS_CHROMATOGRAPHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-zA-Z0-9])(?:GC|EI)(?:[^a-zA-Z0-9]|$)")
        .expect("valid chromatography pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Classify a serialized block. Positive patterns take precedence.
    pub fn classify(text: &str) -> Option<Self> {
        if POSITIVE_PATTERNS.is_match(text) {
            Some(Self::Positive)
        } else if NEGATIVE_PATTERNS.is_match(text) {
            Some(Self::Negative)
        } else {
            None
        }
    }
}

impl Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Positive => f.write_str("POS"),
            Polarity::Negative => f.write_str("NEG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromatographyMethod {
    LC,
    GC,
}

impl ChromatographyMethod {
    pub fn classify(text: &str) -> Self {
        if GAS_CHROMATOGRAPHY.is_match(text) {
            Self::GC
        } else {
            Self::LC
        }
    }
}

impl Display for ChromatographyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChromatographyMethod::LC => f.write_str("LC"),
            ChromatographyMethod::GC => f.write_str("GC"),
        }
    }
}

/// Split blocks into `(positive, negative)`, preserving input order within each
pub fn split_polarity<I, S>(texts: I) -> (Vec<S>, Vec<S>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for text in texts {
        match Polarity::classify(text.as_ref()) {
            Some(Polarity::Positive) => positive.push(text),
            Some(Polarity::Negative) => negative.push(text),
            None => {}
        }
    }
    (positive, negative)
}

/// Split blocks into `(lc, gc)`
pub fn split_chromatography_method<I, S>(texts: I) -> (Vec<S>, Vec<S>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .partition_map(|text| match ChromatographyMethod::classify(text.as_ref()) {
            ChromatographyMethod::LC => Either::Left(text),
            ChromatographyMethod::GC => Either::Right(text),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitCorpus<S> {
    pub pos_lc: Vec<S>,
    pub pos_gc: Vec<S>,
    pub neg_lc: Vec<S>,
    pub neg_gc: Vec<S>,
}

impl<S> Default for SplitCorpus<S> {
    fn default() -> Self {
        Self {
            pos_lc: Vec::new(),
            pos_gc: Vec::new(),
            neg_lc: Vec::new(),
            neg_gc: Vec::new(),
        }
    }
}

impl<S> SplitCorpus<S> {
    pub fn len(&self) -> usize {
        self.pos_lc.len() + self.pos_gc.len() + self.neg_lc.len() + self.neg_gc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The four buckets labeled by polarity and method, in a fixed order
    pub fn buckets(&self) -> [(Polarity, ChromatographyMethod, &[S]); 4] {
        [
            (Polarity::Positive, ChromatographyMethod::LC, self.pos_lc.as_slice()),
            (Polarity::Positive, ChromatographyMethod::GC, self.pos_gc.as_slice()),
            (Polarity::Negative, ChromatographyMethod::LC, self.neg_lc.as_slice()),
            (Polarity::Negative, ChromatographyMethod::GC, self.neg_gc.as_slice()),
        ]
    }
}

pub fn split_corpus<I, S>(texts: I) -> SplitCorpus<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (positive, negative) = split_polarity(texts);
    let (pos_lc, pos_gc) = split_chromatography_method(positive);
    let (neg_lc, neg_gc) = split_chromatography_method(negative);
    SplitCorpus {
        pos_lc,
        pos_gc,
        neg_lc,
        neg_gc,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_polarity() {
        assert_eq!(
            Polarity::classify("NAME: x\nCHARGE: 1\n"),
            Some(Polarity::Positive)
        );
        assert_eq!(
            Polarity::classify("NAME: x\nIONMODE: Negative\n"),
            Some(Polarity::Negative)
        );
        assert_eq!(
            Polarity::classify("NAME: x\nPRECURSORTYPE: [M-H]-\n"),
            Some(Polarity::Negative)
        );
        assert_eq!(
            Polarity::classify("NAME: x\nprecursortype: [M+H]+\n"),
            Some(Polarity::Positive)
        );
        assert_eq!(Polarity::classify("NAME: x\nIONMODE: unknown\n"), None);
        // The value must end its line
        assert_eq!(Polarity::classify("NAME: x\nCHARGE: 1"), None);
    }

    #[test]
    fn test_positive_takes_precedence() {
        let text = "IONMODE: negative\nCHARGE: 2\n";
        assert_eq!(Polarity::classify(text), Some(Polarity::Positive));
    }

    #[test]
    fn test_chromatography_method() {
        assert_eq!(
            ChromatographyMethod::classify("INSTRUMENTTYPE: GC-EI-TOF\n"),
            ChromatographyMethod::GC
        );
        assert_eq!(
            ChromatographyMethod::classify("COMMENT: ei\n"),
            ChromatographyMethod::GC
        );
        assert_eq!(
            ChromatographyMethod::classify("NAME: ORGANIC ACID\n"),
            ChromatographyMethod::LC
        );
        assert_eq!(
            ChromatographyMethod::classify("NAME: Protein\nINSTRUMENTTYPE: LC-ESI-QTOF\n"),
            ChromatographyMethod::LC
        );
        assert_eq!(ChromatographyMethod::classify("GC"), ChromatographyMethod::GC);
    }

    #[test]
    fn test_split_corpus() {
        let texts = vec![
            "NAME: a\nCHARGE: 1\n\n",
            "NAME: b\nIONMODE: Negative\n\n",
            "NAME: c\nIONMODE: unknown\n\n",
            "NAME: d\nIONMODE: positive\nINSTRUMENTTYPE: GC\n\n",
            "NAME: ORGANIC\nIONMODE: positive\n\n",
            "NAME: e\nIONMODE: negative\nCOMMENT: EI\n\n",
        ];
        let corpus = split_corpus(texts.clone());
        assert_eq!(corpus.pos_lc, vec![texts[0], texts[4]]);
        assert_eq!(corpus.pos_gc, vec![texts[3]]);
        assert_eq!(corpus.neg_lc, vec![texts[1]]);
        assert_eq!(corpus.neg_gc, vec![texts[5]]);
        assert_eq!(corpus.len(), 5);
        assert!(corpus.buckets().iter().all(|(_, _, b)| !b.contains(&texts[2])));
    }
}
