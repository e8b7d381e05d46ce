//! Data structures for the cognate alignment pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An atomic phonetic unit (an IPA symbol, an ASJP class code, ...).
///
/// Segments are opaque: the aligner only ever compares them through a
/// [`ScoreTable`](crate::scores::ScoreTable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Segment {
    fn from(symbol: &str) -> Self {
        Self(symbol.to_string())
    }
}

impl From<String> for Segment {
    fn from(symbol: String) -> Self {
        Self(symbol)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something that can sit in one column of an alignment.
///
/// `None` means the gap symbol.
pub trait Symbol {
    fn symbol(&self) -> Option<&str>;
}

impl Symbol for str {
    fn symbol(&self) -> Option<&str> {
        Some(self)
    }
}

impl Symbol for String {
    fn symbol(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl Symbol for Segment {
    fn symbol(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl<T: Symbol> Symbol for Option<T> {
    fn symbol(&self) -> Option<&str> {
        self.as_ref().and_then(Symbol::symbol)
    }
}

impl<T: Symbol + ?Sized> Symbol for &T {
    fn symbol(&self) -> Option<&str> {
        (**self).symbol()
    }
}

/// Which word list entry a form came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormKey {
    pub language: String,
    pub concept: String,
}

impl FormKey {
    pub fn new(language: impl Into<String>, concept: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            concept: concept.into(),
        }
    }
}

impl fmt::Display for FormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.language, self.concept)
    }
}

/// A segmented word form. Never mutated by alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub key: FormKey,
    pub segments: Vec<Segment>,
}

impl Form {
    pub fn new(key: FormKey, segments: Vec<Segment>) -> Self {
        Self { key, segments }
    }

    /// Build a form from a space-separated token string, e.g. `"t a n a"`.
    pub fn from_tokens(language: &str, concept: &str, tokens: &str) -> Self {
        Self {
            key: FormKey::new(language, concept),
            segments: tokens.split_whitespace().map(Segment::from).collect(),
        }
    }

    pub fn language(&self) -> &str {
        &self.key.language
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A set of forms believed to share descent; the unit of multi-alignment work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognateClass {
    pub id: String,
    pub forms: Vec<Form>,
}

/// One form of a group alignment, padded with gaps (`None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedForm {
    pub key: FormKey,
    pub row: Vec<Option<Segment>>,
}

impl AlignedForm {
    /// The row with gaps removed.
    pub fn ungapped(&self) -> Vec<Segment> {
        self.row.iter().flatten().cloned().collect()
    }

    pub fn gap_count(&self) -> usize {
        self.row.iter().filter(|cell| cell.is_none()).count()
    }
}

/// A rectangular multiple alignment over the forms of one cognate class.
///
/// Rows are kept in the order the forms were submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAlignment {
    pub rows: Vec<AlignedForm>,
}

impl GroupAlignment {
    /// Number of columns (0 for an empty alignment).
    pub fn width(&self) -> usize {
        self.rows.first().map(|r| r.row.len()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The gapped row of the first form with this key.
    pub fn get(&self, key: &FormKey) -> Option<&[Option<Segment>]> {
        self.rows
            .iter()
            .find(|r| &r.key == key)
            .map(|r| r.row.as_slice())
    }

    pub fn is_rectangular(&self) -> bool {
        let width = self.width();
        self.rows.iter().all(|r| r.row.len() == width)
    }
}

/// Pairwise alignment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    /// Needleman-Wunsch: align both sequences end to end (default)
    #[default]
    Global,
    /// Smith-Waterman: best-scoring pair of subsequences
    Local,
}

/// Alignment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignParams {
    /// Penalty for opening a gap. `None` charges indels through the score
    /// table instead (element/gap entries, falling back to `gap_extend`).
    pub gap_open: Option<f64>,
    pub gap_extend: f64,
    pub mode: AlignMode,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            gap_open: Some(-2.5),
            gap_extend: -1.75,
            mode: AlignMode::Global,
        }
    }
}

impl AlignParams {
    /// Same penalties, forced to global mode. Profile merging always runs globally.
    pub fn global(&self) -> Self {
        Self {
            mode: AlignMode::Global,
            ..*self
        }
    }
}

/// Per-run summary of a batch alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignSummary {
    pub class_count: usize,
    pub aligned: usize,
    pub singletons: usize,
    pub failed: usize,
    pub form_count: usize,
}

/// Alignment outcome of one cognate class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAlignment {
    pub class_id: String,
    pub alignment: Option<GroupAlignment>,
    /// Failure message when the class could not be aligned.
    pub error: Option<String>,
}

/// Full batch result, as written to the JSON report.
#[derive(Debug, Serialize, Deserialize)]
pub struct AlignReport {
    pub version: String,
    pub parameters: AlignParams,
    pub summary: AlignSummary,
    pub classes: Vec<ClassAlignment>,
}
