//! Segment similarity tables.
//!
//! A score table maps a pair of column cells (a segment or the gap, `None`)
//! to a similarity. Pairs the table does not know fall back to the default
//! policy: `MATCH_SCORE` for identical cells, `MISMATCH_SCORE` otherwise.
//! Tables are read-only once alignment starts and are shared across worker
//! threads by reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Default score for two identical cells.
pub const MATCH_SCORE: f64 = 1.0;
/// Default score for two different cells.
pub const MISMATCH_SCORE: f64 = -1.0;

#[derive(Error, Debug)]
pub enum ScoreTableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Score table entry pairs two gaps")]
    GapPair,
}

/// Similarity lookup over segment pairs.
pub trait ScoreTable {
    /// The table's own entry for `(a, b)`, if it has one.
    fn lookup(&self, a: Option<&str>, b: Option<&str>) -> Option<f64>;

    /// Score for `(a, b)` with the default policy applied.
    #[inline]
    fn score(&self, a: Option<&str>, b: Option<&str>) -> f64 {
        self.lookup(a, b)
            .unwrap_or(if a == b { MATCH_SCORE } else { MISMATCH_SCORE })
    }
}

impl<T: ScoreTable + ?Sized> ScoreTable for &T {
    #[inline]
    fn lookup(&self, a: Option<&str>, b: Option<&str>) -> Option<f64> {
        (**self).lookup(a, b)
    }
}

impl<T: ScoreTable + ?Sized> ScoreTable for Box<T> {
    #[inline]
    fn lookup(&self, a: Option<&str>, b: Option<&str>) -> Option<f64> {
        (**self).lookup(a, b)
    }
}

/// The empty table: +1 / -1 for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScores;

impl ScoreTable for DefaultScores {
    #[inline]
    fn lookup(&self, _a: Option<&str>, _b: Option<&str>) -> Option<f64> {
        None
    }
}

/// One serialized table entry. `null` stands for the gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub a: Option<String>,
    pub b: Option<String>,
    pub score: f64,
}

/// Hash-map score table keyed by ordered pairs.
///
/// A miss on `(a, b)` retries `(b, a)`, so a table is symmetric unless both
/// orders are stored with different scores.
#[derive(Debug, Clone, Default)]
pub struct PairScores {
    entries: HashMap<(Option<String>, Option<String>), f64>,
}

impl PairScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a score for the ordered pair `(a, b)`.
    pub fn insert(&mut self, a: Option<&str>, b: Option<&str>, score: f64) {
        self.entries
            .insert((a.map(str::to_string), b.map(str::to_string)), score);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, a: Option<&str>, b: Option<&str>, score: f64) -> Self {
        self.insert(a, b, score);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_entries(entries: Vec<ScoreEntry>) -> Result<Self, ScoreTableError> {
        let mut table = Self::new();
        for entry in entries {
            if entry.a.is_none() && entry.b.is_none() {
                return Err(ScoreTableError::GapPair);
            }
            table.entries.insert((entry.a, entry.b), entry.score);
        }
        Ok(table)
    }

    /// Read a JSON array of [`ScoreEntry`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScoreTableError> {
        let entries: Vec<ScoreEntry> = serde_json::from_reader(reader)?;
        Self::from_entries(entries)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ScoreTableError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(std::io::BufReader::new(file))?;
        log::debug!("Loaded {} score entries from {}", table.len(), path.display());
        Ok(table)
    }

    /// Entries sorted by key, for stable serialization.
    pub fn to_entries(&self) -> Vec<ScoreEntry> {
        let mut entries: Vec<ScoreEntry> = self
            .entries
            .iter()
            .map(|((a, b), &score)| ScoreEntry {
                a: a.clone(),
                b: b.clone(),
                score,
            })
            .collect();
        entries.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
        entries
    }

    fn get(&self, a: Option<&str>, b: Option<&str>) -> Option<f64> {
        // Owned key; tables are small and lookups happen once per DP cell.
        self.entries
            .get(&(a.map(str::to_string), b.map(str::to_string)))
            .copied()
    }
}

impl ScoreTable for PairScores {
    #[inline]
    fn lookup(&self, a: Option<&str>, b: Option<&str>) -> Option<f64> {
        self.get(a, b).or_else(|| self.get(b, a))
    }
}
