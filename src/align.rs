//! Needleman-Wunsch / Smith-Waterman alignment with affine gaps.
//!
//! This is the HOT PATH: every profile merge funnels through `align_pair`.
//! A single score matrix plus a pointer matrix stands in for the three
//! affine states; a gap move extends when the neighbouring cell was reached
//! by the same move and opens otherwise.

use serde::{Deserialize, Serialize};

use crate::models::{AlignMode, AlignParams, Symbol};
use crate::scores::ScoreTable;

/// Which move produced a DP cell.
///
/// Declaration order is the tie-break priority: on equal scores the
/// diagonal wins over `Up`, and `Up` over `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Step {
    /// Pair `x[i-1]` with `y[j-1]`
    Diagonal,
    /// Pair `x[i-1]` with a gap
    Up,
    /// Pair a gap with `y[j-1]`
    Left,
}

/// One column of a pairwise alignment, as indices into the two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub x: Option<usize>,
    pub y: Option<usize>,
}

/// Result of a pairwise alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAlignment {
    pub score: f64,
    /// Columns in sequence order.
    pub pairs: Vec<AlignedPair>,
}

impl PairAlignment {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of columns with a gap on either side.
    pub fn gaps(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.x.is_none() || p.y.is_none())
            .count()
    }

    /// Resolve the index pairs against the aligned inputs.
    pub fn symbols<'a, T: Symbol>(
        &self,
        x: &'a [T],
        y: &'a [T],
    ) -> Vec<(Option<&'a str>, Option<&'a str>)> {
        self.pairs
            .iter()
            .map(|p| {
                (
                    p.x.and_then(|i| x[i].symbol()),
                    p.y.and_then(|j| y[j].symbol()),
                )
            })
            .collect()
    }
}

/// Align `x` against `y`.
///
/// Global mode runs end to end; local mode floors cells at zero, starts the
/// traceback at the first maximal cell in row-major order and stops at the
/// first zero cell. Empty inputs are fine: they produce an all-gap (or empty)
/// alignment.
pub fn align_pair<T, S>(x: &[T], y: &[T], table: &S, params: &AlignParams) -> PairAlignment
where
    T: Symbol,
    S: ScoreTable + ?Sized,
{
    let n = x.len();
    let m = y.len();
    let local = params.mode == AlignMode::Local;

    // Flat matrices: cell (i, j) lives at i * width + j
    let width = m + 1;
    let mut dp = vec![0.0f64; (n + 1) * width];
    let mut ptr = vec![Step::Diagonal; (n + 1) * width];

    let indel_x = |i: usize| -> f64 {
        table
            .lookup(x[i].symbol(), None)
            .unwrap_or(params.gap_extend)
    };
    let indel_y = |j: usize| -> f64 {
        table
            .lookup(None, y[j].symbol())
            .unwrap_or(params.gap_extend)
    };

    if !local {
        for i in 1..=n {
            let cost = match params.gap_open {
                None => indel_x(i - 1),
                Some(_) if i > 1 => params.gap_extend,
                Some(open) => open,
            };
            dp[i * width] = dp[(i - 1) * width] + cost;
            ptr[i * width] = Step::Up;
        }
        for j in 1..=m {
            let cost = match params.gap_open {
                None => indel_y(j - 1),
                Some(_) if j > 1 => params.gap_extend,
                Some(open) => open,
            };
            dp[j] = dp[j - 1] + cost;
            ptr[j] = Step::Left;
        }
    }

    for i in 1..=n {
        let row = i * width;
        let prev_row = (i - 1) * width;
        let sym_x = x[i - 1].symbol();

        for j in 1..=m {
            let sym_y = y[j - 1].symbol();

            let diagonal = dp[prev_row + j - 1] + table.score(sym_x, sym_y);
            let up = dp[prev_row + j]
                + match params.gap_open {
                    None => indel_x(i - 1),
                    Some(_) if ptr[prev_row + j] == Step::Up => params.gap_extend,
                    Some(open) => open,
                };
            let left = dp[row + j - 1]
                + match params.gap_open {
                    None => indel_y(j - 1),
                    Some(_) if ptr[row + j - 1] == Step::Left => params.gap_extend,
                    Some(open) => open,
                };

            // Strict comparisons keep the earlier move on ties
            let (mut best, step) = if up > diagonal && up >= left {
                (up, Step::Up)
            } else if left > diagonal && left > up {
                (left, Step::Left)
            } else {
                (diagonal, Step::Diagonal)
            };
            if local && best < 0.0 {
                best = 0.0;
            }

            dp[row + j] = best;
            ptr[row + j] = step;
        }
    }

    let (mut i, mut j) = if local {
        max_cell(&dp, width)
    } else {
        (n, m)
    };
    let score = dp[i * width + j];

    // Traceback runs end to start
    let mut pairs = Vec::with_capacity(n.max(m));
    while i > 0 || j > 0 {
        match ptr[i * width + j] {
            Step::Diagonal => {
                i -= 1;
                j -= 1;
                pairs.push(AlignedPair {
                    x: Some(i),
                    y: Some(j),
                });
            }
            Step::Up => {
                i -= 1;
                pairs.push(AlignedPair { x: Some(i), y: None });
            }
            Step::Left => {
                j -= 1;
                pairs.push(AlignedPair { x: None, y: Some(j) });
            }
        }
        if local && dp[i * width + j] == 0.0 {
            break;
        }
    }
    pairs.reverse();

    PairAlignment { score, pairs }
}

/// First maximal cell in row-major order.
#[inline]
fn max_cell(dp: &[f64], width: usize) -> (usize, usize) {
    let mut best = 0usize;
    for (idx, &value) in dp.iter().enumerate() {
        if value > dp[best] {
            best = idx;
        }
    }
    (best / width, best % width)
}

/// Align two sequences with the default +1/-1 policy and the given penalties.
pub fn align_with_defaults<T: Symbol>(x: &[T], y: &[T], params: &AlignParams) -> PairAlignment {
    align_pair(x, y, &crate::scores::DefaultScores, params)
}
