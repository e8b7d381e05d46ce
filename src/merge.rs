//! Merge two partial alignments (profiles) into one.
//!
//! Each profile is represented by its first row. The two representatives are
//! aligned globally and the resulting gap pattern is projected onto every row
//! of both profiles, so rows stay mutually aligned and never lose segments.

use crate::align::align_pair;
use crate::models::{AlignParams, Form, Segment};
use crate::multi::AlignError;
use crate::scores::ScoreTable;

/// One form inside a profile.
///
/// `cells[c]` is the index of the form segment in column `c`, or `None` for a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow<'a> {
    /// Position of the form in the submitted group.
    pub index: usize,
    pub form: &'a Form,
    pub cells: Vec<Option<usize>>,
}

impl<'a> ProfileRow<'a> {
    /// The row as gapped segments.
    pub fn gapped(&self) -> Vec<Option<&'a Segment>> {
        let form = self.form;
        self.cells
            .iter()
            .map(|cell| cell.map(|k| &form.segments[k]))
            .collect()
    }

    /// True when stripping gaps gives back the form, segment for segment.
    fn reconstructs_form(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .copied()
            .eq(0..self.form.segments.len())
    }
}

/// A partial alignment over a subset of a group's forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile<'a> {
    rows: Vec<ProfileRow<'a>>,
    width: usize,
}

impl<'a> Profile<'a> {
    /// A size-1 profile: the bare, ungapped form.
    pub fn from_form(index: usize, form: &'a Form) -> Self {
        Self {
            rows: vec![ProfileRow {
                index,
                form,
                cells: (0..form.segments.len()).map(Some).collect(),
            }],
            width: form.segments.len(),
        }
    }

    pub fn rows(&self) -> &[ProfileRow<'a>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ProfileRow<'a>> {
        self.rows
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row alignment is steered by: always the first row added.
    pub fn representative(&self) -> &ProfileRow<'a> {
        &self.rows[0]
    }

    /// Check rectangularity and the gap-stripping round trip for every row.
    pub fn check(&self) -> Result<(), AlignError> {
        for row in &self.rows {
            if row.cells.len() != self.width {
                return Err(AlignError::RaggedProfile {
                    expected: self.width,
                    actual: row.cells.len(),
                });
            }
            if !row.reconstructs_form() {
                return Err(AlignError::ProjectionMismatch {
                    form: row.form.key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Merge profile `b` into profile `a`.
///
/// Rows of `a` come first in the result, so `a`'s representative stays the
/// representative of the merged profile.
pub fn merge_profiles<'a, S>(
    a: Profile<'a>,
    b: Profile<'a>,
    table: &S,
    params: &AlignParams,
) -> Result<Profile<'a>, AlignError>
where
    S: ScoreTable + ?Sized,
{
    let rep_a = a.representative().gapped();
    let rep_b = b.representative().gapped();
    let alignment = align_pair(&rep_a, &rep_b, table, &params.global());

    let width = alignment.pairs.len();
    let mut rows = Vec::with_capacity(a.len() + b.len());

    for row in a.rows {
        let cells = alignment
            .pairs
            .iter()
            .map(|pair| pair.x.and_then(|c| row.cells[c]))
            .collect();
        rows.push(ProfileRow { cells, ..row });
    }
    for row in b.rows {
        let cells = alignment
            .pairs
            .iter()
            .map(|pair| pair.y.and_then(|c| row.cells[c]))
            .collect();
        rows.push(ProfileRow { cells, ..row });
    }

    let merged = Profile { rows, width };
    merged.check()?;

    log::debug!(
        "Merged profiles into {} rows x {} columns (score {})",
        merged.len(),
        width,
        alignment.score
    );
    Ok(merged)
}
