//! Progressive multiple alignment of one cognate class along a guide tree.

use thiserror::Error;

use crate::merge::{merge_profiles, Profile};
use crate::models::{AlignParams, AlignedForm, Form, FormKey, GroupAlignment};
use crate::scores::ScoreTable;
use crate::tree::GuideTree;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    #[error("Form {form} cannot be placed: the guide tree has no leaf for its language")]
    UnplaceableForm { form: FormKey },
    #[error("Ragged profile: row has {actual} columns, expected {expected}")]
    RaggedProfile { expected: usize, actual: usize },
    #[error("Profile row for {form} no longer reconstructs its form")]
    ProjectionMismatch { form: FormKey },
    #[error("Tree walk finished without placing {missing} of {total} forms")]
    IncompleteWalk { missing: usize, total: usize },
}

/// Align the forms of one cognate class along `tree`.
///
/// The tree is only read: profiles under construction live in a side table
/// indexed by node, so the same tree can serve many classes at once. Leaves
/// whose language has no form in this group are pruned; a language with
/// several forms contributes all of them at its leaf, merged in input order.
///
/// A single form aligns to itself without consulting the tree. A form whose
/// language has no leaf is an [`AlignError::UnplaceableForm`].
pub fn align_group<S>(
    forms: &[Form],
    tree: &GuideTree,
    table: &S,
    params: &AlignParams,
) -> Result<GroupAlignment, AlignError>
where
    S: ScoreTable + ?Sized,
{
    if forms.len() <= 1 {
        return Ok(identity_alignment(forms));
    }

    // Forms waiting at each leaf, in input order
    let mut at_leaf: Vec<Vec<usize>> = vec![Vec::new(); tree.len()];
    for (index, form) in forms.iter().enumerate() {
        let leaf = tree
            .find_leaf(form.language())
            .ok_or_else(|| AlignError::UnplaceableForm {
                form: form.key.clone(),
            })?;
        at_leaf[leaf.index()].push(index);
    }

    let mut profiles: Vec<Option<Profile>> = vec![None; tree.len()];
    for id in tree.post_order() {
        let node = tree.node(id);
        let parts: Vec<Profile> = if node.is_leaf() {
            at_leaf[id.index()]
                .iter()
                .map(|&index| Profile::from_form(index, &forms[index]))
                .collect()
        } else {
            node.children
                .iter()
                .filter_map(|child| profiles[child.index()].take())
                .collect()
        };
        profiles[id.index()] = fold_profiles(parts, table, params)?;
    }

    let root = profiles[tree.root().index()]
        .take()
        .ok_or(AlignError::IncompleteWalk {
            missing: forms.len(),
            total: forms.len(),
        })?;
    if root.len() != forms.len() {
        return Err(AlignError::IncompleteWalk {
            missing: forms.len() - root.len(),
            total: forms.len(),
        });
    }

    let mut rows: Vec<Option<AlignedForm>> = vec![None; forms.len()];
    for row in root.rows() {
        rows[row.index] = Some(AlignedForm {
            key: row.form.key.clone(),
            row: row.gapped().into_iter().map(|cell| cell.cloned()).collect(),
        });
    }

    Ok(GroupAlignment {
        rows: rows.into_iter().flatten().collect(),
    })
}

/// Fold profiles left to right. No profiles gives `None`; one passes through.
fn fold_profiles<'a, S>(
    parts: Vec<Profile<'a>>,
    table: &S,
    params: &AlignParams,
) -> Result<Option<Profile<'a>>, AlignError>
where
    S: ScoreTable + ?Sized,
{
    let mut parts = parts.into_iter();
    let Some(mut acc) = parts.next() else {
        return Ok(None);
    };
    for next in parts {
        acc = merge_profiles(acc, next, table, params)?;
    }
    Ok(Some(acc))
}

/// Every form ungapped, as its own row.
fn identity_alignment(forms: &[Form]) -> GroupAlignment {
    GroupAlignment {
        rows: forms
            .iter()
            .map(|form| AlignedForm {
                key: form.key.clone(),
                row: form.segments.iter().cloned().map(Some).collect(),
            })
            .collect(),
    }
}
