//! Batch alignment of many cognate classes.
//!
//! Classes are independent: each one is aligned on its own against the
//! shared, read-only guide tree and score table, in parallel. A class that
//! fails is reported with its error and never affects the others.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::models::{
    AlignParams, AlignReport, AlignSummary, ClassAlignment, CognateClass, GroupAlignment,
};
use crate::multi::{align_group, AlignError};
use crate::scores::ScoreTable;
use crate::tree::GuideTree;

/// Outcome of aligning one class.
#[derive(Debug, Clone)]
pub struct ClassOutcome {
    pub class_id: String,
    pub form_count: usize,
    pub result: Result<GroupAlignment, AlignError>,
}

/// Align every class in parallel. Outcomes come back in input order.
pub fn align_classes<S>(
    classes: &[CognateClass],
    tree: &GuideTree,
    table: &S,
    params: &AlignParams,
    show_progress: bool,
) -> Vec<ClassOutcome>
where
    S: ScoreTable + Sync + ?Sized,
{
    let progress = if show_progress {
        let pb = ProgressBar::new(classes.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} classes ({per_sec})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let outcomes: Vec<ClassOutcome> = classes
        .par_iter()
        .map(|class| {
            let result = align_group(&class.forms, tree, table, params);
            if let Err(e) = &result {
                log::warn!("Cognate class {}: {}", class.id, e);
            }
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            ClassOutcome {
                class_id: class.id.clone(),
                form_count: class.forms.len(),
                result,
            }
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_with_message("Done");
    }

    let summary = summarize(&outcomes);
    log::info!(
        "Aligned {} of {} classes ({} singletons, {} failed)",
        summary.aligned,
        summary.class_count,
        summary.singletons,
        summary.failed
    );
    outcomes
}

/// Count aligned, singleton and failed classes.
pub fn summarize(outcomes: &[ClassOutcome]) -> AlignSummary {
    let mut summary = AlignSummary {
        class_count: outcomes.len(),
        ..Default::default()
    };
    for outcome in outcomes {
        summary.form_count += outcome.form_count;
        match &outcome.result {
            Ok(_) if outcome.form_count == 1 => {
                summary.aligned += 1;
                summary.singletons += 1;
            }
            Ok(_) => summary.aligned += 1,
            Err(_) => summary.failed += 1,
        }
    }
    summary
}

/// Serializable report of a batch run.
pub fn build_report(outcomes: &[ClassOutcome], params: &AlignParams) -> AlignReport {
    AlignReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        parameters: *params,
        summary: summarize(outcomes),
        classes: outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(alignment) => ClassAlignment {
                    class_id: outcome.class_id.clone(),
                    alignment: Some(alignment.clone()),
                    error: None,
                },
                Err(e) => ClassAlignment {
                    class_id: outcome.class_id.clone(),
                    alignment: None,
                    error: Some(e.to_string()),
                },
            })
            .collect(),
    }
}
