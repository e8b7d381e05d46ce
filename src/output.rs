//! Output formatting for alignment results (JSON report, text views).

use crate::align::PairAlignment;
use crate::models::{AlignReport, AlignSummary, GroupAlignment, Segment, Symbol};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Gap marker in serialized rows.
pub const GAP_MARKER: &str = "-";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the batch report as JSON.
pub fn write_json<W: Write>(report: &AlignReport, writer: &mut W) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(report)?;
    writer.write_all(json.as_bytes())?;
    Ok(())
}

/// Write the batch report as JSON to a file.
pub fn write_json_file(report: &AlignReport, path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_json(report, &mut file)
}

/// Space-joined segments with `-` for gaps, e.g. `m a t -`.
pub fn format_row(row: &[Option<Segment>]) -> String {
    row.iter()
        .map(|cell| cell.as_ref().map(Segment::as_str).unwrap_or(GAP_MARKER))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per form: `language  concept  row`, columns padded to line up.
pub fn format_alignment(alignment: &GroupAlignment) -> String {
    let key_width = alignment
        .rows
        .iter()
        .map(|r| r.key.language.chars().count() + r.key.concept.chars().count() + 1)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for row in &alignment.rows {
        let key = format!("{}/{}", row.key.language, row.key.concept);
        let pad = key_width.saturating_sub(key.chars().count());
        out.push_str(&key);
        out.push_str(&" ".repeat(pad + 2));
        out.push_str(&format_row(&row.row));
        out.push('\n');
    }
    out
}

/// Two aligned lines for a pairwise result, cells padded to equal width.
pub fn format_pair<T: Symbol>(x: &[T], y: &[T], alignment: &PairAlignment) -> String {
    let mut top = Vec::with_capacity(alignment.len());
    let mut bottom = Vec::with_capacity(alignment.len());
    for (a, b) in alignment.symbols(x, y) {
        let a = a.unwrap_or(GAP_MARKER);
        let b = b.unwrap_or(GAP_MARKER);
        let width = a.chars().count().max(b.chars().count());
        top.push(format!("{:<width$}", a, width = width));
        bottom.push(format!("{:<width$}", b, width = width));
    }
    format!(
        "score: {}\n{}\n{}\n",
        alignment.score,
        top.join(" ").trim_end(),
        bottom.join(" ").trim_end()
    )
}

/// Write a summary report to stdout.
pub fn print_summary(summary: &AlignSummary) {
    println!("\n=== Alignment Summary ===");
    println!("Cognate classes: {}", summary.class_count);
    println!("Forms: {}", summary.form_count);
    println!("Aligned: {}", summary.aligned);
    println!("  Singletons: {}", summary.singletons);
    println!("Failed: {}", summary.failed);
}
