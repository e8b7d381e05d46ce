//! Tab-separated word lists: the pipeline's input and output.
//!
//! A word list has a header row and one form per line. Forms are grouped into
//! cognate classes by the cognate column; aligned rows are written back into
//! the alignment column as space-separated segments with `-` for gaps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;
use thiserror::Error;

use crate::batch::ClassOutcome;
use crate::models::{CognateClass, Form, FormKey, Segment};
use crate::output::format_row;

#[derive(Error, Debug)]
pub enum WordlistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Word list has no header row")]
    MissingHeader,
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("Line {line}: expected {expected} fields, found {actual}")]
    RaggedRecord {
        line: usize,
        expected: usize,
        actual: usize,
    },
}

/// Names of the columns the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordlistColumns {
    pub language: String,
    pub concept: String,
    pub tokens: String,
    pub cognate: String,
    pub alignment: String,
}

impl Default for WordlistColumns {
    fn default() -> Self {
        Self {
            language: "Language_ID".to_string(),
            concept: "Feature_ID".to_string(),
            tokens: "Tokens".to_string(),
            cognate: "Cognate Set".to_string(),
            alignment: "Alignment".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    language: usize,
    concept: usize,
    tokens: usize,
    cognate: usize,
    alignment: Option<usize>,
}

/// A cognate class together with the word-list records its forms came from.
#[derive(Debug, Clone)]
pub struct ClassRecords {
    pub class: CognateClass,
    /// `records[i]` is the record of `class.forms[i]`.
    pub records: Vec<usize>,
}

/// An in-memory word list.
#[derive(Debug, Clone)]
pub struct Wordlist {
    header: Vec<String>,
    records: Vec<Vec<String>>,
    columns: WordlistColumns,
    index: ColumnIndex,
}

impl Wordlist {
    pub fn read<R: BufRead>(reader: R, columns: &WordlistColumns) -> Result<Self, WordlistError> {
        let mut lines = reader.lines().enumerate();

        let header: Vec<String> = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break split_fields(&line);
                    }
                }
                None => return Err(WordlistError::MissingHeader),
            }
        };

        let find = |name: &str| -> Result<usize, WordlistError> {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| WordlistError::MissingColumn(name.to_string()))
        };
        let index = ColumnIndex {
            language: find(&columns.language)?,
            concept: find(&columns.concept)?,
            tokens: find(&columns.tokens)?,
            cognate: find(&columns.cognate)?,
            alignment: header.iter().position(|h| h == &columns.alignment),
        };

        let mut records = Vec::new();
        for (number, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = split_fields(&line);
            if fields.len() > header.len() {
                return Err(WordlistError::RaggedRecord {
                    line: number + 1,
                    expected: header.len(),
                    actual: fields.len(),
                });
            }
            // Trailing empty cells are often dropped by editors
            fields.resize(header.len(), String::new());
            records.push(fields);
        }

        log::info!("Read {} word list records", records.len());
        Ok(Self {
            header,
            records,
            columns: columns.clone(),
            index,
        })
    }

    pub fn from_path(path: &Path, columns: &WordlistColumns) -> Result<Self, WordlistError> {
        let file = std::fs::File::open(path)?;
        Self::read(std::io::BufReader::new(file), columns)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// The form of one record.
    pub fn form(&self, record: usize) -> Form {
        let fields = &self.records[record];
        Form::new(
            FormKey::new(
                fields[self.index.language].clone(),
                fields[self.index.concept].clone(),
            ),
            fields[self.index.tokens]
                .split_whitespace()
                .map(Segment::from)
                .collect(),
        )
    }

    /// `(language, concept, cognate class)` for every record.
    pub fn codings(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.records.iter().map(move |fields| {
            (
                fields[self.index.language].as_str(),
                fields[self.index.concept].as_str(),
                fields[self.index.cognate].trim(),
            )
        })
    }

    /// Group records into cognate classes, sorted by class id.
    ///
    /// Records without a cognate class are left out. With `only_necessary`,
    /// classes whose existing alignments all have the same number of
    /// segments are skipped as already aligned.
    pub fn cognate_classes(&self, only_necessary: bool) -> Vec<ClassRecords> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (record, fields) in self.records.iter().enumerate() {
            let class = fields[self.index.cognate].trim();
            if !class.is_empty() {
                groups.entry(class).or_default().push(record);
            }
        }

        groups
            .into_iter()
            .filter(|(_, records)| !(only_necessary && self.already_aligned(records)))
            .map(|(id, records)| ClassRecords {
                class: CognateClass {
                    id: id.to_string(),
                    forms: records.iter().map(|&r| self.form(r)).collect(),
                },
                records,
            })
            .collect()
    }

    fn already_aligned(&self, records: &[usize]) -> bool {
        let Some(column) = self.index.alignment else {
            return false;
        };
        let mut lengths = records.iter().map(|&r| {
            let value = &self.records[r][column];
            (!value.trim().is_empty()).then(|| value.split_whitespace().count())
        });
        match lengths.next() {
            Some(Some(first)) => lengths.all(|len| len == Some(first)),
            _ => false,
        }
    }

    /// Write successful alignments into the alignment column, adding the
    /// column if needed. Returns the number of records updated.
    pub fn apply_alignments(&mut self, classes: &[ClassRecords], outcomes: &[ClassOutcome]) -> usize {
        let column = match self.index.alignment {
            Some(column) => column,
            None => {
                self.header.push(self.columns.alignment.clone());
                for fields in &mut self.records {
                    fields.push(String::new());
                }
                let column = self.header.len() - 1;
                self.index.alignment = Some(column);
                column
            }
        };

        let mut updated = 0;
        for (class, outcome) in classes.iter().zip(outcomes) {
            let Ok(alignment) = &outcome.result else {
                continue;
            };
            for (row, &record) in alignment.rows.iter().zip(&class.records) {
                self.records[record][column] = format_row(&row.row);
                updated += 1;
            }
        }
        updated
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), WordlistError> {
        writeln!(writer, "{}", self.header.join("\t"))?;
        for fields in &self.records {
            writeln!(writer, "{}", fields.join("\t"))?;
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<(), WordlistError> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write(&mut file)?;
        file.flush()?;
        Ok(())
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split('\t')
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::align_classes;
    use crate::models::AlignParams;
    use crate::scores::DefaultScores;
    use crate::tree::GuideTree;

    const WORDLIST: &str = "Feature_ID\tLanguage_ID\tTokens\tCognate Set\n\
        eye\tkui\tm a t a\teye-1\n\
        eye\tabui\tm a t\teye-1\n\
        fire\tkui\ta p i\tfire-1\n\
        fire\tabui\tt o\t\n";

    fn read() -> Wordlist {
        Wordlist::read(WORDLIST.as_bytes(), &WordlistColumns::default()).unwrap()
    }

    #[test]
    fn test_read_and_group() {
        let wordlist = read();
        assert_eq!(wordlist.len(), 4);

        let classes = wordlist.cognate_classes(false);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].class.id, "eye-1");
        assert_eq!(classes[0].records, vec![0, 1]);
        assert_eq!(classes[0].class.forms[1].key, FormKey::new("abui", "eye"));
        assert_eq!(classes[1].class.forms[0].segments.len(), 3);
    }

    #[test]
    fn test_missing_column() {
        let err = Wordlist::read("Language_ID\tTokens\n".as_bytes(), &WordlistColumns::default())
            .unwrap_err();
        assert!(matches!(err, WordlistError::MissingColumn(name) if name == "Feature_ID"));
    }

    #[test]
    fn test_ragged_record() {
        let text = "Feature_ID\tLanguage_ID\tTokens\tCognate Set\neye\tkui\tm a\tx\textra\n";
        let err = Wordlist::read(text.as_bytes(), &WordlistColumns::default()).unwrap_err();
        assert!(matches!(err, WordlistError::RaggedRecord { line: 2, .. }));
    }

    #[test]
    fn test_codings() {
        let wordlist = read();
        let codings: Vec<_> = wordlist.codings().collect();
        assert_eq!(codings[3], ("abui", "fire", ""));
    }

    #[test]
    fn test_apply_and_write() {
        let mut wordlist = read();
        let classes = wordlist.cognate_classes(false);
        let tree = GuideTree::from_newick("(kui,abui);").unwrap();
        let forms: Vec<CognateClass> = classes.iter().map(|c| c.class.clone()).collect();
        let outcomes = align_classes(&forms, &tree, &DefaultScores, &AlignParams::default(), false);

        assert_eq!(wordlist.apply_alignments(&classes, &outcomes), 3);

        let mut out = Vec::new();
        wordlist.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Feature_ID\tLanguage_ID\tTokens\tCognate Set\tAlignment");
        assert_eq!(lines[1], "eye\tkui\tm a t a\teye-1\tm a t a");
        assert_eq!(lines[2], "eye\tabui\tm a t\teye-1\tm a t -");
        assert_eq!(lines[4], "fire\tabui\tt o\t\t");
    }

    #[test]
    fn test_only_necessary() {
        let text = "Feature_ID\tLanguage_ID\tTokens\tCognate Set\tAlignment\n\
            eye\tkui\tm a t a\teye-1\tm a t a\n\
            eye\tabui\tm a t\teye-1\tm a t -\n\
            fire\tkui\ta p i\tfire-1\ta p i\n\
            fire\tabui\ta p\tfire-1\ta p\n";
        let wordlist = Wordlist::read(text.as_bytes(), &WordlistColumns::default()).unwrap();

        assert_eq!(wordlist.cognate_classes(false).len(), 2);
        let necessary = wordlist.cognate_classes(true);
        assert_eq!(necessary.len(), 1);
        assert_eq!(necessary[0].class.id, "fire-1");
    }
}
