//! Cognate Alignment Pipeline
//!
//! Aligns the forms of every cognate class in a tab-separated word list
//! along a guide tree and writes the alignments back into the word list.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use cognate_align::prelude::*;

#[derive(Parser)]
#[command(name = "cognate-align")]
#[command(about = "Progressive phonetic alignment of cognate classes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Word list column names
#[derive(Args, Clone, Debug)]
struct ColumnArgs {
    /// Language identifier column
    #[arg(long, default_value = "Language_ID")]
    language_column: String,

    /// Concept column
    #[arg(long, default_value = "Feature_ID")]
    concept_column: String,

    /// Column with space-separated segments
    #[arg(long, default_value = "Tokens")]
    tokens_column: String,

    /// Column containing the cognate classes
    #[arg(long, default_value = "Cognate Set")]
    cognate_column: String,

    /// Column the alignments are written to (added if missing)
    #[arg(long, default_value = "Alignment")]
    alignment_column: String,
}

impl From<ColumnArgs> for WordlistColumns {
    fn from(args: ColumnArgs) -> Self {
        WordlistColumns {
            language: args.language_column,
            concept: args.concept_column,
            tokens: args.tokens_column,
            cognate: args.cognate_column,
            alignment: args.alignment_column,
        }
    }
}

/// Scoring options shared by the aligning commands
#[derive(Args, Clone, Debug)]
struct ScoringArgs {
    /// JSON score table: [{"a": "p", "b": "b", "score": 0.5}, ...]
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Gap opening penalty [default: -2.5]
    #[arg(long, allow_negative_numbers = true)]
    gap_open: Option<f64>,

    /// Gap extension penalty [default: -1.75]
    #[arg(long, allow_negative_numbers = true)]
    gap_extend: Option<f64>,

    /// Charge indels through the score table's segment/gap entries instead of a gap opening penalty
    #[arg(long, conflicts_with = "gap_open")]
    table_indels: bool,
}

impl ScoringArgs {
    /// Overlay user-specified values onto the library defaults.
    fn params(&self, mode: AlignMode) -> AlignParams {
        let defaults = AlignParams::default();
        AlignParams {
            gap_open: if self.table_indels {
                None
            } else {
                self.gap_open.or(defaults.gap_open)
            },
            gap_extend: self.gap_extend.unwrap_or(defaults.gap_extend),
            mode,
        }
    }

    fn table(&self) -> Result<Box<dyn ScoreTable + Sync>, ScoreTableError> {
        match &self.scores {
            Some(path) => Ok(Box::new(PairScores::from_json_file(path)?)),
            None => Ok(Box::new(DefaultScores)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Align all cognate classes of a word list
    Align {
        /// Input word list (tab-separated, with header)
        #[arg(long)]
        input: PathBuf,

        /// Output word list
        #[arg(long)]
        output: PathBuf,

        /// Newick guide tree; without one, a UPGMA tree is built from shared cognate classes
        #[arg(long)]
        guide_tree: Option<PathBuf>,

        /// Write the guide tree that was used (Newick)
        #[arg(long)]
        tree_output: Option<PathBuf>,

        /// Only align classes whose existing alignments differ in length
        #[arg(long)]
        only_necessary: bool,

        /// Also write a JSON report
        #[arg(long)]
        json: Option<PathBuf>,

        /// Print the first N class alignments to the console
        #[arg(long)]
        show: Option<usize>,

        #[command(flatten)]
        columns: ColumnArgs,

        #[command(flatten)]
        scoring: ScoringArgs,

        /// Suppress progress output
        #[arg(long)]
        quiet: bool,
    },

    /// Build the UPGMA guide tree for a word list
    Tree {
        /// Input word list (tab-separated, with header)
        #[arg(long)]
        input: PathBuf,

        /// Write the tree here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        columns: ColumnArgs,
    },

    /// Align two forms and print the result
    ///
    /// Forms are space-separated segments; a form without spaces is split into characters.
    Pair {
        first: String,
        second: String,

        /// Local (Smith-Waterman) instead of global alignment
        #[arg(long)]
        local: bool,

        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Commands::Align { quiet: true, .. });
    env_logger::Builder::from_default_env()
        .filter_level(if quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    match cli.command {
        Commands::Align {
            input,
            output,
            guide_tree,
            tree_output,
            only_necessary,
            json,
            show,
            columns,
            scoring,
            quiet,
        } => {
            let columns = WordlistColumns::from(columns);
            let params = scoring.params(AlignMode::Global);
            let table = scoring.table()?;

            let mut wordlist = Wordlist::from_path(&input, &columns)?;
            let tree = match guide_tree {
                Some(path) => load_tree(&path)?,
                None => {
                    log::info!("No guide tree given, building UPGMA tree from cognate classes");
                    language_distances(wordlist.codings()).to_tree()?
                }
            };
            if let Some(path) = tree_output {
                std::fs::write(&path, tree.to_newick() + "\n")?;
                log::info!("Guide tree: {}", path.display());
            }

            let classes = wordlist.cognate_classes(only_necessary);
            let forms: Vec<CognateClass> = classes.iter().map(|c| c.class.clone()).collect();
            log::info!("Aligning {} cognate classes", forms.len());

            let outcomes = align_classes(&forms, &tree, table.as_ref(), &params, !quiet);
            let updated = wordlist.apply_alignments(&classes, &outcomes);
            wordlist.write_file(&output)?;
            log::info!("Updated {} records, output: {}", updated, output.display());

            if let Some(path) = json {
                write_json_file(&build_report(&outcomes, &params), &path)?;
                log::info!("JSON report: {}", path.display());
            }

            if !quiet {
                print_summary(&summarize(&outcomes));
            }

            if let Some(limit) = show {
                println!("\n=== Sample Alignments ===");
                for outcome in outcomes.iter().take(limit) {
                    println!("\n[{}]", outcome.class_id);
                    match &outcome.result {
                        Ok(alignment) => print!("{}", format_alignment(alignment)),
                        Err(e) => println!("error: {}", e),
                    }
                }
            }
        }

        Commands::Tree {
            input,
            output,
            columns,
        } => {
            let wordlist = Wordlist::from_path(&input, &WordlistColumns::from(columns))?;
            let distances = language_distances(wordlist.codings());
            let newick = distances.to_tree()?.to_newick();
            match output {
                Some(path) => {
                    std::fs::write(&path, newick + "\n")?;
                    log::info!(
                        "Tree over {} languages: {}",
                        distances.languages.len(),
                        path.display()
                    );
                }
                None => println!("{}", newick),
            }
        }

        Commands::Pair {
            first,
            second,
            local,
            scoring,
        } => {
            let mode = if local {
                AlignMode::Local
            } else {
                AlignMode::Global
            };
            let params = scoring.params(mode);
            let table = scoring.table()?;

            let x = split_form(&first);
            let y = split_form(&second);
            let result = align_pair(&x, &y, table.as_ref(), &params);
            print!("{}", format_pair(&x, &y, &result));
        }
    }

    Ok(())
}

fn load_tree(path: &Path) -> Result<GuideTree, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let tree = GuideTree::from_newick(&text)?;
    log::info!(
        "Loaded guide tree with {} leaves from {}",
        tree.leaf_labels().len(),
        path.display()
    );
    Ok(tree)
}

fn split_form(form: &str) -> Vec<String> {
    if form.split_whitespace().count() > 1 {
        form.split_whitespace().map(str::to_string).collect()
    } else {
        form.trim().chars().map(|c| c.to_string()).collect()
    }
}
