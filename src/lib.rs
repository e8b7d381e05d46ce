//! Cognate Alignment Library
//!
//! Progressive multiple alignment of phonetic word forms within cognate
//! classes. Forms are merged pairwise along a guide tree; each merge aligns
//! the two profiles' representative rows with affine-gap Needleman-Wunsch and
//! projects the gaps onto every row.
//!
//! # Example
//!
//! ```
//! use cognate_align::prelude::*;
//!
//! let tree = GuideTree::from_newick("((kui,abui),klon);").unwrap();
//! let forms = vec![
//!     Form::from_tokens("kui", "eye", "m a t a"),
//!     Form::from_tokens("abui", "eye", "m a t"),
//!     Form::from_tokens("klon", "eye", "m a t a n"),
//! ];
//!
//! let alignment = align_group(&forms, &tree, &DefaultScores, &AlignParams::default()).unwrap();
//! assert_eq!(format_row(&alignment.rows[1].row), "m a t - -");
//! ```
//!
//! # Building a Guide Tree
//!
//! ```
//! use cognate_align::prelude::*;
//!
//! let codings = [
//!     ("kui", "eye", "eye-1"),
//!     ("abui", "eye", "eye-1"),
//!     ("klon", "eye", "eye-2"),
//! ];
//! let tree = language_distances(codings).to_tree().unwrap();
//! println!("{}", tree.to_newick());
//! ```

pub mod align;
pub mod batch;
pub mod distance;
pub mod merge;
pub mod models;
pub mod multi;
pub mod output;
pub mod scores;
pub mod tree;
pub mod wordlist;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::align::{align_pair, align_with_defaults, AlignedPair, PairAlignment};
    pub use crate::batch::{align_classes, build_report, summarize, ClassOutcome};
    pub use crate::distance::{jaccard_similarity, language_distances, LanguageDistances};
    pub use crate::merge::{merge_profiles, Profile, ProfileRow};
    pub use crate::models::{
        AlignMode, AlignParams, AlignReport, AlignSummary, AlignedForm, ClassAlignment,
        CognateClass, Form, FormKey, GroupAlignment, Segment, Symbol,
    };
    pub use crate::multi::{align_group, AlignError};
    pub use crate::output::{
        format_alignment, format_pair, format_row, print_summary, write_json, write_json_file,
        OutputError, GAP_MARKER,
    };
    pub use crate::scores::{DefaultScores, PairScores, ScoreEntry, ScoreTable, ScoreTableError};
    pub use crate::tree::{upgma, DistanceMatrix, GuideTree, NodeId, TreeBuilder, TreeError};
    pub use crate::wordlist::{ClassRecords, Wordlist, WordlistColumns, WordlistError};
}

// Re-export commonly used types at the crate root
pub use models::{AlignParams, Form, FormKey, GroupAlignment, Segment};
pub use multi::{align_group, AlignError};
pub use tree::GuideTree;
