//! Integration tests for cognate-align.
//!
//! These tests run the word list -> guide tree -> class alignment pipeline
//! end to end and check the structural guarantees of its output.

use cognate_align::align::align_pair;
use cognate_align::batch::{align_classes, summarize};
use cognate_align::distance::language_distances;
use cognate_align::models::{AlignMode, AlignParams, CognateClass, Form, GroupAlignment, Segment};
use cognate_align::multi::{align_group, AlignError};
use cognate_align::output::format_row;
use cognate_align::scores::{DefaultScores, PairScores};
use cognate_align::tree::{upgma, DistanceMatrix, GuideTree};
use cognate_align::wordlist::{Wordlist, WordlistColumns};

const WORDLIST: &str = "Feature_ID\tLanguage_ID\tTokens\tCognate Set\n\
    eye\tkui\tm a t a\teye-1\n\
    eye\tabui\tm a t\teye-1\n\
    eye\tklon\tm a t a n\teye-1\n\
    fire\tkui\ta p i\tfire-1\n\
    fire\tabui\ta f i r\tfire-1\n\
    fire\tklon\tt o\tfire-2\n";

fn read_wordlist() -> Wordlist {
    Wordlist::read(WORDLIST.as_bytes(), &WordlistColumns::default()).unwrap()
}

fn rendered(alignment: &GroupAlignment) -> Vec<String> {
    alignment.rows.iter().map(|r| format_row(&r.row)).collect()
}

/// Every row is the same width, reproduces its form, and no column is all gaps.
fn assert_well_formed(alignment: &GroupAlignment, forms: &[Form]) {
    assert!(alignment.is_rectangular(), "Rows should share one width");
    assert_eq!(alignment.len(), forms.len());
    for (row, form) in alignment.rows.iter().zip(forms) {
        assert_eq!(row.key, form.key, "Rows should keep input order");
        assert_eq!(row.ungapped(), form.segments, "Row should reconstruct {}", form.key);
    }
    for column in 0..alignment.width() {
        assert!(
            alignment.rows.iter().any(|r| r.row[column].is_some()),
            "Column {} holds only gaps",
            column
        );
    }
}

#[test]
fn test_full_pipeline_with_upgma_tree() {
    let mut wordlist = read_wordlist();

    let tree = language_distances(wordlist.codings()).to_tree().unwrap();
    assert_eq!(tree.to_newick(), "((abui:0,kui:0):0.25,klon:0.25);");

    let classes = wordlist.cognate_classes(false);
    let forms: Vec<CognateClass> = classes.iter().map(|c| c.class.clone()).collect();
    let outcomes = align_classes(&forms, &tree, &DefaultScores, &AlignParams::default(), false);

    let summary = summarize(&outcomes);
    assert_eq!(summary.class_count, 3);
    assert_eq!(summary.aligned, 3);
    assert_eq!(summary.singletons, 1);
    assert_eq!(summary.failed, 0);

    for (class, outcome) in forms.iter().zip(&outcomes) {
        let alignment = outcome.result.as_ref().unwrap();
        assert_well_formed(alignment, &class.forms);
    }

    assert_eq!(wordlist.apply_alignments(&classes, &outcomes), 6);
    let mut out = Vec::new();
    wordlist.write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    // The written word list reads back with the alignment column filled
    let reread = Wordlist::read(text.as_bytes(), &WordlistColumns::default()).unwrap();
    assert_eq!(reread.len(), 6);
    assert_eq!(reread.header().last().map(String::as_str), Some("Alignment"));
    assert!(reread.cognate_classes(true).is_empty(), "All classes are aligned now");
}

#[test]
fn test_full_pipeline_with_given_tree() {
    let mut wordlist = read_wordlist();
    let tree = GuideTree::from_newick("((kui,abui),klon);").unwrap();

    let classes = wordlist.cognate_classes(false);
    let forms: Vec<CognateClass> = classes.iter().map(|c| c.class.clone()).collect();
    let outcomes = align_classes(&forms, &tree, &DefaultScores, &AlignParams::default(), false);

    assert_eq!(
        rendered(outcomes[0].result.as_ref().unwrap()),
        vec!["m a t a -", "m a t - -", "m a t a n"]
    );
    assert_eq!(
        rendered(outcomes[1].result.as_ref().unwrap()),
        vec!["a p i -", "a f i r"]
    );
    assert_eq!(rendered(outcomes[2].result.as_ref().unwrap()), vec!["t o"]);

    wordlist.apply_alignments(&classes, &outcomes);
    let mut out = Vec::new();
    wordlist.write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[2], "eye\tabui\tm a t\teye-1\tm a t - -");
    assert_eq!(lines[5], "fire\tabui\ta f i r\tfire-1\ta f i r");
    assert_eq!(lines[6], "fire\tklon\tt o\tfire-2\tt o");
}

#[test]
fn test_alignment_is_deterministic() {
    let tree = GuideTree::from_newick("((kui,abui),(blagar,(adang,klon)));").unwrap();
    let forms = vec![
        Form::from_tokens("adang", "water", "w a j a"),
        Form::from_tokens("kui", "water", "j a"),
        Form::from_tokens("klon", "water", "w e j"),
        Form::from_tokens("blagar", "water", "b a j a"),
        Form::from_tokens("abui", "water", "j a r"),
    ];
    let params = AlignParams::default();

    let first = align_group(&forms, &tree, &DefaultScores, &params).unwrap();
    let second = align_group(&forms, &tree, &DefaultScores, &params).unwrap();
    assert_eq!(first, second);
    assert_well_formed(&first, &forms);

    // The parallel batch gives the same answer as a lone call
    let classes: Vec<CognateClass> = (0..8)
        .map(|i| CognateClass {
            id: format!("water-{}", i),
            forms: forms.clone(),
        })
        .collect();
    let outcomes = align_classes(&classes, &tree, &DefaultScores, &params, false);
    for outcome in &outcomes {
        assert_eq!(outcome.result.as_ref().unwrap(), &first);
    }
}

#[test]
fn test_pairwise_projection_is_consistent() {
    let tree = GuideTree::from_newick("((kui,abui),klon);").unwrap();
    let forms = vec![
        Form::from_tokens("kui", "fire", "a p i"),
        Form::from_tokens("abui", "fire", "a f i r"),
        Form::from_tokens("klon", "fire", "h a p"),
    ];
    let alignment = align_group(&forms, &tree, &DefaultScores, &AlignParams::default()).unwrap();
    assert_well_formed(&alignment, &forms);

    // Any two rows, with their shared gap columns dropped, still spell out
    // both forms and never pair a gap with a gap
    for a in 0..alignment.len() {
        for b in (a + 1)..alignment.len() {
            let columns: Vec<(Option<&Segment>, Option<&Segment>)> = alignment.rows[a]
                .row
                .iter()
                .zip(&alignment.rows[b].row)
                .map(|(x, y)| (x.as_ref(), y.as_ref()))
                .filter(|(x, y)| x.is_some() || y.is_some())
                .collect();
            let left: Vec<Segment> = columns.iter().filter_map(|(x, _)| x.cloned()).collect();
            let right: Vec<Segment> = columns.iter().filter_map(|(_, y)| y.cloned()).collect();
            assert_eq!(left, forms[a].segments);
            assert_eq!(right, forms[b].segments);
        }
    }
}

#[test]
fn test_degenerate_classes() {
    let tree = GuideTree::from_newick("(kui,abui);").unwrap();
    let params = AlignParams::default();

    let empty = align_group(&[], &tree, &DefaultScores, &params).unwrap();
    assert!(empty.is_empty());

    // A lone form is returned as is, even without a leaf
    let single = vec![Form::from_tokens("tobelo", "moon", "o u l a")];
    let alignment = align_group(&single, &tree, &DefaultScores, &params).unwrap();
    assert_eq!(rendered(&alignment), vec!["o u l a"]);

    // Empty forms still line up with the rest
    let with_empty = vec![
        Form::from_tokens("kui", "moon", "w u l a"),
        Form::from_tokens("abui", "moon", ""),
    ];
    let alignment = align_group(&with_empty, &tree, &DefaultScores, &params).unwrap();
    assert_eq!(rendered(&alignment), vec!["w u l a", "- - - -"]);

    let unplaceable = vec![
        Form::from_tokens("kui", "moon", "w u l a"),
        Form::from_tokens("tobelo", "moon", "o u l a"),
    ];
    assert!(matches!(
        align_group(&unplaceable, &tree, &DefaultScores, &params),
        Err(AlignError::UnplaceableForm { .. })
    ));
}

#[test]
fn test_score_table_changes_alignment() {
    let x = ["p", "a"];
    let y = ["b", "a"];
    let params = AlignParams::default();

    let plain = align_pair(&x, &y, &DefaultScores, &params);
    assert_eq!(plain.score, 0.0);

    let table = PairScores::new().with(Some("p"), Some("b"), 0.5);
    let scored = align_pair(&x, &y, &table, &params);
    assert_eq!(scored.score, 1.5);
    assert_eq!(scored.gaps(), 0);

    let local = AlignParams {
        mode: AlignMode::Local,
        ..params
    };
    let result = align_pair(&["x", "x", "a", "n"], &["a", "n", "y"], &DefaultScores, &local);
    assert_eq!(result.score, 2.0);
    assert_eq!(result.len(), 2);
}

#[test]
fn test_upgma_groups_closest_languages() {
    let distances = DistanceMatrix::new(vec![
        vec![0.0, 0.75, 0.25, 1.0],
        vec![0.75, 0.0, 0.75, 0.5],
        vec![0.25, 0.75, 0.0, 1.0],
        vec![1.0, 0.5, 1.0, 0.0],
    ])
    .unwrap();
    let tree = upgma(&distances, &["kui", "klon", "abui", "tobelo"]).unwrap();

    assert_eq!(
        tree.to_newick(),
        "((kui:0.125,abui:0.125):0.4375,(klon:0.25,tobelo:0.25):0.4375);"
    );
    let mut labels = tree.leaf_labels();
    labels.sort();
    assert_eq!(labels, vec!["abui", "klon", "kui", "tobelo"]);
}
