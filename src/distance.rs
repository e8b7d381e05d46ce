//! Language distances from shared cognate classes.
//!
//! For two languages, every concept attested in either contributes the
//! Jaccard overlap of their cognate-class sets for that concept; the distance
//! is one minus the mean overlap. These distances feed the UPGMA guide tree
//! when no tree is supplied.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::tree::{upgma, DistanceMatrix, GuideTree, TreeError};

/// Languages (sorted) with their pairwise distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDistances {
    pub languages: Vec<String>,
    pub matrix: DistanceMatrix,
}

impl LanguageDistances {
    /// Cluster the languages into a UPGMA guide tree.
    pub fn to_tree(&self) -> Result<GuideTree, TreeError> {
        upgma(&self.matrix, &self.languages)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.languages.binary_search_by(|l| l.as_str().cmp(a)).ok()?;
        let j = self.languages.binary_search_by(|l| l.as_str().cmp(b)).ok()?;
        Some(self.matrix.get(i, j))
    }
}

/// Jaccard similarity of two class sets. Two empty sets count as identical.
pub fn jaccard_similarity(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

type ConceptClasses<'a> = BTreeMap<&'a str, BTreeSet<&'a str>>;

/// Distances from `(language, concept, cognate class)` codings.
///
/// An empty class string attests the concept without a class. Concepts where
/// neither language has any class are skipped; a pair of languages with no
/// countable concept is at distance 1.
pub fn language_distances<'a, I>(codings: I) -> LanguageDistances
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let mut by_language: BTreeMap<&str, ConceptClasses> = BTreeMap::new();
    for (language, concept, class) in codings {
        let classes = by_language
            .entry(language)
            .or_default()
            .entry(concept)
            .or_default();
        if !class.is_empty() {
            classes.insert(class);
        }
    }

    let languages: Vec<&str> = by_language.keys().copied().collect();
    let tables: Vec<&ConceptClasses> = by_language.values().collect();
    let n = languages.len();

    let distances: Vec<(usize, usize, f64)> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let tables = &tables;
            ((i + 1)..n).map(move |j| (i, j, pair_distance(tables[i], tables[j])))
        })
        .collect();

    let mut matrix = DistanceMatrix::zeros(n);
    for (i, j, d) in distances {
        matrix.set(i, j, d);
    }
    log::debug!("Computed distances between {} languages", n);

    LanguageDistances {
        languages: languages.into_iter().map(str::to_string).collect(),
        matrix,
    }
}

fn pair_distance(a: &ConceptClasses, b: &ConceptClasses) -> f64 {
    let empty = BTreeSet::new();
    let concepts: BTreeSet<&str> = a.keys().chain(b.keys()).copied().collect();

    let mut shared = 0.0;
    let mut counted = 0usize;
    for concept in concepts {
        let ca = a.get(concept).unwrap_or(&empty);
        let cb = b.get(concept).unwrap_or(&empty);
        if ca.is_empty() && cb.is_empty() {
            continue;
        }
        shared += jaccard_similarity(ca, cb);
        counted += 1;
    }

    if counted == 0 {
        1.0
    } else {
        1.0 - shared / counted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set<'a>(items: &[&'a str]) -> BTreeSet<&'a str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard_similarity(&set(&["1", "2"]), &set(&["2", "3"])), 1.0 / 3.0);
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 1.0);
        assert_eq!(jaccard_similarity(&set(&["1"]), &set(&[])), 0.0);
    }

    #[test]
    fn test_language_distances() {
        let codings = [
            ("kui", "eye", "eye-1"),
            ("kui", "fire", "fire-1"),
            ("abui", "eye", "eye-1"),
            ("abui", "fire", "fire-2"),
            ("klon", "eye", "eye-2"),
        ];
        let distances = language_distances(codings);

        assert_eq!(distances.languages, vec!["abui", "klon", "kui"]);
        // eye shared, fire differs: 1 - (1 + 0) / 2
        assert_eq!(distances.get("kui", "abui"), Some(0.5));
        // klon has no fire: eye 0, fire 0
        assert_eq!(distances.get("klon", "kui"), Some(1.0));
        assert_eq!(distances.get("kui", "kui"), Some(0.0));
        assert_eq!(distances.get("kui", "tobelo"), None);
    }

    #[test]
    fn test_partial_overlap_within_concept() {
        let codings = [
            ("a", "water", "w1"),
            ("a", "water", "w2"),
            ("b", "water", "w2"),
        ];
        let distances = language_distances(codings);
        assert_eq!(distances.get("a", "b"), Some(0.5));
    }

    #[test]
    fn test_uncoded_languages_are_far_apart() {
        let codings = [("a", "water", ""), ("b", "water", "")];
        let distances = language_distances(codings);
        assert_eq!(distances.get("a", "b"), Some(1.0));
    }

    #[test]
    fn test_tree_from_distances() {
        let codings = [
            ("kui", "eye", "eye-1"),
            ("abui", "eye", "eye-1"),
            ("klon", "eye", "eye-2"),
        ];
        let tree = language_distances(codings).to_tree().unwrap();
        assert_eq!(tree.to_newick(), "((abui:0,kui:0):0.5,klon:0.5);");
    }
}
