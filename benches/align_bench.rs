//! Criterion benchmarks for pairwise and group alignment.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cognate_align::align::align_pair;
use cognate_align::models::{AlignMode, AlignParams, Form, FormKey, Segment};
use cognate_align::multi::align_group;
use cognate_align::scores::{DefaultScores, PairScores};
use cognate_align::tree::GuideTree;

const INVENTORY: [&str; 12] = ["p", "t", "k", "m", "n", "s", "l", "a", "e", "i", "o", "u"];

/// Deterministic pseudo-random form of `len` segments.
fn form(seed: usize, len: usize) -> Vec<Segment> {
    (0..len)
        .map(|i| Segment::from(INVENTORY[(seed * 7 + i * 5 + i * i) % INVENTORY.len()]))
        .collect()
}

/// Copy of `base` with every `every`-th segment replaced.
fn mutate(base: &[Segment], every: usize) -> Vec<Segment> {
    base.iter()
        .enumerate()
        .map(|(i, s)| if i % every == 0 { Segment::from("ʔ") } else { s.clone() })
        .collect()
}

fn bench_pairwise(c: &mut Criterion) {
    let params = AlignParams::default();
    let local = AlignParams {
        mode: AlignMode::Local,
        ..params
    };
    let table = PairScores::new()
        .with(Some("p"), Some("t"), 0.5)
        .with(Some("a"), Some("e"), 0.5)
        .with(Some("ʔ"), None, -0.5);

    let sizes = [8, 32, 128];

    let mut group = c.benchmark_group("align_pair");

    for size in sizes {
        let seq = form(1, size);
        let similar = mutate(&seq, 3);
        let other = form(2, size);

        group.bench_with_input(BenchmarkId::new("identical", size), &size, |b, _| {
            b.iter(|| align_pair(black_box(&seq), black_box(&seq), &DefaultScores, &params))
        });

        group.bench_with_input(BenchmarkId::new("similar", size), &size, |b, _| {
            b.iter(|| align_pair(black_box(&seq), black_box(&similar), &DefaultScores, &params))
        });

        group.bench_with_input(BenchmarkId::new("unrelated", size), &size, |b, _| {
            b.iter(|| align_pair(black_box(&seq), black_box(&other), &DefaultScores, &params))
        });

        group.bench_with_input(BenchmarkId::new("local", size), &size, |b, _| {
            b.iter(|| align_pair(black_box(&seq), black_box(&similar), &DefaultScores, &local))
        });

        group.bench_with_input(BenchmarkId::new("score_table", size), &size, |b, _| {
            b.iter(|| align_pair(black_box(&seq), black_box(&similar), &table, &params))
        });
    }

    group.finish();
}

fn bench_group(c: &mut Criterion) {
    let params = AlignParams::default();

    let mut group = c.benchmark_group("align_group");

    let language_counts = [4, 16, 64];

    for count in language_counts {
        let languages: Vec<String> = (0..count).map(|i| format!("lang{}", i)).collect();
        let tree = GuideTree::star(languages.as_slice()).unwrap();
        let base = form(3, 7);
        let forms: Vec<Form> = languages
            .iter()
            .enumerate()
            .map(|(i, language)| {
                let mut segments = mutate(&base, 2 + i % 4);
                segments.truncate(4 + i % 4);
                Form::new(FormKey::new(language.as_str(), "water"), segments)
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("star_tree", count), &count, |b, _| {
            b.iter(|| align_group(black_box(&forms), &tree, &DefaultScores, &params))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pairwise, bench_group);
criterion_main!(benches);
