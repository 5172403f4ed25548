//! Benchmarks for tree queries and interchange.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polysched::prelude::*;
use polysched::tree::IteratorTable;

/// `roots` nests, each a chain of `depth` loops ending in two leaves with
/// one computation each.
fn forest(roots: usize, depth: usize) -> IteratorTree {
    let bound = |v| LoopBound::Int(v);
    let mut table = IteratorTable::new();
    for r in 0..roots {
        let name = |d: usize| format!("r{}_l{}", r, d);
        for d in 0..depth {
            let parent = if d == 0 { None } else { Some(name(d - 1)) };
            let children = if d + 1 < depth {
                vec![name(d + 1)]
            } else {
                vec![format!("r{}_a", r), format!("r{}_b", r)]
            };
            let children: Vec<&str> = children.iter().map(String::as_str).collect();
            table.insert(
                name(d),
                IteratorAnnotation::new(parent.as_deref(), bound(0), bound(256)).with_children(&children),
            );
        }
        let last = name(depth - 1);
        for leaf in ["a", "b"] {
            table.insert(
                format!("r{}_{}", r, leaf),
                IteratorAnnotation::new(Some(last.as_str()), bound(0), bound(16))
                    .with_computations(&[format!("comp_{}_{}", r, leaf).as_str()]),
            );
        }
    }
    IteratorTree::from_annotations(&ProgramAnnotation { iterators: table }).unwrap()
}

/// Benchmark building a tree from annotations.
fn bench_build(c: &mut Criterion) {
    let tree = forest(16, 8);
    let annotation = {
        let mut table = IteratorTable::new();
        for node in tree.nodes() {
            let children: Vec<&str> = node.children().iter().map(|c| c.as_str()).collect();
            let comps: Vec<&str> = node.computations().iter().map(String::as_str).collect();
            table.insert(
                node.id().clone(),
                IteratorAnnotation::new(node.parent().map(|p| p.as_str()), LoopBound::Int(0), LoopBound::Int(8))
                    .with_children(&children)
                    .with_computations(&comps),
            );
        }
        ProgramAnnotation { iterators: table }
    };

    c.bench_function("build_forest_16x8", |b| {
        b.iter(|| IteratorTree::from_annotations(black_box(&annotation)).unwrap())
    });
}

/// Benchmark candidate section extraction.
fn bench_sections(c: &mut Criterion) {
    let tree = forest(16, 8);
    c.bench_function("candidate_sections_16x8", |b| {
        b.iter(|| black_box(&tree).get_candidate_sections().unwrap())
    });

    c.bench_function("interchange_candidates_16x8", |b| {
        b.iter(|| ActionKind::Interchange.candidates(black_box(&tree)).unwrap())
    });
}

/// Benchmark subtree computation queries.
fn bench_subtree_computations(c: &mut Criterion) {
    let tree = forest(16, 8);
    let roots: Vec<IteratorId> = tree.roots().to_vec();
    c.bench_function("subtree_computations_roots", |b| {
        b.iter(|| {
            for root in &roots {
                black_box(tree.get_iterator_subtree_computations(root).unwrap());
            }
        })
    });
}

/// Benchmark interchange of a root with its deepest chain loop.
fn bench_interchange(c: &mut Criterion) {
    let mut tree = forest(4, 12);
    let outer = IteratorId::new("r0_l0");
    let inner = IteratorId::new("r0_l11");
    c.bench_function("interchange_distant", |b| {
        b.iter(|| {
            tree.interchange(black_box(&outer), black_box(&inner)).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_sections,
    bench_subtree_computations,
    bench_interchange
);
criterion_main!(benches);
