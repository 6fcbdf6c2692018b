//! Performance benchmarks for resdoc operations.
//!
//! Run with: cargo bench --package resdoc

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use resdoc::{marshal_many, resolve_patches, to_vec_many, unmarshal_many_as, PatchOp, Record};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Default, Clone, Serialize, Record)]
struct Author {
    #[resdoc(primary = "people")]
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, Clone, Serialize, Record)]
struct Post {
    #[resdoc(primary = "posts")]
    pub id: u64,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub views: u64,
    #[resdoc(relation)]
    pub author: Option<Box<Author>>,
    #[resdoc(relation)]
    pub related: Vec<Post>,
}

// ============================================================================
// Helper functions to generate test data
// ============================================================================

/// Generate N posts spread over `authors` distinct authors.
fn generate_posts(num_posts: usize, authors: usize) -> Vec<Post> {
    (0..num_posts)
        .map(|i| Post {
            id: i as u64,
            title: format!("Post {i}"),
            body: "lorem ipsum ".repeat(20),
            tags: vec!["rust".into(), format!("tag-{}", i % 7)],
            views: (i * 13) as u64,
            author: Some(Box::new(Author {
                id: (i % authors) as u64,
                name: format!("Author {}", i % authors),
                email: format!("author{}@example.com", i % authors),
            })),
            related: Vec::new(),
        })
        .collect()
}

/// Link every post to its `fan_out` successors.
fn interlink(posts: &[Post], fan_out: usize) -> Vec<Post> {
    posts
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let mut post = post.clone();
            post.related = (1..=fan_out)
                .map(|k| posts[(i + k) % posts.len()].clone())
                .collect();
            post
        })
        .collect()
}

// ============================================================================
// Benchmark: marshal vs plain serde_json
// ============================================================================

fn bench_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal_many");

    for num_posts in [10, 100, 1000] {
        group.throughput(Throughput::Elements(num_posts as u64));
        let posts = generate_posts(num_posts, 10);

        group.bench_with_input(
            BenchmarkId::new("resdoc", num_posts),
            &num_posts,
            |b, _| {
                b.iter(|| {
                    let result = to_vec_many(black_box(&posts));
                    black_box(result)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("serde_json", num_posts),
            &num_posts,
            |b, _| {
                b.iter(|| {
                    let result = serde_json::to_vec(black_box(&posts));
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: deduplication of interlinked graphs
// ============================================================================

fn bench_dedupe(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal_interlinked");

    for fan_out in [1, 4, 16] {
        let posts = interlink(&generate_posts(100, 10), fan_out);

        group.bench_with_input(BenchmarkId::from_parameter(fan_out), &fan_out, |b, _| {
            b.iter(|| {
                let result = marshal_many(black_box(&posts));
                black_box(result)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: unmarshal with included expansion
// ============================================================================

fn bench_unmarshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmarshal_many");

    for num_posts in [10, 100, 1000] {
        group.throughput(Throughput::Elements(num_posts as u64));
        let bytes = to_vec_many(&generate_posts(num_posts, 10)).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(num_posts),
            &num_posts,
            |b, _| {
                b.iter(|| {
                    let result = unmarshal_many_as::<Post>(black_box(&bytes));
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: patch resolution
// ============================================================================

fn bench_patches(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_patches");

    for num_ops in [10, 100, 1000] {
        let ops = || {
            (0..num_ops)
                .map(|i| match i % 4 {
                    0 => PatchOp::replace("/title", json!(format!("t{i}"))),
                    1 => PatchOp::add("/tags", json!("new")),
                    2 => PatchOp::replace("/author", json!(i.to_string())),
                    _ => PatchOp::replace("/views", json!(i)),
                })
                .collect::<Vec<_>>()
        };

        group.bench_with_input(BenchmarkId::from_parameter(num_ops), &num_ops, |b, _| {
            b.iter_batched(
                || ops(),
                |ops| black_box(resolve_patches::<Post>(ops)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_marshal,
    bench_dedupe,
    bench_unmarshal,
    bench_patches,
);

criterion_main!(benches);
