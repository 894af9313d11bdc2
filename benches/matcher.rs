use clipsweep::{FuzzyMatcher, MatcherOptions, RankOptions, RankedSearch};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use mimalloc::MiMalloc;
use std::borrow::Cow;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const CANDIDATE: &str = "./benchmark/target/release/.fingerprint/semver-parser-a5e84da67081840e/test/lib-semver_parser-a5e84da67081840e.json";

pub fn matcher_benchmark(c: &mut Criterion) {
    let plain = FuzzyMatcher::new(MatcherOptions::default());
    let markup = FuzzyMatcher::new(MatcherOptions {
        pre: "<b>".to_string(),
        post: "</b>".to_string(),
        escape_markup: true,
        ..MatcherOptions::default()
    });

    let mut group = c.benchmark_group("matcher");
    group.throughput(Throughput::Elements(1_u64));

    group.bench_function("fuzzy", |b| {
        b.iter(|| plain.match_pattern("test", CANDIDATE))
    });

    group.bench_function("fuzzy-markup", |b| {
        b.iter(|| markup.match_pattern("test", CANDIDATE))
    });

    group.bench_function("fuzzy-miss", |b| {
        b.iter(|| plain.match_pattern("zzzzq", CANDIDATE))
    });

    group.finish();
}

pub fn rank_benchmark(c: &mut Criterion) {
    let search = RankedSearch::new(
        FuzzyMatcher::new(MatcherOptions::default()),
        RankOptions::default(),
    );
    let candidates: Vec<String> = (0..1000)
        .map(|n| format!("{} {}", CANDIDATE, n))
        .collect();

    let mut group = c.benchmark_group("rank");
    group.throughput(Throughput::Elements(candidates.len() as u64));
    group.bench_function("filter-1000", |b| {
        b.iter(|| {
            search.filter("test", candidates.iter(), |item: &&String| {
                Cow::Borrowed(item.as_str())
            })
        })
    });
    group.finish();
}

criterion_group!(benches, matcher_benchmark, rank_benchmark);
criterion_main!(benches);
