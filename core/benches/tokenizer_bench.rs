use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::BTreeSet;
use wordex_core::tokenizer::tokenize;
use wordex_core::{InvertedIndex, WordIndex};

const TEXT: &str = "Falcons are birds of prey in the genus Falco, which includes about 40 species. \
    Adult falcons have thin, tapered wings, which enable them to fly at high speed and change \
    direction rapidly. Peregrine falcons have been recorded diving at speeds of 320 kilometres \
    per hour, making them the fastest-moving creatures on Earth.";

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_paragraph", |b| b.iter(|| tokenize(TEXT)));
}

fn bench_search(c: &mut Criterion) {
    let index = InvertedIndex::new();
    for doc in 0..500 {
        index.merge(WordIndex::from_document(&format!("doc-{doc}"), TEXT));
    }
    let exact: BTreeSet<String> = ["falcon", "speed"].iter().map(|s| s.to_string()).collect();
    let prefix: BTreeSet<String> = ["f", "sp"].iter().map(|s| s.to_string()).collect();
    c.bench_function("exact_search_500_docs", |b| b.iter(|| index.search(&exact, false)));
    c.bench_function("partial_search_500_docs", |b| b.iter(|| index.search(&prefix, true)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
