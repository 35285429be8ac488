//! Benchmark suite for completion latency
//!
//! This benchmark measures:
//! - Reading source into a syntax tree
//! - Node lookup at the cursor (find_node_at_offset)
//! - Position classification
//! - The full completion pipeline, with and without project files
//!
//! Completion runs on every keystroke, so the full pipeline is the number to
//! watch; the other groups locate regressions inside it.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use phel_completion::config::CompletionConfig;
use phel_completion::ir::reader::read;
use phel_completion::lsp::features::completion::{
    CompletionEngine, CursorPosition, PositionClassifier,
};
use phel_completion::lsp::features::node_finder::{find_node_at_offset, insert_placeholder};
use phel_completion::workspace::InMemoryProject;

/// Generate a Phel file with `definitions` functions, each nesting `depth` lets
fn generate_phel(definitions: usize, depth: usize) -> String {
    let mut code = String::from("(ns bench\\generated\n  (:require phel\\str :as s))\n\n");
    for d in 0..definitions {
        code.push_str(&format!("(defn fn-{} [arg-{} & more]\n", d, d));
        for level in 0..depth {
            code.push_str(&"  ".repeat(level + 1));
            code.push_str(&format!("(let [local-{}-{} (inc arg-{})]\n", d, level, d));
        }
        code.push_str(&"  ".repeat(depth + 1));
        code.push_str("(map inc more)");
        code.push_str(&")".repeat(depth + 1));
        code.push_str("\n\n");
    }
    code
}

/// Offset inside the innermost body of the last definition
fn cursor_offset(code: &str) -> usize {
    code.rfind("(map inc more)").map_or(code.len(), |i| i + "(map ".len())
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    for definitions in [10, 50, 200] {
        let code = generate_phel(definitions, 3);
        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(definitions), &code, |b, code| {
            b.iter(|| read(black_box(code)));
        });
    }

    group.finish();
}

fn bench_node_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_lookup");

    for depth in [2, 8, 16] {
        let code = generate_phel(20, depth);
        let offset = cursor_offset(&code);
        let tree = read(&code);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &offset, |b, offset| {
            b.iter(|| find_node_at_offset(&tree, black_box(*offset)));
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let config = CompletionConfig::default();
    let classifier = PositionClassifier::new(&config);

    for depth in [2, 8, 16] {
        let code = generate_phel(20, depth);
        let offset = cursor_offset(&code);
        let Ok(text) = insert_placeholder(&code, offset, &config.placeholder) else {
            continue;
        };
        let tree = read(&text);
        let Ok(cursor) = CursorPosition::locate(&tree, offset, &config) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(depth), &cursor, |b, cursor| {
            b.iter(|| classifier.context(black_box(cursor)));
        });
    }

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");

    let code = generate_phel(50, 4);
    let offset = cursor_offset(&code);

    let engine = CompletionEngine::default();
    group.bench_function("single_file", |b| {
        b.iter(|| engine.complete_source(black_box(&code), offset));
    });

    let project = (0..20).fold(InMemoryProject::new(), |project, i| {
        project.with_file(format!("src/module_{}.phel", i), generate_phel(10, 1))
    });
    let engine = CompletionEngine::default().with_project(Arc::new(project));
    group.bench_function("with_project_warm_cache", |b| {
        b.iter(|| engine.complete_source(black_box(&code), offset));
    });

    group.bench_function("with_project_cold_cache", |b| {
        b.iter(|| {
            engine.clear_caches();
            engine.complete_source(black_box(&code), offset)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_read,
    bench_node_lookup,
    bench_classification,
    bench_full_pipeline,
);

criterion_main!(benches);
