/// Benchmarks for analysis script construction.
///
/// Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pyflow_bridge::domain::AnalysisScript;

/// Synthetic snippet of `lines` statements, every `quote_every`-th one
/// carrying a triple-quoted string.
fn synthetic_snippet(lines: usize, quote_every: usize) -> String {
    let mut out = String::new();
    for i in 0..lines {
        if quote_every > 0 && i % quote_every == 0 {
            out.push_str(&format!("doc_{} = \"\"\"block {}\"\"\"\n", i, i));
        } else {
            out.push_str(&format!("if v_{} > {}:\n    v_{} -= 1\n", i, i, i));
        }
    }
    out
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis_script_build");

    for &lines in &[10usize, 1_000, 10_000] {
        for &(label, quote_every) in &[("plain", 0usize), ("quoted", 10usize)] {
            let snippet = synthetic_snippet(lines, quote_every);
            group.throughput(Throughput::Bytes(snippet.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(label, lines),
                &snippet,
                |b, snippet| b.iter(|| AnalysisScript::build(black_box(snippet))),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
