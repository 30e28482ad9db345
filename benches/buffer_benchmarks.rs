//! Benchmarks for the text buffer, tagging and word scanning.
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gram_buffer::breaks::boundary_range;
use gram_buffer::search::match_columns;
use gram_buffer::{Direction, TextBuffer, find_boundary};
use gram_syntax::{LanguageRegistry, Tagger};

/// Python-ish source, `lines` lines long.
fn generate_source(lines: usize) -> String {
    (0..lines)
        .map(|i| match i % 4 {
            0 => format!("def func_{}(a, b=0x{:x}):\n", i, i),
            1 => format!("    # step {} of the loop, see file:///tmp/log.txt:{}\n", i, i),
            2 => format!("    value = self.items[{}] + \"text {}\"\n", i, i),
            _ => "    return value\n".to_string(),
        })
        .collect()
}

fn bench_buffer_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_creation");

    for size in [100, 1000, 10000, 100000].iter() {
        let text = generate_source(*size);

        group.bench_with_input(BenchmarkId::new("from_string", size), &text, |b, text| {
            b.iter(|| black_box(TextBuffer::from(black_box(text.as_str()))))
        });
    }

    group.finish();
}

fn bench_editing(c: &mut Criterion) {
    let mut group = c.benchmark_group("editing");
    let base_text = generate_source(10000);

    group.bench_function("insert_at_middle", |b| {
        b.iter_with_setup(
            || TextBuffer::from(base_text.as_str()),
            |mut buffer| {
                let mid = buffer.len_chars() / 2;
                buffer.insert(mid, black_box("inserted text")).unwrap();
                black_box(buffer)
            },
        )
    });

    group.bench_function("replace_then_undo", |b| {
        b.iter_with_setup(
            || TextBuffer::from(base_text.as_str()),
            |mut buffer| {
                buffer.replace(100..200, black_box("replacement")).unwrap();
                buffer.undo().unwrap();
                black_box(buffer)
            },
        )
    });

    group.finish();
}

fn bench_tagging(c: &mut Criterion) {
    let mut group = c.benchmark_group("tagging");
    let registry = LanguageRegistry::new().unwrap();
    let python = registry.tagger_for("py");
    let links = registry.links();

    for lines in [256, 2048].iter() {
        let text = generate_source(*lines);
        group.bench_with_input(BenchmarkId::new("python", lines), &text, |b, text| {
            b.iter(|| black_box(python.apply(black_box(text))))
        });
        group.bench_with_input(BenchmarkId::new("links", lines), &text, |b, text| {
            b.iter(|| black_box(links.apply(black_box(text))))
        });
    }

    group.finish();
}

fn bench_word_scanning(c: &mut Criterion) {
    let mut group = c.benchmark_group("word_scanning");
    let line = "word ".repeat(2000) + &")".repeat(500) + "tail";

    group.bench_function("forward_from_start", |b| {
        b.iter(|| black_box(find_boundary(black_box(&line), 0, Direction::Forward)))
    });

    group.bench_function("backward_over_run", |b| {
        let end = line.chars().count() - 4;
        b.iter(|| black_box(boundary_range(black_box(&line), end, Direction::Backward)))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let text = generate_source(10000);
    let buffer = TextBuffer::from(text.as_str());

    group.bench_function("find_next", |b| {
        b.iter(|| black_box(buffer.find_next(black_box("RETURN"), 0)))
    });

    group.bench_function("match_columns_all_lines", |b| {
        b.iter(|| {
            let hits: usize = text
                .lines()
                .map(|line| match_columns(line, black_box("value")).len())
                .sum();
            black_box(hits)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_buffer_creation,
    bench_editing,
    bench_tagging,
    bench_word_scanning,
    bench_search,
);

criterion_main!(benches);
