//! Benchmarks for lexing and parsing definition files
//!
//! These benchmarks measure throughput on generated tables with many
//! columns and measures, with and without lint collection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tmdlguard_syntax::{Lexer, TmdlParser};

/// Generate a table file with N columns and N/2 measures
fn generate_table(num_columns: usize) -> String {
    let mut text = String::from("table Generated\n\tlineageTag: 00000000\n\n");

    for i in 0..num_columns {
        text.push_str(&format!(
            "\tcolumn 'Column {i}'\n\t\tdataType: int64\n\t\tsummarizeBy: sum\n\t\tsourceColumn: col_{i}\n\n"
        ));
    }

    for i in 0..num_columns / 2 {
        text.push_str(&format!(
            "\tmeasure 'Measure {i}' =\n\t\t\tVAR x = SUM(Generated[Column {i}])\n\t\t\tRETURN x * 2\n\t\tformatString: 0\n\n"
        ));
    }

    text.push_str("\tpartition Generated = m\n\t\tmode: import\n\t\tsource =\n\t\t\t\tlet\n\t\t\t\t\tSource = 1\n\t\t\t\tin\n\t\t\t\t\tSource\n");
    text
}

/// Benchmark: Tokenize tables of growing size
fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    for num_columns in [10, 100, 1000].iter() {
        let text = generate_table(*num_columns);

        group.bench_with_input(
            BenchmarkId::from_parameter(num_columns),
            num_columns,
            |b, _| {
                b.iter(|| black_box(Lexer::new(&text, "tables/Generated.tmdl").tokenize()));
            },
        );
    }

    group.finish();
}

/// Benchmark: Full parse, lints off and on
fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    let text = generate_table(500);

    group.bench_function("no_lints", |b| {
        let parser = TmdlParser::new();
        b.iter(|| black_box(parser.parse(&text, "tables/Generated.tmdl")));
    });

    group.bench_function("with_lints", |b| {
        let parser = TmdlParser::new().with_lints(true);
        b.iter(|| black_box(parser.parse(&text, "tables/Generated.tmdl")));
    });

    group.finish();
}

criterion_group!(benches, bench_lexer, bench_parser);
criterion_main!(benches);
