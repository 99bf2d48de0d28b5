use std::fmt::Write as _;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use xferlang::{Parser, SerializeOptions, parse};

fn sample_documents() -> Vec<(&'static str, &'static str)> {
    vec![
        ("scalars", "( 42 &5000000000 *12.50 ^3.25 ~true \\$263A @2024-01-02T03:04:05Z@ ? <> )"),
        ("object", "{ name \"Alice\" age 30 tags [\"a\" \"b\" \"c\"] address { city \"Oslo\" zip 150 } }"),
        ("quoted", "{ note <\"\"say \"hi\" twice\"\"\"> path \"C:\\\\tmp\\\\x\" }"),
        (
            "instructions",
            "<! let base \"svc\" !> <! dynamicSource { port const \"8080\" } !> { <!id \"main\"!> name '_base_-api' port #<|port|> <! if gt[#2 #1] !> debug ~true }",
        ),
    ]
}

/// A flat object with `n` members of mixed kinds.
fn build_large_document(n: usize) -> String {
    let mut text = String::from("{\n");
    for i in 0..n {
        let _ = match i % 4 {
            0 => writeln!(text, "  key{i} \"value number {i}\""),
            1 => writeln!(text, "  key{i} {i}"),
            2 => writeln!(text, "  key{i} [ {i} {} {} ]", i + 1, i + 2),
            _ => writeln!(text, "  key{i} {{ nested ~true amount *{i}.25 }}"),
        };
    }
    text.push('}');
    text
}

fn benchmark_parse(c: &mut Criterion) {
    let parser = Parser::new();
    for (name, text) in sample_documents() {
        c.bench_function(&format!("parse/{name}"), |b| {
            b.iter(|| {
                let doc = parser.parse(black_box(text)).expect("parse failure");
                black_box(doc);
            });
        });
    }
}

fn benchmark_parse_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse/members");
    let parser = Parser::new();
    for n in [10usize, 100, 1000] {
        let text = build_large_document(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| {
                let doc = parser.parse(black_box(text)).expect("parse failure");
                black_box(doc);
            });
        });
    }
    group.finish();
}

fn benchmark_serialize(c: &mut Criterion) {
    let doc = parse(&build_large_document(500)).expect("parse failure");
    let compact = SerializeOptions::compact();
    let pretty = SerializeOptions::pretty();
    c.bench_function("serialize/compact", |b| b.iter(|| black_box(doc.to_text_with(&compact))));
    c.bench_function("serialize/pretty", |b| b.iter(|| black_box(doc.to_text_with(&pretty))));
}

fn benchmark_round_trip(c: &mut Criterion) {
    let text = build_large_document(200);
    c.bench_function("round_trip/parse_serialize_parse", |b| {
        b.iter(|| {
            let first = parse(black_box(&text)).expect("parse failure");
            let written = first.to_text_with(&SerializeOptions::compact());
            black_box(parse(&written).expect("reparse failure"));
        });
    });
}

criterion_group!(benches, benchmark_parse, benchmark_parse_scaling, benchmark_serialize, benchmark_round_trip);
criterion_main!(benches);
