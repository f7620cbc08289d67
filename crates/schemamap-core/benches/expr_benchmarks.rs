//! Benchmarks for the expression evaluator and object mapping
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use schemamap_core::expr::{parse_expression, Evaluator, MapEnvironment};
use schemamap_core::{ObjectTransformer, TransformationSpecification, TransformerOptions};
use schemamap_schemas::SchemaView;
use serde_json::{json, Value};

const EXPRESSIONS: [(&str, &str); 6] = [
    ("name", "name"),
    ("concat", "str({age_in_years}) + ' years'"),
    ("arithmetic", "({age_in_years} * 12 + 6) // 2"),
    ("conditional", "'adult' if age_in_years >= 18 else 'minor'"),
    ("distribution", "jobs.title"),
    ("function", "max(len(aliases), 1)"),
];

fn person() -> Value {
    json!({
        "name": "Alice",
        "age_in_years": 33,
        "aliases": ["Al", "Ally"],
        "jobs": [{"title": "engineer"}, {"title": "manager"}]
    })
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    for (name, expr) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::new("parse", name), expr, |b, expr| {
            b.iter(|| {
                let result = parse_expression(black_box(expr));
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");
    let env = MapEnvironment::from_json(&person());
    let evaluator = Evaluator::restricted();

    for (name, expr) in EXPRESSIONS {
        let parsed = parse_expression(expr).unwrap();
        group.bench_with_input(BenchmarkId::new("evaluate", name), &parsed, |b, parsed| {
            b.iter(|| {
                let result = evaluator.eval_expr(expr, black_box(parsed), &env);
                black_box(result)
            })
        });
        group.bench_with_input(BenchmarkId::new("parse_and_evaluate", name), expr, |b, expr| {
            b.iter(|| {
                let result = evaluator.evaluate(black_box(expr), &env);
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_map_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_object");
    let schema = SchemaView::from_value(json!({
        "name": "personinfo",
        "classes": {"Person": {"attributes": {
            "name": {"range": "string"},
            "age_in_years": {"range": "integer"},
            "aliases": {"range": "string", "multivalued": true},
            "height": {"range": "float", "unit": {"ucum_code": "m"}}
        }}}
    }))
    .unwrap();
    let spec = TransformationSpecification::from_value(json!({
        "class_derivations": {"Agent": {"populated_from": "Person", "slot_derivations": {
            "label": {"populated_from": "name"},
            "age": {"expr": "str({age_in_years}) + ' years'"},
            "aliases_str": {"populated_from": "aliases", "stringification": {"delimiter": "|"}},
            "height_cm": {"populated_from": "height", "unit_conversion": {"target_unit": "cm"}}
        }}}
    }))
    .unwrap();
    let transformer = ObjectTransformer::new(spec, schema, TransformerOptions::default()).unwrap();

    for size in [1usize, 100, 1000] {
        let people: Vec<Value> = (0..size)
            .map(|i| {
                json!({
                    "name": format!("Person {}", i),
                    "age_in_years": i % 90,
                    "aliases": ["a", "b"],
                    "height": 1.5 + (i % 50) as f64 / 100.0
                })
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("people", size), &people, |b, people| {
            b.iter(|| {
                for person in people {
                    black_box(transformer.map_object(black_box(person), Some("Person"), None).ok());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_evaluation, bench_map_object);

criterion_main!(benches);
