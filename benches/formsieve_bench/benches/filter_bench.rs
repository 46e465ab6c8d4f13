//! Filter pipeline benchmarks
//!
//! Measures the per-value cost of the filter steps and of placeholder resolution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use formsieve::filter::{filter_list, filter_value};
use formsieve::placeholder::resolve;
use formsieve::{DataType, Filters, PlaceholderContext};
use serde_json::{json, Map, Value};

fn bench_filter_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_value");

    let defaults = Filters::new();
    group.bench_function("plain_text", |b| {
        let value = json!("  Ada Lovelace  ");
        b.iter(|| filter_value(black_box(&value), DataType::Text, &defaults))
    });

    group.bench_function("encoded_markup", |b| {
        let value = json!("%3Cp%3EHello%20%3Cb%3Eworld%3C%2Fb%3E%3C%2Fp%3E");
        b.iter(|| filter_value(black_box(&value), DataType::Text, &defaults))
    });

    let title = Filters::new().to_title().minimize(true);
    group.bench_function("multiline_title", |b| {
        let value = json!("the analytical\n  engine \n\n notes ");
        b.iter(|| filter_value(black_box(&value), DataType::Text, &title))
    });

    group.bench_function("int_cast", |b| {
        let value = json!("+1024");
        b.iter(|| filter_value(black_box(&value), DataType::Int, &defaults))
    });

    group.bench_function("checkbox", |b| {
        let value = json!("off");
        b.iter(|| filter_value(black_box(&value), DataType::Checkbox, &defaults))
    });

    group.finish();
}

fn bench_filter_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_list");
    let filters = Filters::new().to_lower().singularize();
    let tags: Vec<Value> = (0..50).map(|i| json!(format!("Tags{}", i % 20))).collect();

    group.bench_function("fifty_tags_unique", |b| {
        b.iter(|| filter_list(black_box(&tags), DataType::Text, &filters))
    });

    group.finish();
}

fn bench_placeholders(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholders");
    let data: Map<String, Value> = json!({"first_name": "Ada", "org": "acme", "min_age": 18})
        .as_object()
        .cloned()
        .unwrap_or_default();
    let ctx = PlaceholderContext::new("email", &data);

    group.bench_function("no_tokens", |b| {
        b.iter(|| resolve(black_box("plain template"), &ctx))
    });

    group.bench_function("data_and_clock_tokens", |b| {
        b.iter(|| {
            resolve(
                black_box("{name} of {first_name} at {org} before {current_date} ({min_age}+)"),
                &ctx,
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_filter_value, bench_filter_list, bench_placeholders);
criterion_main!(benches);
