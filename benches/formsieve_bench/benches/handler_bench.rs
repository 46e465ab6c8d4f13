//! End-to-end handler benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use formsieve::prelude::*;
use serde_json::{json, Map, Value};

fn signup_rules() -> Rules {
    Rules::from_json(json!({
        "name": {"type": "text", "filters": {"toTitle": true}, "options": {"min": 2, "max": 60}},
        "email": {"type": "email", "checks": [{"that": "notExists", "model": "users"}]},
        "age": {"type": "pInt", "options": {"min": 18}},
        "dob": "date",
        "subscribe": {"type": "checkbox", "required": false},
        "topics": {"requiredIf": {"condition": "checked", "field": "subscribe"}}
    }))
    .unwrap_or_default()
}

fn signup_form() -> Map<String, Value> {
    json!({
        "name": "ada lovelace",
        "email": "ada@example.com",
        "age": "36",
        "dob": "1815-12-10",
        "subscribe": "on",
        "topics": ["engines", "notes", "engines"]
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

fn bench_execute(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let adapter = Arc::new(InMemoryAdapter::new().seed(
        "users",
        (0..1000).map(|i| json!({"email": format!("user{i}@example.com")})),
    ));
    let rules = signup_rules();
    let form = signup_form();

    c.bench_function("handler_execute_signup", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut handler = Handler::with_sources(form.clone(), None, rules.clone())
                    .db_adapter(adapter.clone());
                handler.execute().await.unwrap_or(false)
            })
        })
    });
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
