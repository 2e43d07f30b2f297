use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use treepath::{EvaluationContext, JsonNode, PathEngine};
use treepath_support::Node;

fn create_simple_order() -> Node {
    JsonNode::root(json!({
        "resourceType": "Order",
        "id": "o-100",
        "active": true,
        "placed": "2023-01-15",
        "customer": {
            "name": "Peter Chalmers",
            "email": "peter@example.com"
        },
        "item": [
            { "sku": "P-1", "name": "pen", "qty": 2, "price": 1.5 },
            { "sku": "I-7", "name": "ink", "qty": 1, "price": 12.25 }
        ]
    }))
}

fn create_large_order(items: usize) -> Node {
    let lines: Vec<_> = (0..items)
        .map(|i| {
            json!({
                "sku": format!("S-{}", i),
                "name": format!("item {}", i % 50),
                "qty": (i % 7) as i64,
                "price": (i % 13) as f64 + 0.25,
                "tag": ["bulk", if i % 2 == 0 { "even" } else { "odd" }]
            })
        })
        .collect();
    JsonNode::root(json!({
        "resourceType": "Order",
        "id": "o-large",
        "item": lines
    }))
}

fn bench_simple_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator/navigation");
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new(create_simple_order());

    group.bench_function("single_field", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("Order.active")))
    });

    group.bench_function("nested_field", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("Order.customer.name")))
    });

    group.bench_function("indexed_access", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("Order.item[1].name")))
    });

    group.finish();
}

fn bench_collection_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator/collections");
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new(create_large_order(500));

    group.bench_function("where_simple", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("item.where(qty > 3)")))
    });

    group.bench_function("where_complex", |b| {
        b.iter(|| {
            engine.evaluate(
                &mut context,
                black_box("item.where(qty > 3 and tag contains 'even')"),
            )
        })
    });

    group.bench_function("select", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("item.select(price * qty)")))
    });

    group.bench_function("distinct", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("item.name.distinct()")))
    });

    group.bench_function("sum", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("item.qty.sum()")))
    });

    group.finish();
}

fn bench_string_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator/strings");
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new(create_simple_order());

    group.bench_function("string_concat", |b| {
        b.iter(|| {
            engine.evaluate(
                &mut context,
                black_box("customer.name + ' <' + customer.email + '>'"),
            )
        })
    });

    group.bench_function("upper", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("customer.name.upper()")))
    });

    group.bench_function("matches", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("customer.email.matches('@example')")))
    });

    group.finish();
}

fn bench_type_and_temporal_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator/types");
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new(create_simple_order());

    group.bench_function("is_type", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("item.price.first() is Decimal")))
    });

    group.bench_function("of_type", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("item.children().ofType(Integer)")))
    });

    group.bench_function("date_arithmetic", |b| {
        b.iter(|| engine.evaluate(&mut context, black_box("@2023-01-15 + 1 year > @2023-06-01")))
    });

    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator/compile");
    let expression = "item.where(qty > 1 and price < 10).select(name & ' x' & qty.toString())";

    group.bench_function("cached", |b| {
        let engine = PathEngine::new();
        b.iter(|| engine.compile(black_box(expression)))
    });

    group.bench_function("uncached", |b| {
        b.iter(|| treepath::parser::parse(black_box(expression)))
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator/batch");
    let engine = PathEngine::new();
    let orders: Vec<Node> = (0..64).map(|_| create_large_order(50)).collect();

    group.bench_function("batch_64", |b| {
        b.iter(|| engine.evaluate_batch(black_box("item.where(qty > 3).count()"), &orders))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_navigation,
    bench_collection_operations,
    bench_string_operations,
    bench_type_and_temporal_operations,
    bench_compilation,
    bench_batch
);
criterion_main!(benches);
