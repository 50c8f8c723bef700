use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use belegscan::core::*;

fn payload_with_lines(n: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            json!({
                "item_number": format!("A-{i}"),
                "description": format!("Service item {i}"),
                "quantity": 5,
                "unit_price": "120.00",
                "total": "600.00"
            })
        })
        .collect();
    let subtotal = 600 * n as i64;
    let tax = subtotal * 8 / 100;
    json!({
        "invoice_number": "BENCH-001",
        "invoice_date": "2024-06-15",
        "customer_name": "Benchmark GmbH",
        "billing_address": {
            "street": "Hauptstr. 1", "city": "Berlin",
            "state": "BE", "zip_code": "10115", "phone": null
        },
        "shipping_address": {
            "street": "Hauptstr. 1", "city": "Berlin",
            "state": "BE", "zip_code": "10115", "phone": null
        },
        "items": items,
        "subtotal": format!("{subtotal}.00"),
        "tax_rate": "0.08",
        "tax": format!("{tax}.00"),
        "total": format!("{}.00", subtotal + tax)
    })
}

fn bench_construction(c: &mut Criterion) {
    let value = payload_with_lines(10);
    c.bench_function("from_payload_10_lines", |b| {
        b.iter(|| {
            let payload = InvoicePayload::from_value(black_box(&value)).unwrap();
            InvoiceData::from_payload(payload).unwrap()
        })
    });
}

fn bench_consistency(c: &mut Criterion) {
    let payload = InvoicePayload::from_value(&payload_with_lines(10)).unwrap();
    let invoice = InvoiceData::from_payload(payload).unwrap();
    c.bench_function("check_consistency_10_lines", |b| {
        b.iter(|| check_consistency(black_box(&invoice)))
    });
}

fn bench_scoring(c: &mut Criterion) {
    let payload = InvoicePayload::from_value(&payload_with_lines(10)).unwrap();
    let invoice = InvoiceData::from_payload(payload).unwrap();
    c.bench_function("confidence_score_10_lines", |b| {
        b.iter(|| confidence_score(black_box(&invoice)))
    });
}

fn bench_tabular_round_trip(c: &mut Criterion) {
    let payload = InvoicePayload::from_value(&payload_with_lines(10)).unwrap();
    let invoice = InvoiceData::from_payload(payload).unwrap();
    c.bench_function("tabular_round_trip_10_lines", |b| {
        b.iter(|| {
            let (header, details) = black_box(&invoice).to_records();
            InvoiceData::from_records(header, details).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_construction,
    bench_consistency,
    bench_scoring,
    bench_tabular_round_trip
);
criterion_main!(benches);
