use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use volume_refill::estimator::estimate;
use volume_refill::models::ConsumptionSnapshot;
use volume_refill::portal::payload::Payload;

fn regular_body(packages: usize) -> String {
    let booked: Vec<String> = (0..packages)
        .map(|i| format!(r#"{{"total":{{"value":1}},"used":{{"value":{}}}}}"#, (i % 10) as f64 / 10.0))
        .collect();

    format!(
        r#"{{
  "dataVolume": {{
    "dataUpdatedAt": "2024-05-01T11:45:00+02:00",
    "highSpeedLimit": {{ "value": 25 }},
    "totalConsumption": {{ "value": 12.3456 }},
    "resetDay": 17,
    "unlimitedRefill": {{
      "actions": {{ "refill-highspeed-volume": {{ "href": "/refill" }} }},
      "bookedRefillPackages": [{}]
    }}
  }},
  "telephony": {{ "isFlatRate": true, "totalConsumption": {{ "value": 0 }} }},
  "messages": {{ "isFlatRate": true, "totalConsumption": {{ "value": 0 }} }},
  "totalCosts": {{ "amount": "19,99", "currency": "EUR" }}
}}"#,
        booked.join(",")
    )
}

fn benchmark_payload_parsing(c: &mut Criterion) {
    let fetched_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let small = regular_body(1);
    let large = regular_body(200);

    c.bench_function("parse_snapshot_small", |b| {
        b.iter(|| {
            let payload = Payload::parse(black_box(&small)).unwrap();
            black_box(payload.snapshot(fetched_at))
        })
    });

    c.bench_function("parse_summary_200_packages", |b| {
        b.iter(|| {
            let payload = Payload::parse(black_box(&large)).unwrap();
            black_box(payload.summary("4711", fetched_at))
        })
    });
}

fn benchmark_estimate(c: &mut Criterion) {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let previous = ConsumptionSnapshot::new(2.0, 10.0, t0);
    let current = ConsumptionSnapshot::new(2.5, 10.0, t0 + chrono::Duration::seconds(300));

    c.bench_function("estimate_interval", |b| {
        b.iter(|| estimate(black_box(Some(&previous)), black_box(&current), 1.0, 0.7, 5, 300))
    });
}

criterion_group!(benches, benchmark_payload_parsing, benchmark_estimate);
criterion_main!(benches);
