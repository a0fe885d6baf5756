use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use prodstats_products::{average_by_category, clean, normalize, CategoryPriceTotal, RawFeed};

const CATEGORIES: &[&str] = &["Electronics", "Furniture", "Books", "Garden", "Toys"];

/// Synthetic feed with alternate column names, a duplicate every tenth row and
/// an invalid price every twentieth row.
fn synthetic_feed(rows: usize) -> Vec<u8> {
    let mut csv = String::from("product_name,type,cost,last_updated\n");
    for i in 0..rows {
        let name_idx = if i % 10 == 9 { i - 1 } else { i };
        let category = CATEGORIES[name_idx % CATEGORIES.len()];
        let price = if i % 20 == 19 {
            "invalid".to_string()
        } else {
            format!("{}.{:02}", 1 + i % 500, i % 100)
        };
        csv.push_str(&format!(
            "Product {name_idx},{category},{price},2024-01-{:02}T10:30:00Z\n",
            1 + i % 28
        ));
    }
    csv.into_bytes()
}

fn bench_clean_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_pipeline");

    for rows in [100usize, 1_000, 10_000].iter() {
        let bytes = synthetic_feed(*rows);
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("parse_normalize_clean", rows), &bytes, |b, bytes| {
            let now = Utc::now();
            b.iter(|| {
                let feed = RawFeed::from_csv(black_box(bytes)).unwrap();
                let frame = normalize(&feed).unwrap();
                black_box(clean(&frame, now))
            });
        });
    }

    group.finish();
}

fn bench_clean_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_only");

    let bytes = synthetic_feed(10_000);
    let frame = normalize(&RawFeed::from_csv(&bytes).unwrap()).unwrap();
    let now = Utc::now();
    group.throughput(Throughput::Elements(frame.len() as u64));
    group.bench_function("clean_10k", |b| b.iter(|| black_box(clean(black_box(&frame), now))));

    group.finish();
}

fn bench_average_by_category(c: &mut Criterion) {
    let mut group = c.benchmark_group("average_by_category");

    let totals: Vec<CategoryPriceTotal> = (0..1_000)
        .map(|i| CategoryPriceTotal {
            category: format!("Category {i:04}"),
            total_cents: 1_000_000 + i,
            count: 1 + i % 37,
        })
        .collect();
    group.bench_function("1k_categories", |b| {
        b.iter(|| black_box(average_by_category(black_box(&totals))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_clean_pipeline,
    bench_clean_only,
    bench_average_by_category
);
criterion_main!(benches);
