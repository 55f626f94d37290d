use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use colagg::datagen::{population_spec, population_table, GROUP_COLUMNS};
use colagg::{CancellationToken, ParallelConfig};

fn bench_groupby(c: &mut Criterion) {
    let spec = population_spec();
    let config = ParallelConfig::builder()
        .min_chunk_rows(10_000)
        .build()
        .expect("valid benchmark config");

    let mut group = c.benchmark_group("groupby");
    group.sample_size(10);

    for size in [10_000, 100_000, 1_000_000] {
        let table = population_table(size, 1).expect("synthetic table");

        group.bench_with_input(BenchmarkId::new("sequential", size), &table, |b, table| {
            b.iter(|| {
                let grouped = table.group_by(&GROUP_COLUMNS).expect("group columns");
                black_box(grouped.agg(&spec).expect("aggregation"))
            })
        });

        group.bench_with_input(BenchmarkId::new("concurrent", size), &table, |b, table| {
            b.iter(|| {
                black_box(
                    table
                        .concurrent_group_by_with(
                            &GROUP_COLUMNS,
                            &spec,
                            &config,
                            &CancellationToken::new(),
                        )
                        .expect("aggregation"),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_groupby);
criterion_main!(benches);
