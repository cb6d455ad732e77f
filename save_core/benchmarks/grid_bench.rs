use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use save_core::{clean_water, format_packed_values, parse_packed_grid};

fn packed_values(cells: usize) -> String {
    let values: Vec<f64> = (0..cells).map(|i| (i % 97) as f64 * 0.013).collect();
    format_packed_values(&values)
}

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid");

    for size in [64u32, 128, 256] {
        let cells = (size * size) as usize;
        let packed = packed_values(cells);
        group.throughput(Throughput::Elements(cells as u64));

        group.bench_with_input(BenchmarkId::new("parse", size), &size, |b, &size| {
            b.iter(|| parse_packed_grid(&packed, size, size).unwrap())
        });

        let depth = parse_packed_grid(&packed, size, size).unwrap();
        let contamination = depth.clone();
        group.bench_with_input(BenchmarkId::new("clean_water", size), &size, |b, _| {
            b.iter(|| clean_water(&depth, &contamination).unwrap())
        });
    }

    group.finish();
}

criterion_group!(grid_benches, bench_grid);
criterion_main!(grid_benches);
