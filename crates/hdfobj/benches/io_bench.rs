//! Benchmarks for whole-dataset and slab I/O, atomic and flattened records.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hdfobj::{Container, File, Record, Slab};

const N: usize = 100_000;

#[derive(Debug, Clone, Copy, Record)]
struct Point {
    x: f64,
    y: f64,
    z: f64,
}

fn make_points() -> Vec<Point> {
    (0..N)
        .map(|i| {
            let v = i as f64;
            Point { x: v, y: v * 0.5, z: -v }
        })
        .collect()
}

fn bench_write_f64(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("write_f64.hob")).unwrap();
    let data: Vec<f64> = (0..N).map(|i| i as f64).collect();
    let ds = file.create_dataset::<f64, 1>("data", &Slab::new([N as u64])).unwrap();

    c.bench_function("write_100k_f64", |b| b.iter(|| ds.write(black_box(&data)).unwrap()));
}

fn bench_read_f64(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("read_f64.hob")).unwrap();
    let data: Vec<f64> = (0..N).map(|i| i as f64).collect();
    let ds = file.write_dataset("data", &data).unwrap();

    c.bench_function("read_100k_f64", |b| b.iter(|| ds.read::<f64>().unwrap()));
    c.bench_function("read_100k_f64_as_f32", |b| b.iter(|| ds.read::<f32>().unwrap()));
}

fn bench_points(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("points.hob")).unwrap();
    let points = make_points();
    let ds = file.write_dataset("points", &points).unwrap();

    c.bench_function("write_100k_points", |b| {
        b.iter(|| ds.write(black_box(&points)).unwrap())
    });
    c.bench_function("read_100k_points", |b| b.iter(|| ds.read::<Point>().unwrap()));
}

fn bench_slab(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("slab.hob")).unwrap();
    let extent = Slab::new([1000, 100]);
    let ds = file.create_dataset::<i32, 2>("grid", &extent).unwrap();
    let block = extent.select([250, 10], [500, 50]);

    c.bench_function("read_slab_500x50_of_1000x100", |b| {
        b.iter(|| ds.read_slab::<i32, 2>(black_box(&block)).unwrap())
    });
}

fn bench_create_and_reopen(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.hob");
    {
        let file = File::create(&path).unwrap();
        for i in 0..100 {
            file.write_dataset(&format!("group/ds_{i:03}"), &[i as f64; 10])
                .unwrap();
        }
    }

    c.bench_function("open_and_list_100_datasets", |b| {
        b.iter(|| {
            let file = File::open(&path).unwrap();
            file.open_group("group").unwrap().dataset_names().unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_write_f64,
    bench_read_f64,
    bench_points,
    bench_slab,
    bench_create_and_reopen,
);
criterion_main!(benches);
