use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::SeedableRng;

use pcload_datastore::{fixtures, Database, DatabaseConfig};
use pcload_stream::{stream_rows, Format};

fn seeded_database(dir: &std::path::Path, rows: usize) -> Database {
    let db = Database::open(DatabaseConfig::at_path(dir.join("bench.sqlite"))).unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let seeded = fixtures::random_source_rows(&mut rng, 1, rows, 200).collect::<Vec<_>>();
    db.insert_source_rows(&seeded).unwrap();
    db
}

pub fn benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming");
    for size in [100, 1_000, 10_000] {
        let tdir = tempfile::TempDir::new().expect("Should create");
        let db = seeded_database(tdir.path(), size);

        group.throughput(Throughput::Elements(size as u64));
        for format in [Format::Json, Format::Csv] {
            group.bench_with_input(BenchmarkId::new(format.to_string(), size), &format, |b, format| {
                let conn = db.acquire().unwrap();
                b.iter(|| stream_rows(&conn, std::io::sink(), *format, &Default::default()).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
