//! Criterion microbenchmarks for path resolution.
//!
//! Run with:
//!   cargo bench -p shelf-fs
//!
//! HTML reports are written to `target/criterion/`.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use shelf_fs::{StorageRoot, resolve};
use std::fs;

fn bench_resolve(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let deep = tmp.path().join("a/b/c/d/e");
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("object.bin"), b"payload").unwrap();
    std::os::unix::fs::symlink(tmp.path().join("a/b"), tmp.path().join("shortcut")).unwrap();
    let root = StorageRoot::open(tmp.path()).unwrap();

    let mut group = c.benchmark_group("resolve");
    for request in [
        "a/b/c/d/e/object.bin",
        "shortcut/c/d/e/object.bin",
        "a/b/../../../../../etc/passwd",
        "missing/object.bin",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(request), request, |b, request| {
            b.iter(|| resolve(black_box(&root), black_box(request)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
