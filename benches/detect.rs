//! Benchmarks for format detection and document loading.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};
use tempfile::TempDir;

use folio::Doc;

#[path = "../tests/common/mod.rs"]
mod common;

fn bench_detection(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let epub = common::write_fixture(
        dir.path(),
        "bench.epub",
        &common::build_epub(
            "Enchiridion",
            "Epictetus",
            &[("ch1.xhtml", "<html><body><p>Of things some are in our power.</p></body></html>")],
        ),
    );
    let mobi = common::write_fixture(
        dir.path(),
        "bench.mobi",
        &common::build_mobi("Enchiridion", b"<p>Of things some are in our power.</p>", &[], &[]),
    );
    let fb2 = common::write_fixture(
        dir.path(),
        "bench.fb2",
        common::build_fb2("Enchiridion", "Epictetus").as_bytes(),
    );
    // Forces the full probe chain, both passes, before giving up
    let unknown = common::write_fixture(dir.path(), "bench.bin", &vec![0u8; 4096]);

    let mut group = c.benchmark_group("detect");
    for (name, path) in [
        ("epub", &epub),
        ("mobi", &mobi),
        ("fb2", &fb2),
        ("unknown", &unknown),
    ] {
        group.bench_function(name, |b| b.iter(|| Doc::detect(std::hint::black_box(path))));
    }
    group.finish();

    let mut group = c.benchmark_group("supported");
    group.bench_function("extension_only", |b| {
        b.iter(|| Doc::is_supported_file(std::hint::black_box(&epub), false))
    });
    group.bench_function("with_sniffing", |b| {
        b.iter(|| Doc::is_supported_file(std::hint::black_box(&unknown), true))
    });
    group.finish();
}

fn bench_loading(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let chapter = format!(
        "<html><body>{}</body></html>",
        "<p>Of things some are in our power, and others are not.</p>".repeat(200)
    );
    let epub = common::write_fixture(
        dir.path(),
        "bench.epub",
        &common::build_epub("Enchiridion", "Epictetus", &[("ch1.xhtml", &chapter)]),
    );
    let text = "<p>Of things some are in our power.</p>".repeat(200);
    let mobi = common::write_fixture(
        dir.path(),
        "bench.mobi",
        &common::build_mobi("Enchiridion", text.as_bytes(), &[], &[]),
    );

    let mut group = c.benchmark_group("create");
    group.bench_function("epub", |b| {
        b.iter(|| Doc::create_from_file(std::hint::black_box(&epub)))
    });
    group.bench_function("mobi", |b| {
        b.iter(|| Doc::create_from_file(std::hint::black_box(&mobi)))
    });
    group.finish();
}

criterion_group!(benches, bench_detection, bench_loading);
criterion_main!(benches);
