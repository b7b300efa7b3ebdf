use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tempfile::TempDir;

use scoped_settings::{
    FixedDocumentLocator, HostConfig, PluginSettings, RedbDocumentStore, ScopeStore,
};

fn harness(tmp: &TempDir) -> PluginSettings {
    let config = HostConfig::new(
        "com.example",
        "gridworks",
        tmp.path().join("system"),
        tmp.path().join("user"),
    )
    .unwrap();
    let doc_path = tmp.path().join("sample.doc");
    let documents = Arc::new(RedbDocumentStore::open(&doc_path).unwrap());
    let locator = Arc::new(FixedDocumentLocator::new(doc_path));
    PluginSettings::new("bench-plugin", config, locator, documents).unwrap()
}

fn bench_document_set(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let settings = harness(&tmp);
    let document = settings.document();

    c.bench_function("document_set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("bench:key:{}", i);
            document.set(black_box(&key), black_box(b"hello world")).unwrap();
            i += 1;
        });
    });
}

fn bench_document_get(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let settings = harness(&tmp);
    let document = settings.document();

    for i in 0..1000 {
        let key = format!("bench:key:{:04}", i);
        document.set(&key, b"hello world").unwrap();
    }

    c.bench_function("document_get", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("bench:key:{:04}", i % 1000);
            let _ = document.get(black_box(&key)).unwrap();
            i += 1;
        });
    });
}

fn bench_resolve_document_hit(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let settings = harness(&tmp);
    settings.document().set("verbosity", b"high").unwrap();

    c.bench_function("resolve_document_hit", |b| {
        b.iter(|| {
            let v = settings.resolve(black_box("verbosity")).unwrap();
            assert_eq!(v, b"high");
        });
    });
}

fn bench_resolve_system_fallback(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let settings = harness(&tmp);
    settings.system().set("verbosity", b"low").unwrap();

    c.bench_function("resolve_system_fallback", |b| {
        b.iter(|| {
            let v = settings.resolve(black_box("verbosity")).unwrap();
            assert_eq!(v, b"low");
        });
    });
}

criterion_group!(
    benches,
    bench_document_set,
    bench_document_get,
    bench_resolve_document_hit,
    bench_resolve_system_fallback
);
criterion_main!(benches);
