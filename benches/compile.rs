use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

use mediaset::{
    compile, compile_json, BreakpointSet, Configuration, Descriptor, FeatureObject, FeatureValue,
    InMemoryProvider, ManualScheduler, MediaSetObserver, ObserverConfig, Scheduler,
};

fn wide_descriptor() -> Descriptor {
    Descriptor::any_of(vec![
        Descriptor::features(
            FeatureObject::new()
                .with("type", "not screen")
                .with("orientation", "landscape")
                .with("scan", "progressive")
                .with("color", true)
                .with("width", "593..896")
                .with("height", FeatureValue::range(300, FeatureValue::Null))
                .with("minResolution", "2dppx"),
        ),
        Descriptor::query("print"),
        Descriptor::features(FeatureObject::new().with("deviceAspectRatio", "16/9..")),
    ])
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Elements(1));

    let descriptor = wide_descriptor();
    group.bench_function("descriptor", |b| {
        b.iter(|| compile(black_box(&descriptor)).unwrap());
    });

    let value = json!([
        {"type": "screen", "width": "..592"},
        {"type": "screen", "width": "593..896", "color": true},
        "tv"
    ]);
    group.bench_function("json", |b| {
        b.iter(|| compile_json(black_box(&value)).unwrap());
    });

    group.finish();
}

fn bench_observer(c: &mut Criterion) {
    let mut group = c.benchmark_group("observer");

    // 64 width bands of 20px each.
    let config: Configuration = (0..64u32)
        .map(|i| {
            let range = format!("{}..{}", i * 20, i * 20 + 19);
            (format!("band{i}"), Descriptor::features(FeatureObject::new().with("width", range)))
        })
        .collect();

    group.bench_function("initialize_64", |b| {
        b.iter(|| {
            let provider = Arc::new(InMemoryProvider::new());
            let scheduler: Arc<dyn Scheduler> = Arc::new(ManualScheduler::new());
            let observer = MediaSetObserver::new(
                config.clone(),
                Some(provider),
                scheduler,
                ObserverConfig::default(),
                |_: &BreakpointSet| {},
            )
            .unwrap();
            black_box(observer.initialize().unwrap());
        });
    });

    group.bench_function("burst_then_settle", |b| {
        let provider = Arc::new(InMemoryProvider::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let observer = MediaSetObserver::new(
            config.clone(),
            Some(Arc::clone(&provider)),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            ObserverConfig::default(),
            |_: &BreakpointSet| {},
        )
        .unwrap();
        observer.initialize().unwrap();

        let mut on = false;
        b.iter(|| {
            on = !on;
            for i in 0..8u32 {
                let query = format!("(min-width: {}px) and (max-width: {}px)", i * 20, i * 20 + 19);
                provider.set_matches(&query, on);
            }
            scheduler.advance(Duration::from_millis(50));
            black_box(observer.current());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_observer);
criterion_main!(benches);
