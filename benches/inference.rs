//! Inference benchmark: framed session → embedding, and probe verification against a reference.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use touch_sentinel::config::FramingConfig;
use touch_sentinel::model::{Architecture, EmbeddingNetwork};
use touch_sentinel::session::{Event, SessionFramer};
use touch_sentinel::verify::Verifier;

fn make_events(n: usize, offset: f32) -> Vec<Event> {
    (0..n)
        .map(|i| {
            let t = i as f32 + offset;
            Event::new(vec![t * 3.0, 400.0 - t, 0.5, 100.0 + t, 0.0, 0.4])
        })
        .collect()
}

fn bench_embed_default_arch(c: &mut Criterion) {
    let framer = SessionFramer::new(&FramingConfig::default());
    let framed = framer.frame_events(&make_events(50, 0.0)).unwrap();
    let net = EmbeddingNetwork::seeded(Architecture::new(6, 64, 64), 1);

    c.bench_function("embed_50x6_h64", |b| b.iter(|| net.embed(black_box(&framed)).unwrap()));
}

fn bench_embed_by_units(c: &mut Criterion) {
    let framer = SessionFramer::new(&FramingConfig::default());
    let framed = framer.frame_events(&make_events(50, 0.0)).unwrap();

    let mut g = c.benchmark_group("embed_by_units");
    for h in [16, 32, 64, 128] {
        let net = EmbeddingNetwork::seeded(Architecture::new(6, h, 64), 1);
        g.bench_function(format!("h_{}", h).as_str(), |b| {
            b.iter(|| net.embed(black_box(&framed)).unwrap())
        });
    }
    g.finish();
}

fn bench_verify(c: &mut Criterion) {
    let framer = SessionFramer::new(&FramingConfig::default());
    let reference = framer.frame_events(&make_events(40, 0.0)).unwrap();
    let probe = make_events(35, 2.0);
    let net = Arc::new(EmbeddingNetwork::seeded(Architecture::new(6, 64, 64), 1));
    let verifier = Verifier::new(net, framer).unwrap();

    c.bench_function("verify_probe_vs_reference", |b| {
        b.iter(|| verifier.verify(black_box(&reference), black_box(&probe)).unwrap())
    });
}

criterion_group!(benches, bench_embed_default_arch, bench_embed_by_units, bench_verify);
criterion_main!(benches);
