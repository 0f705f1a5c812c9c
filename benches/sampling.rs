//! Sampling benchmark: genuine/impostor pair draws over a framed pool.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use touch_sentinel::pairs::{PairSampler, SelfPairPolicy};
use touch_sentinel::session::{frame, Event, SessionKey, SessionPool};

fn make_pool(users: usize, sessions: usize) -> SessionPool {
    let mut pool = SessionPool::new();
    for u in 0..users {
        for s in 0..sessions {
            let events: Vec<Event> = (0..20)
                .map(|i| Event::new(vec![u as f32, s as f32, i as f32, 0.5, 0.0, 0.3]))
                .collect();
            pool.insert(
                SessionKey::new(format!("u{}", u), format!("s{}", s)),
                frame(&events, 50, 6).unwrap(),
            );
        }
    }
    pool
}

fn bench_sample_pairs(c: &mut Criterion) {
    let pool = make_pool(50, 8);
    let sampler = PairSampler::new(&pool, SelfPairPolicy::Disallow);

    let mut g = c.benchmark_group("sample_pairs");
    for draws in [100, 1000, 8000] {
        g.bench_function(format!("draws_{}", draws).as_str(), |b| {
            b.iter(|| black_box(sampler.sample_seeded(black_box(draws), 42)))
        });
    }
    g.finish();
}

fn bench_build_sampler(c: &mut Criterion) {
    let pool = make_pool(50, 8);

    c.bench_function("build_sampler_400_sessions", |b| {
        b.iter(|| black_box(PairSampler::new(&pool, SelfPairPolicy::Disallow).user_count()))
    });
}

criterion_group!(benches, bench_sample_pairs, bench_build_sampler);
criterion_main!(benches);
