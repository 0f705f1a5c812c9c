//! Pipeline benchmark: NDJSON feed → sessions → framed pool.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Cursor;
use touch_sentinel::config::FramingConfig;
use touch_sentinel::session::{frame, frame_pool, parse_feed, Event, SessionFramer};

fn make_feed(users: usize, sessions: usize, events: usize) -> String {
    let mut out = String::new();
    for u in 0..users {
        for s in 0..sessions {
            for e in 0..events {
                out.push_str(&format!(
                    "{{\"user_id\":\"u{}\",\"session_id\":{},\"X\":{},\"Y\":{},\"Pressure\":0.5,\"Duration\":{},\"Orientation\":0,\"Size\":0.4}}\n",
                    u,
                    s,
                    e * 3,
                    400 - e,
                    100 + e
                ));
            }
        }
    }
    out
}

fn bench_frame_session(c: &mut Criterion) {
    let events: Vec<Event> = (0..80)
        .map(|i| Event::new(vec![i as f32, 1.0, 0.5, 90.0, 0.0, 0.3]))
        .collect();

    c.bench_function("frame_80_events_to_50x6", |b| {
        b.iter(|| frame(black_box(&events), 50, 6).unwrap())
    });
}

fn bench_parse_feed(c: &mut Criterion) {
    let config = FramingConfig::default();
    let feed = make_feed(10, 5, 40);

    c.bench_function("parse_feed_2000_events", |b| {
        b.iter(|| parse_feed(Cursor::new(black_box(feed.as_bytes())), &config).unwrap())
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let config = FramingConfig::default();
    let framer = SessionFramer::new(&config);
    let feed = make_feed(10, 5, 40);

    c.bench_function("full_pipeline_feed_to_pool", |b| {
        b.iter(|| {
            let sessions = parse_feed(Cursor::new(feed.as_bytes()), &config).unwrap();
            black_box(frame_pool(&framer, &sessions).unwrap())
        })
    });
}

criterion_group!(benches, bench_frame_session, bench_parse_feed, bench_full_pipeline);
criterion_main!(benches);
