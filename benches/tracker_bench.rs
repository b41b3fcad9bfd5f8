//! Benchmark suite for the mastery tracker
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pal_tutor::tutor::{BktParams, MasteryState, MasteryTracker, TrackerConfig};

fn bench_bkt_update(c: &mut Criterion) {
    let params = BktParams::default();
    c.bench_function("bkt::update", |b| {
        b.iter(|| pal_tutor::tutor::bkt::update(black_box(0.42), black_box(true), &params))
    });
}

fn bench_record_session(c: &mut Criterion) {
    let tracker = MasteryTracker::new(TrackerConfig::default()).unwrap();
    c.bench_function("MasteryTracker::record x20", |b| {
        b.iter(|| {
            let mut state = MasteryState::default();
            for i in 0..20 {
                state = tracker.record("loops", &state, i % 3 != 0).unwrap();
            }
            black_box(state)
        })
    });
}

criterion_group!(benches, bench_bkt_update, bench_record_session);
criterion_main!(benches);
