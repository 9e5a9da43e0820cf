//! Benchmarks for the JSON exchange format

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use macro_recorder::session::exchange;
use macro_recorder::{Event, EventLog, KeyRepr, MouseButton};

/// Build a log that cycles through every event kind
fn generate_log(count: usize) -> EventLog {
    let events = (0..count)
        .map(|i| {
            let time = i as f64 * 0.01;
            let pos = (i % 1920) as i32;
            match i % 5 {
                0 => Event::pointer_move(time, pos, pos / 2),
                1 => Event::pointer_button(time, pos, pos / 2, MouseButton::Left, i % 2 == 0),
                2 => Event::pointer_scroll(time, pos, pos / 2, 0, -1),
                3 => Event::key(time, KeyRepr::Char('a'), true),
                _ => Event::key(time, KeyRepr::Symbol("Key.shift".to_string()), false),
            }
        })
        .collect();
    EventLog::from_events(chrono::Local::now().naive_local(), events)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_encode");

    for size in [100, 1_000, 10_000] {
        let log = generate_log(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &log, |b, log| {
            b.iter(|| exchange::to_json(black_box(log)))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_decode");

    for size in [100, 1_000, 10_000] {
        let json = exchange::to_json(&generate_log(size)).unwrap_or_default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &json, |b, json| {
            b.iter(|| exchange::from_json(black_box(json)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
