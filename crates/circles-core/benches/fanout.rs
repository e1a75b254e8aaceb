//! Relay fan-out benchmarks.

use circles_core::{compose_circle, ConnectionId, Initials, Relay};
use circles_protocol::{Event, Frame};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");
    let initials = Initials::parse("AB").unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    for clients in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, &n| {
            let relay = Relay::new();
            let ids: Vec<ConnectionId> = (0..n)
                .map(|i| ConnectionId::new(format!("conn-{i}")))
                .collect();
            let mut receivers: Vec<_> = ids.iter().map(|id| relay.join(id).unwrap()).collect();

            b.iter(|| {
                let event = Event::add_circle(compose_circle(&initials, 10, 20, &mut rng));
                let frame = Frame::from_event(&event).unwrap();
                relay.broadcast(black_box(&ids[0]), frame);
                for rx in &mut receivers {
                    let _ = rx.try_recv();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fanout);
criterion_main!(benches);
