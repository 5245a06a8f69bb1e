use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use spindle::prelude::*;
use spindle::ActorCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn drain(pool: &Pool, actors: &[ActorRef], messages: usize) {
    let hits = Arc::new(AtomicUsize::new(0));
    let total = actors.len() * messages;

    for actor in actors {
        for _ in 0..messages {
            let hits = hits.clone();
            pool.send(
                actor,
                Box::new(move || {
                    hits.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }
    }

    while hits.load(Ordering::Relaxed) < total {
        std::hint::spin_loop();
    }
}

fn bench_send_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_and_drain");

    for workers in [1usize, 2, 4] {
        let config = Config::builder().workers(workers).build().unwrap();
        let pool = Pool::start(config).unwrap();
        let actors: Vec<ActorRef> = (0..32).map(|i| ActorCell::new(format!("b{i}"))).collect();

        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, _| {
                b.iter(|| drain(&pool, &actors, 32));
            },
        );

        drop(pool);
    }

    group.finish();
}

fn bench_single_actor_backlog(c: &mut Criterion) {
    let config = Config::builder().workers(2).build().unwrap();
    let pool = Pool::start(config).unwrap();
    let actor = [ActorCell::new("backlog")];

    c.bench_function("single_actor_backlog", |b| {
        b.iter(|| drain(&pool, &actor, 1_000));
    });

    drop(pool);
}

criterion_group!(benches, bench_send_and_drain, bench_single_actor_backlog);
criterion_main!(benches);
