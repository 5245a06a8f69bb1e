//! Many actors, many messages: shows stealing and spilling under load.
//!
//! Run with `cargo run --example flood`.

use spindle::prelude::*;
use spindle::ActorCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const ACTORS: usize = 1_000;
const MESSAGES_PER_ACTOR: usize = 100;

fn main() {
    env_logger::init();

    let config = Config::builder()
        .local_queue_limit(64)
        .build()
        .unwrap();
    let pool = Pool::start(config).unwrap();
    println!("pool started with {} workers", pool.workers());

    let actors: Vec<ActorRef> = (0..ACTORS)
        .map(|i| ActorCell::new(format!("actor-{i}")))
        .collect();
    let hits = Arc::new(AtomicUsize::new(0));
    let total = ACTORS * MESSAGES_PER_ACTOR;

    let start = Instant::now();
    for round in 0..MESSAGES_PER_ACTOR {
        for actor in &actors {
            let hits = hits.clone();
            pool.send(
                actor,
                Box::new(move || {
                    // A little fake work per message.
                    std::hint::black_box(round * 31);
                    hits.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }
    }

    while hits.load(Ordering::Relaxed) < total {
        std::thread::sleep(Duration::from_millis(1));
    }
    let elapsed = start.elapsed();

    let metrics = pool.metrics();
    println!(
        "{total} messages in {:.2?} ({:.0} msgs/sec)",
        elapsed,
        total as f64 / elapsed.as_secs_f64()
    );
    println!(
        "turns={} steals={} spills={} waits={} (local bound {})",
        metrics.turns, metrics.steals, metrics.spills, metrics.waits, metrics.local_queue_limit
    );
    println!("per-worker turns: {:?}", metrics.per_worker_turns);
}
