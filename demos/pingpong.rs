//! Two actors batting a message back and forth.
//!
//! Run with `cargo run --example pingpong`.

use spindle::prelude::*;
use spindle::ActorCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const RALLIES: usize = 100_000;

fn volley(
    pool: Arc<Pool>,
    me: ActorRef,
    peer: ActorRef,
    count: Arc<AtomicUsize>,
    done: crossbeam_channel::Sender<()>,
) -> Message {
    Box::new(move || {
        let n = count.fetch_add(1, Ordering::Relaxed) + 1;
        if n >= RALLIES {
            let _ = done.send(());
            return;
        }
        // The reply swaps the roles.
        let msg = volley(pool.clone(), peer.clone(), me.clone(), count.clone(), done.clone());
        pool.send(&peer, msg);
    })
}

fn main() {
    env_logger::init();

    let config = Config::builder().workers(2).build().unwrap();
    let pool = Arc::new(Pool::start(config).unwrap());

    let ping = ActorCell::new("ping");
    let pong = ActorCell::new("pong");
    let count = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);

    let serve = volley(
        pool.clone(),
        ping.clone(),
        pong.clone(),
        count.clone(),
        done_tx,
    );
    let start = std::time::Instant::now();
    pool.send(&ping, serve);

    done_rx.recv().expect("rally never finished");
    let elapsed = start.elapsed();

    let metrics = pool.metrics();
    println!(
        "{} rallies in {:.2?} ({:.0} msgs/sec)",
        count.load(Ordering::Relaxed),
        elapsed,
        count.load(Ordering::Relaxed) as f64 / elapsed.as_secs_f64()
    );
    println!(
        "turns={} steals={} spills={} p99_turn={}ns",
        metrics.turns, metrics.steals, metrics.spills, metrics.p99_turn_ns
    );
}
