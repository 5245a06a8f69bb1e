use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::actor::{ActorRef, Message, Unit};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::turn::{MailboxExecutor, TurnExecutor};
use crate::executor::worker::Worker;
use crate::queue::{GlobalQueue, LocalQueue, Waiter};
use crate::telemetry::debug::DebugTracker;
use crate::telemetry::metrics::{Metrics, MetricsSnapshot};

/// Pool state every worker and every producer can reach. One instance per
/// pool; nothing here is process-global, so several pools coexist.
pub(crate) struct Shared {
    pub global: GlobalQueue,
    pub waiter: Waiter,
    pub metrics: Metrics,
    pub debug: DebugTracker,
    pub executor: Arc<dyn TurnExecutor>,
    pub global_poll_stride: u32,
    pub turn_budget: usize,
}

impl Shared {
    pub fn new(config: &Config, executor: Arc<dyn TurnExecutor>) -> Self {
        let workers = config.worker_threads();
        Self {
            global: GlobalQueue::new(),
            waiter: Waiter::new(workers, config.park_yield_rounds),
            metrics: Metrics::new(workers, config.local_queue_limit),
            debug: DebugTracker::new(workers),
            executor,
            global_poll_stride: config.global_poll_stride,
            turn_budget: config.turn_budget,
        }
    }
}

struct WorkerHandle {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

/// A running scheduler: N worker threads over N local queues, one global
/// queue, and one waiter.
pub struct Pool {
    shared: Arc<Shared>,
    handles: Vec<WorkerHandle>,
    workers: usize,
    stopped: bool,
}

impl Pool {
    /// Start a pool with the stock [`MailboxExecutor`].
    pub fn start(config: Config) -> Result<Self> {
        Self::start_with_executor(config, Arc::new(MailboxExecutor::default()))
    }

    /// Start a pool that hands every dequeued actor to `executor`.
    pub fn start_with_executor(config: Config, executor: Arc<dyn TurnExecutor>) -> Result<Self> {
        config.validate()?;
        let workers = config.worker_threads();

        let shared = Arc::new(Shared::new(&config, executor));

        // All local queues and stealer handles must exist before the
        // first worker thread runs: workers steal from each other from
        // the very first poll.
        let locals: Vec<LocalQueue> = (0..workers)
            .map(|_| LocalQueue::new(config.local_queue_limit))
            .collect();
        let stealers: Vec<_> = locals.iter().map(LocalQueue::stealer).collect();

        let mut handles = Vec::with_capacity(workers);
        for (id, local) in locals.into_iter().enumerate() {
            let worker = Worker::new(id, local, stealers.clone(), shared.clone());
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let thread = builder
                .spawn(move || worker.run())
                .map_err(|e| Error::pool(format!("spawn failed: {e}")))?;

            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        log::info!("pool started with {workers} workers");

        Ok(Self {
            shared,
            handles,
            workers,
            stopped: false,
        })
    }

    /// Hand an actor to the pool from any thread. The handle goes through
    /// the global queue and one idle worker is woken. Returns false if
    /// the cell was already scheduled or running.
    pub fn submit(&self, actor: ActorRef) -> bool {
        if !actor.try_enqueue() {
            return false;
        }
        self.shared.global.push(Unit::Actor(actor));
        self.shared.waiter.notify();
        true
    }

    /// Deliver a message to an actor's mailbox and schedule the actor if
    /// it is not already in flight.
    pub fn send(&self, actor: &ActorRef, msg: Message) {
        actor.mailbox().push(msg);
        if actor.try_enqueue() {
            self.shared.global.push(Unit::Actor(actor.clone()));
            self.shared.waiter.notify();
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Actor names currently being run, indexed by worker.
    pub fn activity(&self) -> Vec<Option<String>> {
        self.shared.debug.snapshot()
    }

    /// Stop every worker and join the threads. One stop unit is injected
    /// per worker -- a worker exits the moment it pops one, so each
    /// consumes at most one and all of them terminate. Work still queued
    /// when the stop units land may or may not run; whatever remains is
    /// dropped without executing. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        log::debug!("stopping {} workers", self.workers);
        for _ in 0..self.workers {
            self.shared.global.push(Unit::Stop);
            self.shared.waiter.notify();
        }

        for handle in &mut self.handles {
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    log::error!("worker {} exited with a panic", handle.id);
                }
            }
        }
        log::debug!("all workers stopped");
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("workers", &self.workers)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_start_and_stop() {
        let config = Config::builder().workers(2).build().unwrap();
        let mut pool = Pool::start(config).unwrap();
        assert_eq!(pool.workers(), 2);
        pool.stop();
        pool.stop(); // idempotent
    }

    #[test]
    fn test_send_runs_message() {
        let config = Config::builder().workers(2).build().unwrap();
        let mut pool = Pool::start(config).unwrap();

        let actor = ActorCell::new("echo");
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        pool.send(
            &actor,
            Box::new(move || {
                hits2.fetch_add(1, Ordering::Relaxed);
            }),
        );

        // Workers are asynchronous; give the turn a moment.
        for _ in 0..200 {
            if hits.load(Ordering::Relaxed) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        pool.stop();
    }

    #[test]
    fn test_submit_refuses_inflight_cell() {
        let config = Config::builder().workers(1).build().unwrap();
        let mut pool = Pool::start(config).unwrap();

        let actor = ActorCell::new("busy");
        // Keep the cell away from Idle long enough to observe the
        // refusal: the first submission wins the enqueue race, the
        // second must not double-queue the same cell.
        actor
            .mailbox()
            .push(Box::new(|| std::thread::sleep(Duration::from_millis(300))));
        assert!(pool.submit(actor.clone()));
        assert!(!pool.submit(actor));

        pool.stop();
    }

    #[test]
    fn test_drop_stops_workers() {
        let config = Config::builder().workers(4).build().unwrap();
        let pool = Pool::start(config).unwrap();
        drop(pool); // must not hang
    }
}
