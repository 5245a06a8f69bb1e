use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: Option<usize>,

    /// Local-queue length at which an owner push is redirected to the
    /// global queue instead.
    pub local_queue_limit: usize,

    /// Every this-many poll attempts a worker checks the global queue
    /// before its own, so externally submitted work cannot be starved by
    /// a self-feeding local queue. Must not divide into lockstep with the
    /// worker count; anything comfortably larger than it works.
    pub global_poll_stride: u32,

    /// Upper bound on mailbox messages drained in one actor turn.
    pub turn_budget: usize,

    /// Failed polls a worker burns on yielding before it arms the waiter.
    pub park_yield_rounds: u32,

    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: None,
            local_queue_limit: 256,
            global_poll_stride: 51,
            turn_budget: 16,
            park_yield_rounds: 4,
            thread_name_prefix: "spindle-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.workers {
            if n == 0 {
                return Err(Error::config("workers must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("workers too large (max 1024)"));
            }
        }

        if self.local_queue_limit == 0 {
            return Err(Error::config("local_queue_limit must be > 0"));
        }

        if self.global_poll_stride < 2 {
            return Err(Error::config("global_poll_stride must be >= 2"));
        }

        if self.turn_budget == 0 {
            return Err(Error::config("turn_budget must be > 0"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = Some(n);
        self
    }

    pub fn local_queue_limit(mut self, limit: usize) -> Self {
        self.config.local_queue_limit = limit;
        self
    }

    pub fn global_poll_stride(mut self, stride: u32) -> Self {
        self.config.global_poll_stride = stride;
        self
    }

    pub fn turn_budget(mut self, budget: usize) -> Self {
        self.config.turn_budget = budget;
        self
    }

    pub fn park_yield_rounds(mut self, rounds: u32) -> Self {
        self.config.park_yield_rounds = rounds;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
