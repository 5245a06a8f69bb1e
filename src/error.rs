//! Error types for the scheduler.

/// Result type alias for scheduler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving a pool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Pool lifecycle error
    #[error("pool error: {0}")]
    Pool(String),

    /// I/O error (thread spawn)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for future extensibility
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a pool error
    pub fn pool<S: Into<String>>(msg: S) -> Self {
        Error::Pool(msg.into())
    }
}
