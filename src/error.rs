//! Unified error type.

use thiserror::Error;

/// The error type returned by the crate's startup and serving operations.
///
/// Request-level failures (bad input, database errors) become HTTP
/// [`Response`](crate::Response) values instead. This type surfaces what
/// stops a service from running at all: an address that cannot be bound or
/// a configuration that cannot be used.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),
}
