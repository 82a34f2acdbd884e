use thiserror::Error;

pub mod queue;

/// Error type for all primitives
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeirError {
    #[error("queue capacity must be greater than 0")]
    ZeroCapacity,
    #[error("Buffer full, cannot write until read")]
    Full,
    #[error("Nothing to read, buffer is empty")]
    Empty,
    #[error("Queue is closed, no further items accepted")]
    Closed,
    #[error("Blocking call was cancelled by its token")]
    Cancelled,
}
