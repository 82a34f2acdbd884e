//! Blocking bounded queues for producer-consumer pipelines.
//!
//! The `bounded` submodule contains `BoundedQueue`, a multi-producer,
//! multi-consumer FIFO with a fixed capacity. Producers block when the
//! buffer is full (backpressure), consumers block when it is empty, and a
//! one-way `close` releases every waiter so pipelines can shut down
//! without losing buffered work.
pub mod bounded;

pub use bounded::{BoundedQueue, CancelToken};
