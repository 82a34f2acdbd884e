//! Blocking bounded FIFO queue for multi-producer, multi-consumer scenarios.
//!
//! `BoundedQueue` is a classic monitor: one mutex guarding the buffer and
//! closed flag, paired with `not_full` / `not_empty` condition variables.
//! Producers park on a full buffer, consumers park on an empty one, and
//! `close` broadcasts to both sides so every waiter re-evaluates its own
//! termination condition. A `CancelToken` lets a caller abort a parked
//! `put` or `take` without touching the rest of the pipeline.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::WeirError;

#[derive(Debug)]
struct Inner<T> {
    buffer: VecDeque<T>,
    closed: bool,
}

/// A blocking bounded FIFO queue, safe for concurrent use by any number of
/// producers and consumers.
///
/// The buffer never holds more than `capacity` items; `put` on a full queue
/// blocks until a `take` frees a slot (backpressure) and `take` on an empty
/// queue blocks until an item arrives. `close` is one-way and idempotent:
/// after it, `put` fails with `WeirError::Closed`, while `take` drains the
/// remaining items in FIFO order and then reports end-of-stream as
/// `Ok(None)`. Callers share the queue through an `Arc`.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    /// Signalled when a slot frees up or the queue closes.
    not_full: Condvar,
    /// Signalled when an item arrives or the queue closes.
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates a new open queue. `capacity` must be > 0.
    pub fn new(capacity: usize) -> Result<Self, WeirError> {
        if capacity == 0 {
            return Err(WeirError::ZeroCapacity);
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                buffer: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        })
    }

    /// Appends `item` to the tail, blocking while the queue is full.
    ///
    /// Fails with `WeirError::Closed` if the queue is closed, including
    /// when `close` lands while this call is parked on a full buffer:
    /// closure always wins over a pending enqueue, so no item is ever
    /// added after the queue has closed.
    pub fn put(&self, item: T) -> Result<(), WeirError> {
        self.put_inner(item, None)
    }

    /// `put`, but also resolves with `WeirError::Cancelled` once `cancel`
    /// fires. The buffer is left untouched on cancellation.
    pub fn put_with(&self, item: T, cancel: &CancelToken<T>) -> Result<(), WeirError> {
        self.put_inner(item, Some(cancel))
    }

    fn put_inner(&self, item: T, cancel: Option<&CancelToken<T>>) -> Result<(), WeirError> {
        let mut inner = self.lock();
        loop {
            // Re-checked on every wake: a single notification is no proof
            // the predicate still holds once competing waiters ran.
            if inner.closed {
                return Err(WeirError::Closed);
            }
            if cancel.is_some_and(|token| token.is_cancelled()) {
                return Err(WeirError::Cancelled);
            }
            if inner.buffer.len() < self.capacity {
                inner.buffer.push_back(item);
                drop(inner);
                self.not_empty.notify_one();
                return Ok(());
            }
            inner = self.wait_not_full(inner);
        }
    }

    /// Removes and returns the head item, blocking while the queue is open
    /// and empty.
    ///
    /// Returns `Ok(None)` once the queue is closed and drained; that is the
    /// end-of-stream signal, not an error, and every subsequent call keeps
    /// returning it. Buffered items are always handed out before closure is
    /// reported.
    pub fn take(&self) -> Result<Option<T>, WeirError> {
        self.take_inner(None)
    }

    /// `take`, but also resolves with `WeirError::Cancelled` once `cancel`
    /// fires.
    pub fn take_with(&self, cancel: &CancelToken<T>) -> Result<Option<T>, WeirError> {
        self.take_inner(Some(cancel))
    }

    fn take_inner(&self, cancel: Option<&CancelToken<T>>) -> Result<Option<T>, WeirError> {
        let mut inner = self.lock();
        loop {
            if let Some(item) = inner.buffer.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Ok(Some(item));
            }
            if inner.closed {
                return Ok(None);
            }
            if cancel.is_some_and(|token| token.is_cancelled()) {
                return Err(WeirError::Cancelled);
            }
            inner = self.wait_not_empty(inner);
        }
    }

    /// Attempts to append `item` without blocking.
    ///
    /// Fails with `WeirError::Full` while the queue is open and at
    /// capacity, or `WeirError::Closed` after `close`.
    pub fn try_put(&self, item: T) -> Result<(), WeirError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(WeirError::Closed);
        }
        if inner.buffer.len() >= self.capacity {
            return Err(WeirError::Full);
        }
        inner.buffer.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Attempts to remove the head item without blocking.
    ///
    /// Fails with `WeirError::Empty` while the queue is open with nothing
    /// buffered; returns `Ok(None)` for end-of-stream once closed and
    /// drained.
    pub fn try_take(&self) -> Result<Option<T>, WeirError> {
        let mut inner = self.lock();
        if let Some(item) = inner.buffer.pop_front() {
            drop(inner);
            self.not_full.notify_one();
            return Ok(Some(item));
        }
        if inner.closed {
            return Ok(None);
        }
        Err(WeirError::Empty)
    }

    /// Closes the queue and wakes every parked producer and consumer.
    ///
    /// Idempotent; the transition is one-way. Waiters are released by
    /// broadcast on both conditions so each re-checks its own predicate
    /// rather than assuming the wakeup was meant for someone else.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Registers a cancellation handle for blocking calls on this queue.
    ///
    /// Clones of the returned token share one flag; firing any of them
    /// releases every `put_with`/`take_with` call that was handed one.
    pub fn cancel_token(self: &Arc<Self>) -> CancelToken<T> {
        CancelToken {
            queue: Arc::clone(self),
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Maximum number of items the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently buffered. A point-in-time snapshot, always
    /// within `0..=capacity`.
    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Whether the buffer currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer is currently at capacity.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    // Poisoning is recovered rather than propagated: a panicking caller
    // must not wedge every other producer and consumer. The wait loops
    // re-establish the invariants on wake regardless.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_not_full<'a>(&self, guard: MutexGuard<'a, Inner<T>>) -> MutexGuard<'a, Inner<T>> {
        match self.not_full.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_not_empty<'a>(&self, guard: MutexGuard<'a, Inner<T>>) -> MutexGuard<'a, Inner<T>> {
        match self.not_empty.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A handle for cancelling blocked `put_with`/`take_with` calls.
///
/// Minted by `BoundedQueue::cancel_token` and tied to that queue. Cloning
/// shares the underlying flag, so one clone can park in a blocking call
/// while another fires the cancellation from a different thread.
#[derive(Debug)]
pub struct CancelToken<T> {
    queue: Arc<BoundedQueue<T>>,
    flag: Arc<AtomicBool>,
}

impl<T> Clone for CancelToken<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            flag: Arc::clone(&self.flag),
        }
    }
}

impl<T> CancelToken<T> {
    /// Fires the token and wakes every parked call on the queue.
    ///
    /// The flag is flipped while holding the queue lock; a waiter that
    /// checked the flag but has not parked yet still holds that lock, so
    /// the wakeup cannot be missed. Idempotent.
    pub fn cancel(&self) {
        let guard = self.queue.lock();
        self.flag.store(true, Release);
        drop(guard);
        self.queue.not_full.notify_all();
        self.queue.not_empty.notify_all();
    }

    /// Whether `cancel` has been called on this token or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Acquire)
    }
}
