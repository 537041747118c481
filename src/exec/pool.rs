// src/exec/pool.rs

//! Concurrency limits shared by every task execution of a scheduler.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default cap on attempts executing at the same time.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Default cap on blocking bodies executing at the same time.
pub fn default_blocking_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Bounded worker pool.
///
/// - `in_flight` limits how many task attempts execute concurrently.
/// - `blocking` additionally limits how many of those are blocking bodies
///   occupying a thread of tokio's blocking pool.
///
/// Permits are taken per attempt, so a task waiting out its retry backoff
/// does not hold a slot. Blocking attempts take their `blocking` permit
/// before their `in_flight` one.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    in_flight: Arc<Semaphore>,
    blocking: Arc<Semaphore>,
}

impl WorkerPool {
    /// Both limits are clamped to at least one.
    pub fn new(max_in_flight: usize, blocking_workers: usize) -> Self {
        Self {
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
            blocking: Arc::new(Semaphore::new(blocking_workers.max(1))),
        }
    }

    /// Wait for an execution slot.
    ///
    /// Returns `None` only if the semaphore was closed, which this pool
    /// never does.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.in_flight.clone().acquire_owned().await.ok()
    }

    /// Wait for a blocking worker slot.
    pub async fn acquire_blocking(&self) -> Option<OwnedSemaphorePermit> {
        self.blocking.clone().acquire_owned().await.ok()
    }

    pub fn available(&self) -> usize {
        self.in_flight.available_permits()
    }

    pub fn available_blocking(&self) -> usize {
        self.blocking.available_permits()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT, default_blocking_workers())
    }
}
