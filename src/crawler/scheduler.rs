//! Request pacing and worker-pool limits
//!
//! This module handles:
//! - The global rate limit shared by every worker of one fetcher
//! - The bound on how many URLs are processed at once

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Global throttle handing out request start slots
///
/// Slots are spaced `interval` apart no matter how many workers ask for them,
/// so the limit bounds the aggregate request rate rather than each worker's.
/// Completing a request also pushes the next slot to at least `interval` after
/// the completion, which gives every finished fetch its mandatory pause.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter; a zero interval disables pacing
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until the caller may start its next request
    pub async fn until_ready(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        if slot > Instant::now() {
            tracing::trace!("Rate limit: waiting {:?}", slot - Instant::now());
        }
        tokio::time::sleep_until(slot).await;
    }

    /// Records that a request finished, delaying the next slot accordingly
    pub async fn complete(&self) {
        if self.interval.is_zero() {
            return;
        }

        let earliest = Instant::now() + self.interval;
        let mut next = self.next_slot.lock().await;
        match *next {
            Some(reserved) if reserved >= earliest => {}
            _ => *next = Some(earliest),
        }
    }
}

/// Bounded pool of worker slots
///
/// A size of zero means unbounded: `acquire` returns immediately.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
    semaphore: Option<Arc<Semaphore>>,
}

/// A held worker slot; dropping it frees the slot
pub struct WorkerSlot {
    _permit: Option<OwnedSemaphorePermit>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let semaphore = if size == 0 {
            None
        } else {
            Some(Arc::new(Semaphore::new(size)))
        };
        Self { size, semaphore }
    }

    /// Pool size, or `None` when unbounded
    pub fn size(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.size)
    }

    /// Waits for a free slot
    pub async fn acquire(&self) -> WorkerSlot {
        let permit = match &self.semaphore {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };
        WorkerSlot { _permit: permit }
    }
}
