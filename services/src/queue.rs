//! Slot queue bounding how many participations are re-evaluated at once.
//!
//! Jobs beyond the concurrency limit park on a [`Notify`] and are woken in
//! FIFO order as running jobs release their slot.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

pub struct WorkerQueue {
    max_concurrent: usize,
    running: usize,
    waiting: VecDeque<Arc<Notify>>,
}

impl WorkerQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            running: 0,
            waiting: VecDeque::new(),
        }
    }

    /// Claims a slot if one is free; otherwise returns the handle the caller
    /// must await before starting its work.
    fn try_acquire_slot(&mut self) -> Option<Arc<Notify>> {
        if self.running < self.max_concurrent {
            self.running += 1;
            None
        } else {
            let notify = Arc::new(Notify::new());
            self.waiting.push_back(notify.clone());
            Some(notify)
        }
    }

    /// Frees a slot and hands it to the longest-waiting job, if any.
    fn release_slot(&mut self) {
        self.running = self.running.saturating_sub(1);

        if let Some(next) = self.waiting.pop_front() {
            self.running += 1;
            next.notify_one();
        }
    }
}

/// Waits for a slot on the shared queue. The matching [`release`] call must
/// run after the job finishes, also on error paths.
pub async fn acquire(queue: &Mutex<WorkerQueue>) {
    let pending = { queue.lock().await.try_acquire_slot() };
    if let Some(notify) = pending {
        notify.notified().await;
    }
}

pub async fn release(queue: &Mutex<WorkerQueue>) {
    queue.lock().await.release_slot();
}
