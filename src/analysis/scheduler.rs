// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Debounced background recomputation and snapshot publication.
//!
//! [`DebouncedWorker`] is a depth-1 queue: every submission issues a new
//! generation, and any job holding an older generation stops at its next
//! cancellation check and never delivers. [`Published`] holds the current
//! result generation; readers clone the `Arc` and never see a partial value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const DEBOUNCE_SLICE: Duration = Duration::from_millis(10);

/// Lines processed between two cancellation checks.
pub const LINE_BATCH: usize = 256;

/// Handle a background job polls to learn whether it was superseded.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl CancellationToken {
    /// A token that is never cancelled, for synchronous callers.
    pub fn never() -> Self {
        Self {
            generation: 0,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.generation
    }

    /// True when a batch boundary is reached at `line` and the job was
    /// superseded.
    pub fn cancelled_at(&self, line: usize) -> bool {
        line % LINE_BATCH == 0 && self.is_cancelled()
    }
}

#[derive(Debug)]
pub struct TaskResult<T> {
    pub generation: u64,
    pub value: T,
    pub elapsed: Duration,
}

pub struct DebouncedWorker<T: Send + 'static> {
    name: &'static str,
    delay: Duration,
    latest: Arc<AtomicU64>,
    next_generation: u64,
    pending: Option<u64>,
    tx: Sender<TaskResult<T>>,
    rx: Receiver<TaskResult<T>>,
}

impl<T: Send + 'static> DebouncedWorker<T> {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            name,
            delay,
            latest: Arc::new(AtomicU64::new(0)),
            next_generation: 1,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace any queued or running job with `job`, started after the
    /// debounce delay. Returns the job's generation.
    pub fn submit<F>(&mut self, job: F) -> u64
    where
        F: FnOnce(&CancellationToken) -> Option<T> + Send + 'static,
    {
        let generation = self.issue_generation();
        self.pending = Some(generation);
        let token = CancellationToken {
            generation,
            latest: Arc::clone(&self.latest),
        };
        let tx = self.tx.clone();
        let delay = self.delay;
        let name = self.name;
        thread::spawn(move || {
            if !debounce(&token, delay) {
                return;
            }
            let started = Instant::now();
            let Some(value) = job(&token) else {
                debug!(worker = name, generation, "job cancelled");
                return;
            };
            if token.is_cancelled() {
                debug!(worker = name, generation, "dropping superseded result");
                return;
            }
            let _ = tx.send(TaskResult {
                generation,
                value,
                elapsed: started.elapsed(),
            });
        });
        generation
    }

    /// Cancel whatever is queued or running.
    pub fn cancel(&mut self) {
        self.issue_generation();
        self.pending = None;
    }

    /// The latest delivered result, if it belongs to the current generation.
    pub fn drain(&mut self) -> Option<TaskResult<T>> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(result) => {
                    if let Some(current) = self.accept(result) {
                        latest = Some(current);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Block until the current generation delivers or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Option<TaskResult<T>> {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(result) => {
                    if let Some(current) = self.accept(result) {
                        return Some(current);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    fn accept(&mut self, result: TaskResult<T>) -> Option<TaskResult<T>> {
        if Some(result.generation) != self.pending {
            return None;
        }
        self.pending = None;
        Some(result)
    }

    fn issue_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.saturating_add(1);
        self.latest.store(generation, Ordering::Release);
        generation
    }
}

impl<T: Send + 'static> Drop for DebouncedWorker<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

// Sleeps in slices so a superseded job exits without waiting the full delay.
fn debounce(token: &CancellationToken, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(DEBOUNCE_SLICE.min(deadline - now));
    }
}

/// Shared cell holding the current generation of a derived structure.
#[derive(Debug)]
pub struct Published<T> {
    cell: Arc<Mutex<Arc<T>>>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Published<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Arc::new(value))),
        }
    }

    pub fn load(&self) -> Arc<T> {
        let guard = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in `value`, returning the generation it replaced.
    pub fn store(&self, value: Arc<T>) -> Arc<T> {
        let mut guard = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, value)
    }
}
