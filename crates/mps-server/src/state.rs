// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The process-wide singleton (§5): exactly the three pieces of shared
//! mutable state the core needs — a termination flag, a thread-count
//! counter (threaded mode only), and a registry of live worker handles for
//! the signal path to observe. Recast from the original's global mutable
//! pointers into an interior-mutability singleton, installed once via
//! `OnceLock`, per the "global mutable pointers for signal-driven cleanup"
//! REDESIGN FLAG.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, Weak};

/// A worker's identity as the signal path and supervisor see it: nothing
/// more than "is this worker still meant to be serving". Workers register a
/// handle at startup and the registry only ever holds weak references, so a
/// worker that's already torn down is invisible to cleanup without needing
/// an explicit deregister call on every exit path (including panics).
pub struct WorkerHandle {
    pub active: AtomicBool,
}

impl WorkerHandle {
    pub fn new() -> WorkerHandle {
        WorkerHandle {
            active: AtomicBool::new(true),
        }
    }
}

impl Default for WorkerHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Shared {
    pub termination_requested: AtomicBool,
    pub workers: Mutex<Vec<Weak<WorkerHandle>>>,
    pub thread_count: AtomicUsize,
}

impl Shared {
    fn new() -> Shared {
        Shared {
            termination_requested: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            thread_count: AtomicUsize::new(0),
        }
    }

    pub fn termination_requested(&self) -> bool {
        self.termination_requested.load(Ordering::SeqCst)
    }

    pub fn request_termination(&self) {
        self.termination_requested.store(true, Ordering::SeqCst);
    }

    pub fn register_worker(&self, handle: &std::sync::Arc<WorkerHandle>) {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        workers.push(std::sync::Arc::downgrade(handle));
    }

    /// Drops dead weak references and returns the count of workers still
    /// alive, the quantity invariant 3 ("live workers never exceed
    /// children × max(1, threads)") is checked against.
    pub fn live_worker_count(&self) -> usize {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        workers.retain(|w| w.strong_count() > 0);
        workers.len()
    }
}

static SHARED: OnceLock<Shared> = OnceLock::new();

/// Installs (on first call) and returns the process singleton. Safe to call
/// from any thread or after a fork — each forked child gets its own address
/// space and re-initializes lazily on first access.
pub fn shared() -> &'static Shared {
    SHARED.get_or_init(Shared::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn live_worker_count_drops_dead_handles() {
        let shared = Shared::new();
        let handle = Arc::new(WorkerHandle::new());
        shared.register_worker(&handle);
        assert_eq!(shared.live_worker_count(), 1);
        drop(handle);
        assert_eq!(shared.live_worker_count(), 0);
    }

    #[test]
    fn termination_flag_round_trips() {
        let shared = Shared::new();
        assert!(!shared.termination_requested());
        shared.request_termination();
        assert!(shared.termination_requested());
    }
}
