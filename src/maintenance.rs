//! The periodic maintenance loop: stabilize, fix fingers, check predecessor.
//!
//! Generalized from the teacher's [`Stabilization`]-style struct, which
//! owned a routing table behind an `Arc<Mutex<_>>` and ran on its own
//! cadence. Here the three operations are already methods on [`Node`]
//! itself (they need no extra state of their own), so this module is just
//! the scheduling loop around them: one background thread ticking the
//! three calls in order, at a configurable interval, stopping when told.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::node::Node;

/// A background thread that periodically runs `stabilize`, `fix_fingers`,
/// and `check_predecessor` on a [`Node`], in that order, until stopped.
pub struct MaintenanceLoop {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MaintenanceLoop {
    /// Spawns the loop, ticking every `interval_ms` milliseconds.
    pub fn start(node: Arc<Node>, interval_ms: u64) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while loop_running.load(Ordering::SeqCst) {
                // The scheduler's own panic boundary: a tick must never
                // take the whole node down, even if a step inside a given
                // operation misbehaves unexpectedly.
                let result = catch_unwind(AssertUnwindSafe(|| {
                    node.stabilize();
                    node.fix_fingers();
                    node.check_predecessor();
                }));
                if result.is_err() {
                    warn!("maintenance tick panicked; continuing on the next interval");
                }
                thread::sleep(Duration::from_millis(interval_ms));
            }
        });

        MaintenanceLoop {
            running,
            handle: Some(handle),
        }
    }

    /// Signals the loop to stop and joins its thread. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MaintenanceLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
