//! Splits bulk work across a bounded set of threads.
//!
//! `run` blocks its caller until every chunk is done, so bulk operations
//! are started from a coordinator thread (see [`WorkScheduler::spawn`])
//! and the GUI thread never waits on them.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{error, info};

/// Default cap on concurrently running background threads.
pub const DEFAULT_MAX_THREADS: usize = 32;

/// Items per chunk when `len` items are split across `slots` threads.
pub fn chunk_size(len: usize, slots: usize) -> usize {
    len.div_ceil(slots.max(1)).max(1)
}

/// Splits `items` into at most `slots` contiguous chunks.
pub fn chunk<T>(items: &[T], slots: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(chunk_size(items.len(), slots))
}

/// Decrements the live-thread counter when a thread finishes, even on panic.
struct LiveGuard<'a>(&'a AtomicUsize);

impl<'a> LiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct WorkScheduler {
    max_threads: usize,
    /// Background threads currently alive (workers and coordinators).
    live: AtomicUsize,
    /// Serializes bulk runs.
    work_lock: Mutex<()>,
}

impl WorkScheduler {
    pub fn new(max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            live: AtomicUsize::new(0),
            work_lock: Mutex::new(()),
        }
    }

    /// Background threads currently running.
    pub fn live_threads(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Worker slots available right now; never less than one.
    pub fn available(&self) -> usize {
        self.max_threads.saturating_sub(self.live_threads()).max(1)
    }

    /// Runs `worker` over chunks of `items` on scoped threads and joins
    /// them all before returning. Chunks carry no ordering guarantee
    /// relative to each other.
    pub fn run<T, F>(&self, name: &str, items: &[T], worker: F)
    where
        T: Sync,
        F: Fn(&[T]) + Sync,
    {
        let _serial = self.work_lock.lock();
        let start = Instant::now();
        let slots = self.available();
        info!(
            "starting {} jobs using {} threads to split {} work items",
            name,
            slots,
            items.len()
        );
        if items.is_empty() {
            return;
        }

        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for part in chunk(items, slots) {
                let worker = &worker;
                let live = &self.live;
                let spawned = std::thread::Builder::new()
                    .name(name.to_string())
                    .spawn_scoped(scope, move || {
                        let _live = LiveGuard::enter(live);
                        worker(part);
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        error!("Failed to start {} worker: {}", name, e);
                        // Run the chunk inline rather than drop it.
                        worker(part);
                    }
                }
            }
            for handle in handles {
                if handle.join().is_err() {
                    error!("{} worker panicked", name);
                }
            }
        });

        info!("done {}. {:.2} secs", name, start.elapsed().as_secs_f64());
    }

    /// Starts a named background thread counted against the cap.
    pub fn spawn<F>(self: &Arc<Self>, name: &str, f: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let this = Arc::clone(self);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _live = LiveGuard::enter(&this.live);
                f();
            })
    }
}

impl Default for WorkScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THREADS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_chunk_size() {
        assert_eq!(chunk_size(10, 3), 4);
        assert_eq!(chunk_size(2, 32), 1);
        assert_eq!(chunk_size(0, 4), 1);
        assert_eq!(chunk_size(5, 0), 5);
    }

    #[test]
    fn test_run_visits_every_item() {
        let scheduler = WorkScheduler::new(4);
        let sum = AtomicUsize::new(0);
        let items: Vec<usize> = (1..=100).collect();
        scheduler.run("sum", &items, |part| {
            let s: usize = part.iter().sum();
            sum.fetch_add(s, Ordering::SeqCst);
        });
        assert_eq!(sum.load(Ordering::SeqCst), 5050);
        assert_eq!(scheduler.live_threads(), 0);
    }

    #[test]
    fn test_run_empty_is_noop() {
        let scheduler = WorkScheduler::default();
        let calls = AtomicUsize::new(0);
        scheduler.run("none", &[] as &[u8], |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_spawn_counts_live_threads() {
        let scheduler = Arc::new(WorkScheduler::new(8));
        let (tx, rx) = std::sync::mpsc::channel();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        let handle = scheduler
            .spawn("coordinator", move || {
                tx.send(()).unwrap();
                done_rx.recv().unwrap();
            })
            .unwrap();
        rx.recv().unwrap();
        assert_eq!(scheduler.live_threads(), 1);
        assert_eq!(scheduler.available(), 7);
        done_tx.send(()).unwrap();
        handle.join().unwrap();
        assert_eq!(scheduler.live_threads(), 0);
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_and_are_disjoint(
            items in proptest::collection::vec(any::<u32>(), 0..500),
            slots in 1usize..64,
        ) {
            let chunks: Vec<&[u32]> = chunk(&items, slots).collect();
            prop_assert!(chunks.len() <= slots);
            prop_assert!(chunks.iter().all(|c| !c.is_empty()));
            let joined: Vec<u32> = chunks.concat();
            prop_assert_eq!(joined, items);
        }
    }
}
