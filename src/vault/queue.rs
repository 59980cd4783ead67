//! Background indexing queue: one worker thread, cooperative drain.
//!
//! The UI thread never scans a vault directly; it enqueues jobs here and
//! later installs finished results via the VaultManager. Enqueue order is
//! preserved, and a vault already waiting in the queue is not enqueued a
//! second time. The pending mark is cleared when the worker dequeues the
//! job, so an enqueue arriving during an ongoing scan schedules exactly one
//! more pass.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::graph::KnowledgeGraph;
use crate::indexer::Indexer;
use crate::models::VaultIndex;

/// How long `shutdown` waits for queued jobs before dropping them.
pub const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_secs(5);

/// A finished scan, handed back to the UI thread for installation.
#[derive(Debug)]
pub struct ScanOutcome {
    pub vault: String,
    pub index: VaultIndex,
    pub graph: KnowledgeGraph,
    pub skipped: usize,
}

#[derive(Debug)]
struct ScanJob {
    vault: String,
    root: PathBuf,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<ScanJob>,
    pending: HashSet<String>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    cond: Condvar,
}

/// Handle owned by the VaultManager; dropping it shuts the worker down.
pub struct IndexingQueue {
    shared: Arc<Shared>,
    results: Receiver<ScanOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl IndexingQueue {
    /// Start the background worker.
    pub fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = channel();
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("vault-indexer".to_string())
            .spawn(move || worker_loop(worker_shared, tx))
            .expect("failed to spawn indexing worker");
        Self {
            shared,
            results: rx,
            worker: Some(worker),
        }
    }

    /// Schedule a scan of `root` for the named vault.
    ///
    /// Returns true when a new job was queued, false when it coalesced into
    /// a job already waiting for the same vault.
    pub fn enqueue(&self, vault: &str, root: PathBuf) -> bool {
        let mut state = self.shared.state.lock().expect("indexing queue poisoned");
        if state.shutdown {
            warn!(vault, "indexing queue is shut down, dropping scan request");
            return false;
        }
        if !state.pending.insert(vault.to_string()) {
            debug!(vault, "scan already queued, coalescing");
            return false;
        }
        state.jobs.push_back(ScanJob {
            vault: vault.to_string(),
            root,
        });
        self.shared.cond.notify_one();
        true
    }

    /// Non-blocking: collect every finished scan currently available.
    pub fn poll_outcomes(&self) -> Vec<ScanOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.results.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Block for up to `timeout` for one finished scan.
    pub fn wait_outcome(&self, timeout: Duration) -> Option<ScanOutcome> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Number of jobs waiting (not counting one the worker is running).
    pub fn queued_len(&self) -> usize {
        self.shared
            .state
            .lock()
            .expect("indexing queue poisoned")
            .jobs
            .len()
    }

    /// Stop the worker: wait up to `drain` for the queue to empty, then
    /// drop the remainder and join. An in-flight scan completes; there is
    /// no mid-scan cancellation.
    pub fn shutdown(&mut self, drain: Duration) {
        let deadline = Instant::now() + drain;
        {
            let mut state = self.shared.state.lock().expect("indexing queue poisoned");
            state.shutdown = true; // stop intake immediately
            while !state.jobs.is_empty() && Instant::now() < deadline {
                let wait = deadline.saturating_duration_since(Instant::now());
                let (next, _) = self
                    .shared
                    .cond
                    .wait_timeout(state, wait)
                    .expect("indexing queue poisoned");
                state = next;
            }
            let dropped = state.jobs.len();
            if dropped > 0 {
                warn!(dropped, "drain window elapsed, dropping queued scans");
                state.jobs.clear();
                state.pending.clear();
            }
        }
        self.shared.cond.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for IndexingQueue {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown(DEFAULT_DRAIN_WINDOW);
        }
    }
}

fn worker_loop(shared: Arc<Shared>, results: Sender<ScanOutcome>) {
    let indexer = Indexer::new();
    loop {
        let job = {
            let mut state = shared.state.lock().expect("indexing queue poisoned");
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    // Clearing the pending mark here (not after the scan)
                    // lets a mutation arriving mid-scan schedule one more
                    // pass over the final tree state.
                    state.pending.remove(&job.vault);
                    break Some(job);
                }
                if state.shutdown {
                    break None;
                }
                state = shared
                    .cond
                    .wait(state)
                    .expect("indexing queue poisoned");
            }
        };
        let Some(job) = job else {
            shared.cond.notify_all(); // wake a draining shutdown
            return;
        };

        debug!(vault = %job.vault, root = %job.root.display(), "scanning vault");
        match indexer.scan(&job.root) {
            Ok(report) => {
                let outcome = ScanOutcome {
                    vault: job.vault,
                    index: report.index,
                    graph: report.graph,
                    skipped: report.skipped,
                };
                if results.send(outcome).is_err() {
                    return; // receiver gone, manager dropped
                }
            }
            Err(err) => {
                warn!(vault = %job.vault, error = %err, "vault scan failed");
            }
        }
        shared.cond.notify_all(); // progress for a draining shutdown
    }
}
