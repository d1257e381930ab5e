//! Worker pool for classifying SYNs on several threads.
//!
//! Detection keeps no state between packets, so frames are spread round-robin.
//! Every worker builds its own detector from the shared database; the pipeline
//! clones share one rate limit window and one set of metrics.

use crate::db::Database;
use crate::error::P0fSynError;
use crate::output::SynEvent;
use crate::process::SynPipeline;
use crate::syn_process::LinkType;
use crate::SynAnalyzer;
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tracing::debug;

/// Result of packet dispatch to worker queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// Packet successfully queued for processing
    Queued,
    /// Packet dropped (queue full or pool shutdown)
    Dropped,
}

/// Statistics for a single worker.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub id: usize,
    /// Frames waiting in the worker queue
    pub queue_size: usize,
    /// Frames dropped because this worker's queue was full
    pub dropped: u64,
}

impl std::fmt::Display for WorkerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Worker {}: queue_size={}, dropped={}",
            self.id, self.queue_size, self.dropped
        )
    }
}

/// Statistics for the entire worker pool.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_dispatched: u64,
    pub total_dropped: u64,
    pub workers: Vec<WorkerStats>,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "SYN Pool Stats - packets dispatched: {}, packets dropped: {}",
            self.total_dispatched, self.total_dropped
        )?;
        for worker in &self.workers {
            writeln!(f, "  {worker}")?;
        }
        Ok(())
    }
}

/// Worker pool for parallel SYN classification with round-robin dispatch.
pub struct WorkerPool {
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    packet_senders: Mutex<Vec<Sender<Vec<u8>>>>,
    result_sender: Arc<Mutex<Option<mpsc::Sender<SynEvent>>>>,
    pub num_workers: NonZeroUsize,
    next_worker: AtomicUsize,
    dispatched_count: AtomicU64,
    dropped_count: AtomicU64,
    worker_dropped: Vec<AtomicU64>,
}

impl WorkerPool {
    /// Creates a new worker pool.
    ///
    /// # Parameters
    /// - `num_workers`: Number of worker threads
    /// - `queue_size`: Size of each worker's frame queue
    /// - `link`: Link layer of the frames that will be dispatched
    /// - `result_sender`: Channel receiving classified SYNs
    /// - `database`: Signature database shared by every worker
    /// - `pipeline`: Filtering and accounting, cloned into each worker
    ///
    /// # Errors
    /// Returns error if `num_workers` or `queue_size` is 0, or thread creation fails.
    pub fn new(
        num_workers: usize,
        queue_size: usize,
        link: LinkType,
        result_sender: mpsc::Sender<SynEvent>,
        database: Arc<Database>,
        pipeline: SynPipeline,
    ) -> Result<Self, P0fSynError> {
        let num_workers = NonZeroUsize::new(num_workers).ok_or(
            P0fSynError::Misconfiguration("Worker count must be greater than 0".to_string()),
        )?;
        if queue_size == 0 {
            return Err(P0fSynError::Misconfiguration(
                "Queue size must be greater than 0".to_string(),
            ));
        }

        let mut workers = Vec::new();
        let mut packet_senders = Vec::new();
        let mut worker_dropped = Vec::new();

        let result_sender = Arc::new(Mutex::new(Some(result_sender)));

        for worker_id in 0..num_workers.get() {
            let (tx, rx) = bounded::<Vec<u8>>(queue_size);
            packet_senders.push(tx);
            worker_dropped.push(AtomicU64::new(0));

            let result_sender = Arc::clone(&result_sender);
            let database = Arc::clone(&database);
            let pipeline = pipeline.clone();

            let handle = thread::Builder::new()
                .name(format!("syn-worker-{worker_id}"))
                .spawn(move || {
                    Self::worker_loop(worker_id, rx, link, result_sender, database, pipeline);
                })
                .map_err(|e| {
                    P0fSynError::Misconfiguration(format!("Failed to spawn worker thread: {e}"))
                })?;

            workers.push(handle);
        }

        Ok(Self {
            workers: Mutex::new(workers),
            packet_senders: Mutex::new(packet_senders),
            result_sender,
            num_workers,
            next_worker: AtomicUsize::new(0),
            dispatched_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            worker_dropped,
        })
    }

    fn worker_loop(
        worker_id: usize,
        rx: Receiver<Vec<u8>>,
        link: LinkType,
        result_sender: Arc<Mutex<Option<mpsc::Sender<SynEvent>>>>,
        database: Arc<Database>,
        pipeline: SynPipeline,
    ) {
        let analyzer = SynAnalyzer::new(database.as_ref(), pipeline);

        while let Ok(packet) = rx.recv() {
            match analyzer.process_frame(&packet, link) {
                Ok(Some(event)) => {
                    let Ok(guard) = result_sender.lock() else {
                        break;
                    };
                    match guard.as_ref() {
                        Some(sender) => {
                            if sender.send(event).is_err() {
                                // Receiver dropped
                                break;
                            }
                        }
                        // Pool is shutting down
                        None => break,
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Error processing packet: {e}");
                }
            }
        }

        debug!("SYN worker {worker_id} exiting");
    }

    /// Queues a frame on the next worker in turn. Never blocks.
    pub fn dispatch(&self, packet: Vec<u8>) -> DispatchResult {
        let Ok(senders) = self.packet_senders.lock() else {
            return DispatchResult::Dropped;
        };
        if senders.is_empty() {
            return DispatchResult::Dropped;
        }

        let worker_id = self.next_worker.fetch_add(1, Ordering::Relaxed) % senders.len();
        let Some(sender) = senders.get(worker_id) else {
            return DispatchResult::Dropped;
        };

        match sender.try_send(packet) {
            Ok(()) => {
                self.dispatched_count.fetch_add(1, Ordering::Relaxed);
                DispatchResult::Queued
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped_count.fetch_add(1, Ordering::Relaxed);
                if let Some(counter) = self.worker_dropped.get(worker_id) {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                DispatchResult::Dropped
            }
        }
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        let mut workers = Vec::new();

        if let Ok(senders) = self.packet_senders.lock() {
            for (id, sender) in senders.iter().enumerate() {
                workers.push(WorkerStats {
                    id,
                    queue_size: sender.len(),
                    dropped: self
                        .worker_dropped
                        .get(id)
                        .map_or(0, |counter| counter.load(Ordering::Relaxed)),
                });
            }
        }

        PoolStats {
            total_dispatched: self.dispatched_count.load(Ordering::Relaxed),
            total_dropped: self.dropped_count.load(Ordering::Relaxed),
            workers,
        }
    }

    /// Stops accepting frames. Workers finish the frames already queued and exit.
    pub fn shutdown(&self) {
        if let Ok(mut senders) = self.packet_senders.lock() {
            senders.clear();
        }
    }

    /// Shuts down and waits for every worker, then releases the result channel.
    pub fn join(&self) {
        self.shutdown();

        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if handle.join().is_err() {
                debug!("SYN worker panicked");
            }
        }

        if let Ok(mut sender) = self.result_sender.lock() {
            *sender = None;
        }
    }
}
