//! Background decode scheduler.
//!
//! A fixed pool of worker threads pulls jobs from one shared priority
//! queue. Producers push with priority equal to the requesting tile's LOD
//! level, so coarse ancestor loads run before fine descendant loads. The
//! selection loop clears the queue once per frame; last frame's pending
//! requests are superseded by the fresh selection.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::FxHashSet;
use selene_cubesphere::TileAddress;

type Work = Box<dyn FnOnce() + Send>;

struct Job {
    /// LOD level of the requesting tile; higher (coarser) runs first.
    priority: u8,
    /// Submission order, for FIFO among equal priorities.
    seq: Reverse<u64>,
    address: TileAddress,
    work: Work,
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

struct Queue {
    heap: BinaryHeap<Job>,
    /// Addresses queued but not yet picked up, for duplicate suppression.
    pending: FxHashSet<TileAddress>,
    next_seq: u64,
}

/// Fixed worker pool with a clearable priority queue.
///
/// Jobs already running when [`TaskPool::clear`] is called run to
/// completion; only not-yet-started jobs are discarded. Dropping the pool
/// stops the workers after their current job and joins them.
pub struct TaskPool {
    queue: Arc<Mutex<Queue>>,
    /// One ticket per submitted job wakes one worker.
    tickets: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

fn lock_queue(queue: &Mutex<Queue>) -> MutexGuard<'_, Queue> {
    match queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl TaskPool {
    /// Spawn a pool with `thread_count` workers (at least one).
    #[must_use]
    pub fn new(thread_count: usize) -> Self {
        let queue = Arc::new(Mutex::new(Queue {
            heap: BinaryHeap::new(),
            pending: FxHashSet::default(),
            next_seq: 0,
        }));
        let (tickets, ticket_rx): (Sender<()>, Receiver<()>) = unbounded();

        let workers = (0..thread_count.max(1))
            .map(|_| {
                let queue = Arc::clone(&queue);
                let ticket_rx = ticket_rx.clone();
                std::thread::Builder::new()
                    .name("tile-decode-worker".into())
                    .spawn(move || {
                        while ticket_rx.recv().is_ok() {
                            // The ticket may outlive its job if the queue was
                            // cleared; an empty pop is not an error.
                            let job = {
                                let mut state = lock_queue(&queue);
                                let job = state.heap.pop();
                                if let Some(job) = &job {
                                    state.pending.remove(&job.address);
                                }
                                job
                            };
                            if let Some(job) = job {
                                (job.work)();
                            }
                        }
                    })
                    .unwrap_or_else(|e| panic!("failed to spawn decode worker: {e}"))
            })
            .collect();

        Self {
            queue,
            tickets: Some(tickets),
            workers,
        }
    }

    /// Spawn a pool sized from the CPU count, leaving headroom for the main
    /// thread and renderer.
    #[must_use]
    pub fn with_default_threads() -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new((cpus - 2).max(1))
    }

    /// Queue a job, unless one for the same address is already queued.
    ///
    /// Returns true if the job was enqueued.
    pub fn submit(
        &self,
        address: TileAddress,
        priority: u8,
        work: impl FnOnce() + Send + 'static,
    ) -> bool {
        {
            let mut state = lock_queue(&self.queue);
            if !state.pending.insert(address) {
                return false;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.heap.push(Job {
                priority,
                seq: Reverse(seq),
                address,
                work: Box::new(work),
            });
        }
        if let Some(tickets) = &self.tickets {
            // Workers only exit once the sender is dropped, so this cannot
            // disconnect while the pool is alive.
            let _ = tickets.send(());
        }
        true
    }

    /// Discard every job not yet picked up by a worker.
    pub fn clear(&self) {
        let mut state = lock_queue(&self.queue);
        state.heap.clear();
        state.pending.clear();
    }

    /// Number of jobs queued and not yet started.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_queue(&self.queue).pending.len()
    }

    /// Whether no jobs are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a job for `address` is queued and not yet started.
    #[must_use]
    pub fn is_pending(&self, address: &TileAddress) -> bool {
        lock_queue(&self.queue).pending.contains(address)
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.clear();
        // Disconnecting the ticket channel wakes every idle worker.
        self.tickets = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("tile decode worker panicked");
            }
        }
    }
}
