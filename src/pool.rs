//! Fixed-size worker pool with a bounded job queue.
//!
//! Producers block when the queue is full; that backpressure is the only
//! admission control the server has. Workers take jobs in FIFO order and
//! never hold the queue lock while running one. Shutdown latches a stop
//! flag, wakes everyone, and joins every worker.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use nix::sys::signal::{SigSet, Signal};

/// A unit of work: a callable owning everything it needs. Invoking it
/// consumes the argument, so nothing is left to release afterwards.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Error returned when a job is offered to a pool that has begun shutdown.
#[derive(Debug, PartialEq, Eq)]
pub struct PoolClosed;

impl fmt::Display for PoolClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("worker pool is shut down")
    }
}

impl std::error::Error for PoolClosed {}

struct JobQueue {
    jobs: VecDeque<Job>,
    capacity: usize,
    // Latches true once; never cleared.
    stopped: bool,
}

struct PoolShared {
    queue: Mutex<JobQueue>,
    work_available: Condvar,
    space_available: Condvar,
}

/// A fixed set of worker threads fed from a shared bounded FIFO queue.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers.len())
            .finish()
    }
}

/// The signals reserved for the acceptor; everything else keeps them masked.
pub(crate) fn termination_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set
}

impl ThreadPool {
    /// Creates a pool of `num_threads` workers.
    ///
    /// A count of zero is normalized to one. The queue holds up to
    /// `num_threads²` pending jobs, so a momentary burst is absorbed before
    /// producers start blocking.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let capacity = num_threads * num_threads;

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(JobQueue {
                jobs: VecDeque::with_capacity(capacity),
                capacity,
                stopped: false,
            }),
            work_available: Condvar::new(),
            space_available: Condvar::new(),
        });

        let workers = (0..num_threads)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("worker-{i}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        ThreadPool { shared, workers }
    }

    /// Number of worker threads in the pool.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Maximum number of jobs the queue holds before producers block.
    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.lock().unwrap().capacity
    }

    /// Enqueues a job, blocking while the queue is at capacity.
    ///
    /// Jobs submitted in order by one thread are started in that order.
    /// Fails only once shutdown has begun; the rejected job is dropped.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolClosed>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock().unwrap();
        while queue.jobs.len() >= queue.capacity && !queue.stopped {
            queue = self.shared.space_available.wait(queue).unwrap();
        }
        if queue.stopped {
            return Err(PoolClosed);
        }

        queue.jobs.push_back(Box::new(job));
        self.shared.work_available.notify_all();
        Ok(())
    }

    /// Stops the pool: discards jobs still queued, wakes every waiter and
    /// joins all workers. Jobs already running finish first.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        {
            let mut queue = self.shared.queue.lock().unwrap();
            // Queued-but-unstarted jobs are dropped here; callers that care
            // must drain before shutting down.
            queue.jobs.clear();
            queue.stopped = true;
        }
        self.shared.work_available.notify_all();
        self.shared.space_available.notify_all();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop_and_join();
        }
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    // Termination signals belong to the acceptor; a worker must never be
    // the thread that observes them.
    let _ = termination_signals().thread_block();

    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if queue.stopped {
                    return;
                }
                if let Some(job) = queue.jobs.pop_front() {
                    shared.space_available.notify_one();
                    break job;
                }
                queue = shared.work_available.wait(queue).unwrap();
            }
        };

        // Lock released; run the job outside the critical section.
        job();
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::ThreadPool;

    #[test]
    fn zero_workers_is_normalized_to_one() {
        let pool = ThreadPool::new(0);
        assert_eq!(1, pool.thread_count());
        assert_eq!(1, pool.queue_capacity());
        pool.shutdown();
    }

    #[test]
    fn queue_capacity_is_square_of_worker_count() {
        let pool = ThreadPool::new(4);
        assert_eq!(4, pool.thread_count());
        assert_eq!(16, pool.queue_capacity());
        pool.shutdown();
    }

    #[test]
    fn every_job_runs_exactly_once() {
        let workers = 4;
        let producers = 4;
        let jobs_per_producer = 10 * workers * workers;

        let pool = Arc::new(ThreadPool::new(workers));
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..producers)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..jobs_per_producer {
                        let counter = Arc::clone(&counter);
                        pool.execute(move || {
                            counter.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        Arc::try_unwrap(pool).unwrap().shutdown();

        assert_eq!(producers * jobs_per_producer, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn jobs_start_in_submission_order() {
        let pool = ThreadPool::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..32 {
            let order = Arc::clone(&order);
            pool.execute(move || {
                order.lock().unwrap().push(i);
            })
            .unwrap();
        }
        pool.shutdown();

        let order = order.lock().unwrap();
        assert_eq!((0..32).collect::<Vec<_>>(), *order);
    }

    #[test]
    fn producer_blocks_while_queue_is_full() {
        // One worker, capacity one: occupy the worker, fill the queue, and
        // the next submission must wait for a slot.
        let pool = Arc::new(ThreadPool::new(1));
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (running_tx, running_rx) = mpsc::channel::<()>();

        pool.execute(move || {
            running_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
        // Worker is busy before the queue fills.
        running_rx.recv().unwrap();
        pool.execute(|| {}).unwrap();

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let blocked_pool = Arc::clone(&pool);
        let producer = thread::spawn(move || {
            blocked_pool.execute(|| {}).unwrap();
            done_tx.send(()).unwrap();
        });

        // The producer must still be parked on the full queue.
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

        release_tx.send(()).unwrap();
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("producer never unblocked");
        producer.join().unwrap();

        Arc::try_unwrap(pool).unwrap().shutdown();
    }

    #[test]
    fn shutdown_waits_for_running_jobs() {
        let pool = ThreadPool::new(2);
        let finished = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel::<()>();

        for _ in 0..2 {
            let finished = Arc::clone(&finished);
            let started_tx = started_tx.clone();
            pool.execute(move || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(50));
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        // Both jobs are in flight before shutdown discards the queue.
        started_rx.recv().unwrap();
        started_rx.recv().unwrap();
        pool.shutdown();

        assert_eq!(2, finished.load(Ordering::SeqCst));
    }
}
