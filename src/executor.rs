//! Where calls run: a bounded worker pool for blocking work and a
//! main-thread looper for work that must stay on one thread.

use crate::error::ExecutorError;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::fmt;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs tasks, now or later, on some thread.
pub trait Executor {
    /// Queues `task`, or returns why it was not accepted.
    fn execute(&self, task: Task) -> Result<(), ExecutorError>;
}

/// Default capacity of the worker pool queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Sizing of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads, at least one.
    pub threads: usize,
    /// Tasks that may wait for a free worker.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    /// `2 × CPU + 1` threads and a queue of [`DEFAULT_QUEUE_CAPACITY`].
    fn default() -> Self {
        let cpus = thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            threads: 2 * cpus + 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A fixed set of worker threads fed from a bounded queue.
///
/// When the queue is full, new tasks are rejected rather than blocking the
/// caller. Dropping the pool lets the workers drain the queue and joins them.
pub struct WorkerPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    config: PoolConfig,
}

impl WorkerPool {
    /// A pool sized by [`PoolConfig::default`].
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Spawns the workers described by `config`.
    pub fn with_config(config: PoolConfig) -> Self {
        let threads = config.threads.max(1);
        let (sender, receiver) = channel::bounded::<Task>(config.queue_capacity);

        let workers = (0..threads)
            .filter_map(|index| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("app-worker-{index}"))
                    .spawn(move || worker_loop(receiver))
                    .map_err(|e| log::error!("failed to spawn worker {index}: {e}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        log::debug!(
            "started worker pool with {} threads, queue capacity {}",
            workers.len(),
            config.queue_capacity
        );

        Self {
            sender: Some(sender),
            workers,
            config,
        }
    }

    /// The configuration the pool was created with.
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of worker threads actually running.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        let sender = self.sender.as_ref().ok_or(ExecutorError::Shutdown)?;
        sender.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => ExecutorError::Rejected,
            TrySendError::Disconnected(_) => ExecutorError::Shutdown,
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue ends each worker once it is drained.
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("a worker thread panicked");
            }
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.workers.len())
            .field("queue_capacity", &self.config.queue_capacity)
            .field("queued", &self.queued())
            .finish()
    }
}

fn worker_loop(receiver: Receiver<Task>) {
    for task in receiver.iter() {
        task();
    }
}

/// A queue of tasks run by the thread that created it.
///
/// Other threads post through a [`MainHandle`]; the owning thread runs
/// the posted tasks with [`run_pending`](MainLooper::run_pending) or
/// [`run_once`](MainLooper::run_once).
pub struct MainLooper {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    thread: ThreadId,
}

impl MainLooper {
    /// A looper owned by the calling thread.
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            thread: thread::current().id(),
        }
    }

    /// A handle that posts tasks to this looper from any thread.
    pub fn handle(&self) -> MainHandle {
        MainHandle {
            sender: self.sender.clone(),
            thread: self.thread,
        }
    }

    /// Runs every task queued so far. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one task and runs it. Returns whether a
    /// task ran.
    pub fn run_once(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }

    /// Whether the caller is the thread that owns this looper.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.thread
    }
}

impl Default for MainLooper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MainLooper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLooper")
            .field("thread", &self.thread)
            .field("queued", &self.receiver.len())
            .finish()
    }
}

/// Posts tasks to a [`MainLooper`].
#[derive(Clone)]
pub struct MainHandle {
    sender: Sender<Task>,
    thread: ThreadId,
}

impl MainHandle {
    /// Whether the caller is running on the looper's thread.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.thread
    }
}

impl Executor for MainHandle {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        self.sender
            .send(task)
            .map_err(|_| ExecutorError::Shutdown)
    }
}

impl fmt::Debug for MainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainHandle")
            .field("thread", &self.thread)
            .finish()
    }
}
