use crate::executor::{Executor, MainLooper, PoolConfig, WorkerPool};
use crate::ExecutorError;
use crossbeam::channel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn default_pool_is_sized_from_cpus() {
    let cpus = thread::available_parallelism().map_or(1, |n| n.get());
    let config = PoolConfig::default();
    assert_eq!(config.threads, 2 * cpus + 1);
    assert_eq!(config.queue_capacity, 128);
}

#[test]
fn pool_runs_every_task() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = WorkerPool::with_config(PoolConfig {
            threads: 3,
            queue_capacity: 64,
        });
        assert_eq!(pool.threads(), 3);
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        // Dropping the pool drains the queue.
    }
    assert_eq!(counter.load(Ordering::SeqCst), 50);
}

#[test]
fn full_pool_rejects_tasks() {
    let pool = WorkerPool::with_config(PoolConfig {
        threads: 1,
        queue_capacity: 1,
    });
    let (started_tx, started_rx) = channel::bounded(0);
    let (release_tx, release_rx) = channel::bounded::<()>(0);

    // Occupy the only worker.
    pool.execute(Box::new(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    }))
    .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Fill the queue.
    pool.execute(Box::new(|| {})).unwrap();
    assert_eq!(pool.queued(), 1);

    assert_eq!(pool.execute(Box::new(|| {})), Err(ExecutorError::Rejected));

    drop(release_tx);
}

#[test]
fn main_looper_runs_tasks_on_its_own_thread() {
    let looper = MainLooper::new();
    let handle = looper.handle();
    let main_thread = thread::current().id();
    assert!(looper.is_main_thread());

    let (tx, rx) = channel::unbounded();
    let poster = thread::spawn(move || {
        assert!(!handle.is_main_thread());
        for i in 0..3 {
            let tx = tx.clone();
            handle
                .execute(Box::new(move || {
                    tx.send((i, thread::current().id())).unwrap();
                }))
                .unwrap();
        }
    });
    poster.join().unwrap();

    assert_eq!(looper.run_pending(), 3);
    let ran: Vec<_> = rx.try_iter().collect();
    assert_eq!(ran.len(), 3);
    for (i, (order, ran_on)) in ran.into_iter().enumerate() {
        assert_eq!(order, i);
        assert_eq!(ran_on, main_thread);
    }

    assert!(!looper.run_once(Duration::from_millis(10)));
}

#[test]
fn main_looper_waits_for_work() {
    let looper = MainLooper::new();
    let handle = looper.handle();
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    let poster = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle
            .execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
    });

    assert!(looper.run_once(Duration::from_secs(5)));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    poster.join().unwrap();
}

#[test]
fn handle_of_dropped_looper_is_shut_down() {
    let handle = MainLooper::new().handle();
    assert_eq!(handle.execute(Box::new(|| {})), Err(ExecutorError::Shutdown));
}
