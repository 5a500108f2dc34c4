use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use wordex_core::work_queue::{Spawner, WorkQueue, DEFAULT_THREADS};

#[test]
fn finish_waits_for_every_task() {
    let queue = WorkQueue::new(4).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..100 {
        let ran = Arc::clone(&ran);
        queue.execute(move || {
            thread::sleep(Duration::from_millis(1));
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }
    queue.finish();
    assert_eq!(ran.load(Ordering::SeqCst), 100);
    assert_eq!(queue.pending(), 0);
    queue.join();
}

fn fan_out(spawner: Spawner, depth: usize, ran: Arc<AtomicUsize>) {
    ran.fetch_add(1, Ordering::SeqCst);
    if depth == 0 {
        return;
    }
    for _ in 0..2 {
        let next = spawner.clone();
        let ran = Arc::clone(&ran);
        spawner.execute(move || fan_out(next, depth - 1, ran));
    }
}

#[test]
fn finish_covers_recursively_submitted_work() {
    let queue = WorkQueue::new(3).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    let spawner = queue.spawner();
    let counter = Arc::clone(&ran);
    queue.execute(move || fan_out(spawner, 6, counter));
    queue.finish();
    // a full binary tree of depth 6: 2^7 - 1 tasks, each run exactly once
    assert_eq!(ran.load(Ordering::SeqCst), 127);
    queue.join();
}

#[test]
fn queue_is_reusable_after_finish() {
    let queue = WorkQueue::new(2).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    for round in 1..=3 {
        for _ in 0..10 {
            let ran = Arc::clone(&ran);
            queue.execute(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        queue.finish();
        assert_eq!(ran.load(Ordering::SeqCst), round * 10);
    }
    assert_eq!(queue.size(), 2);
}

#[test]
fn panicking_task_does_not_break_the_pool() {
    let queue = WorkQueue::new(1).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    queue.execute(|| panic!("task failure"));
    for _ in 0..5 {
        let ran = Arc::clone(&ran);
        queue.execute(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }
    queue.finish();
    assert_eq!(ran.load(Ordering::SeqCst), 5);
    assert_eq!(queue.pending(), 0);
    assert_eq!(queue.size(), 1);
    queue.join();
}

#[test]
fn shutdown_abandons_queued_work_without_hanging_finish() {
    let queue = WorkQueue::new(1).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = std::sync::mpsc::channel();
    {
        let ran = Arc::clone(&ran);
        queue.execute(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }
    started_rx.recv().unwrap();
    for _ in 0..10 {
        let ran = Arc::clone(&ran);
        queue.execute(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }
    queue.shutdown();
    queue.finish();
    // the in-flight task completes, the queued ones never run
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(!queue.execute(|| {}));
    assert!(queue.is_shutdown());
}

#[test]
fn default_pool_size() {
    let queue = WorkQueue::with_default_threads().unwrap();
    assert_eq!(queue.size(), DEFAULT_THREADS);
    drop(queue);
}
