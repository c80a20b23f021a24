// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

// Runs against the std-thread scheduler provided by nsched's host-test
// feature.
use nsched as _;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use nerrno::KError;
use nsync::{Mutex, RawMutex};

fn may_interrupt() {
    // simulate interrupts
    if fastrand::u8(0..3) == 0 {
        thread::yield_now();
    }
}

#[test]
fn mutex_basic() {
    let m = Mutex::new(0);
    *m.lock() = 42;
    assert_eq!(*m.lock(), 42);
}

#[test]
fn mutex_try_lock() {
    let m = Mutex::new(0);

    let g1 = m.try_lock();
    assert!(g1.is_some());

    // A second attempt must come from another thread: a repeat from the
    // holder is a usage error, not contention.
    thread::scope(|s| {
        s.spawn(|| {
            assert!(m.try_lock().is_none());
        });
    });

    drop(g1);

    let g3 = m.try_lock();
    assert!(g3.is_some());
}

#[test]
fn raw_accounting_follows_acquire_release() {
    let m = Arc::new(RawMutex::new());

    assert_eq!(m.count(), 0);
    assert!(!m.is_held());

    m.acquire(None).unwrap();
    assert_eq!(m.count(), 1);
    assert!(m.is_held());

    let m2 = m.clone();
    let waiter = thread::spawn(move || {
        m2.acquire(None).unwrap();
        m2.release();
    });

    // One holder plus one waiter.
    while m.count() != 2 {
        thread::yield_now();
    }

    m.release();
    waiter.join().unwrap();

    assert_eq!(m.count(), 0);
    assert!(!m.is_held());
    m.destroy();
}

#[test]
fn holder_is_recorded_per_thread() {
    let m = Arc::new(RawMutex::new());

    m.acquire(None).unwrap();
    let me = m.holder();
    assert_ne!(me, 0);

    let m2 = m.clone();
    let t = thread::spawn(move || {
        m2.acquire(None).unwrap();
        let other = m2.holder();
        m2.release();
        other
    });

    // The waiter can only record itself after we release.
    thread::sleep(Duration::from_millis(10));
    assert_eq!(m.holder(), me);
    m.release();

    let other = t.join().unwrap();
    assert_ne!(other, 0);
    assert_ne!(other, me);
    assert_eq!(m.holder(), 0);
    m.destroy();
}

#[test]
#[should_panic(expected = "already owns")]
fn recursive_acquire_panics() {
    let m = RawMutex::new();
    m.acquire(None).unwrap();
    let _ = m.acquire(None);
}

#[test]
#[should_panic(expected = "doesn't own")]
fn release_by_non_holder_panics() {
    let m = Arc::new(RawMutex::new());
    let m2 = m.clone();
    thread::spawn(move || m2.acquire(None).unwrap())
        .join()
        .unwrap();
    m.release();
}

#[test]
#[should_panic(expected = "doesn't own")]
fn double_release_panics() {
    let m = RawMutex::new();
    m.acquire(None).unwrap();
    m.release();
    m.release();
}

#[test]
#[should_panic(expected = "held by thread")]
fn destroy_while_held_elsewhere_panics() {
    let m = Arc::new(RawMutex::new());
    let m2 = m.clone();
    thread::spawn(move || m2.acquire(None).unwrap())
        .join()
        .unwrap();
    m.destroy();
}

#[test]
fn timeout_expires_and_rolls_back() {
    let m = Arc::new(RawMutex::new());
    m.acquire(None).unwrap();

    let m2 = m.clone();
    let t = thread::spawn(move || m2.acquire(Some(Duration::from_millis(50))));
    assert_eq!(t.join().unwrap(), Err(KError::TimedOut));

    // The timed-out acquire left no trace: only the holder is accounted.
    assert_eq!(m.count(), 1);

    // Release finds no waiter to wake and the mutex is free again.
    m.release();
    assert_eq!(m.count(), 0);
    assert!(m.try_acquire());
    m.release();
    m.destroy();
}

#[test]
fn timeout_not_taken_on_uncontended_mutex() {
    let m = RawMutex::new();
    assert_eq!(m.acquire(Some(Duration::from_millis(1))), Ok(()));
    m.release();
    m.destroy();
}

#[test]
fn destroy_unblocks_all_waiters() {
    let m = Arc::new(RawMutex::new());
    m.acquire(None).unwrap();

    let mut waiters = Vec::new();
    for _ in 0..3 {
        let m2 = m.clone();
        waiters.push(thread::spawn(move || m2.acquire(None)));
    }

    // Holder plus three blocked waiters.
    while m.count() != 4 {
        thread::yield_now();
    }

    // The holder may destroy; everyone blocked comes back with an error
    // other than a timeout, and must not touch the dead mutex.
    m.destroy();

    for w in waiters {
        assert_eq!(w.join().unwrap(), Err(KError::BadState));
    }
}

#[test]
fn contended_handoff_wakes_one_at_a_time() {
    const NUM_TASKS: u32 = 8;
    const NUM_ITERS: u32 = 200;

    let m = Arc::new(RawMutex::new());
    let passes = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for _ in 0..NUM_TASKS {
        let m = m.clone();
        let passes = passes.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..NUM_ITERS {
                m.acquire(None).unwrap();
                passes.fetch_add(1, Ordering::Relaxed);
                may_interrupt();
                m.release();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(passes.load(Ordering::Relaxed), (NUM_TASKS * NUM_ITERS) as u64);
    assert_eq!(m.count(), 0);
    m.destroy();
}

#[test]
fn two_counters_stay_in_step() {
    // Four threads bump two shadow counters under one mutex; any lost
    // exclusion shows up as the counters drifting apart.
    const NUM_TASKS: usize = 4;
    const NUM_ITERS: usize = 2500;

    static M: Mutex<(u64, u64)> = Mutex::new((0, 0));

    let mut handles = Vec::new();
    for _ in 0..NUM_TASKS {
        handles.push(thread::spawn(|| {
            for _ in 0..NUM_ITERS {
                let mut counters = M.lock();
                counters.0 += 1;
                may_interrupt();
                counters.1 += 1;
                assert_eq!(counters.0, counters.1);
                drop(counters);
                may_interrupt();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let counters = M.lock();
    assert_eq!(counters.0, (NUM_TASKS * NUM_ITERS) as u64);
    assert_eq!(counters.0, counters.1);
}

#[test]
fn guard_releases_on_early_return() {
    let m = Mutex::new(5);

    fn take_if_positive(m: &Mutex<i32>) -> bool {
        let v = m.lock();
        if *v <= 0 {
            return false;
        }
        true
    }

    assert!(take_if_positive(&m));
    // The early-return path released the lock as well.
    assert!(m.try_lock().is_some());
}
