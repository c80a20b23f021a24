// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Test suite for nspin

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicUsize, Ordering},
        mpsc::channel,
    },
    thread,
};

use super::*;

struct TestGuardCounting;

static GUARD_DEPTH: AtomicU32 = AtomicU32::new(0);

impl BaseGuard for TestGuardCounting {
    type State = u32;

    fn acquire() -> Self::State {
        GUARD_DEPTH.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn release(_: Self::State) {
        GUARD_DEPTH.fetch_sub(1, Ordering::SeqCst);
    }
}

type TestSpinCounting<T> = SpinLock<TestGuardCounting, T>;
type TestMutex<T> = SpinRaw<T>;

// Tests that observe the process-wide IRQ flag or the guard depth counter
// must not interleave.
static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn serial() -> std::sync::MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Eq, PartialEq, Debug)]
struct NonCopy(i32);

#[test]
fn smoke() {
    let m = TestMutex::new(());
    drop(m.lock());
    drop(m.lock());
}

#[test]
#[cfg(feature = "smp")]
fn concurrent_increments() {
    const INCREMENTS_PER_THREAD: u32 = 1000;
    const NUM_THREADS: u32 = 6;

    static M: TestMutex<()> = TestMutex::new(());
    static CNT: AtomicU32 = AtomicU32::new(0);

    fn inc() {
        for _ in 0..INCREMENTS_PER_THREAD {
            let _g = M.lock();
            // Non-atomic read-modify-write under the lock.
            let v = CNT.load(Ordering::Relaxed);
            CNT.store(v + 1, Ordering::Relaxed);
        }
    }

    let (tx, rx) = channel();
    let mut handles = Vec::new();

    for _ in 0..NUM_THREADS {
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            inc();
            tx.send(()).unwrap();
        }));
    }

    drop(tx);
    for _ in 0..NUM_THREADS {
        rx.recv().unwrap();
    }

    assert_eq!(CNT.load(Ordering::SeqCst), INCREMENTS_PER_THREAD * NUM_THREADS);

    for h in handles {
        h.join().unwrap();
    }
}

#[test]
#[cfg(feature = "smp")]
fn try_lock_works() {
    let mutex = TestMutex::new(42);

    let a = mutex.try_lock();
    assert_eq!(a.as_ref().map(|r| **r), Some(42));

    let b = mutex.try_lock();
    assert!(b.is_none());

    drop(a);
    let c = mutex.try_lock();
    assert_eq!(c.as_ref().map(|r| **r), Some(42));
}

#[test]
fn guard_state_restored() {
    let _s = serial();
    let m = TestSpinCounting::new(());
    let a = m.lock();
    assert_eq!(GUARD_DEPTH.load(Ordering::SeqCst), 1);
    drop(a);
    assert_eq!(GUARD_DEPTH.load(Ordering::SeqCst), 0);
}

#[test]
#[cfg(feature = "smp")]
fn failed_try_lock_restores_state() {
    let _s = serial();
    let m = TestSpinCounting::new(());
    let a = m.lock();
    assert_eq!(GUARD_DEPTH.load(Ordering::SeqCst), 1);

    let b = m.try_lock();
    assert!(b.is_none());
    assert_eq!(GUARD_DEPTH.load(Ordering::SeqCst), 1);

    drop(a);
    assert_eq!(GUARD_DEPTH.load(Ordering::SeqCst), 0);
}

#[test]
fn irqsave_restores_enabled_state() {
    let _s = serial();
    // Starting from "enabled", the lock must leave interrupts enabled
    // again once dropped.
    assert!(interrupts_enabled());
    let m = SpinLock::<IrqSave, u32>::new(5);
    {
        let g = m.lock();
        assert!(!interrupts_enabled());
        assert_eq!(*g, 5);
    }
    assert!(interrupts_enabled());
}

#[test]
fn irqsave_restores_disabled_state() {
    let _s = serial();
    // Starting from "disabled", dropping the lock must not re-enable.
    let outer = interrupt_save();
    assert!(!interrupts_enabled());
    let m = SpinLock::<IrqSave, ()>::new(());
    drop(m.lock());
    assert!(!interrupts_enabled());
    interrupt_restore(outer);
    assert!(interrupts_enabled());
}

#[test]
fn nested_interrupt_save_restore() {
    let _s = serial();
    assert!(interrupts_enabled());
    let outer = interrupt_save();
    assert!(!interrupts_enabled());
    let inner = interrupt_save();
    assert!(!interrupts_enabled());
    // The inner restore must not re-enable what the outer save disabled.
    interrupt_restore(inner);
    assert!(!interrupts_enabled());
    interrupt_restore(outer);
    assert!(interrupts_enabled());
}

#[test]
fn into_inner_works() {
    let m = TestMutex::new(NonCopy(10));
    assert_eq!(m.into_inner(), NonCopy(10));
}

#[test]
fn into_inner_drops() {
    struct Foo(Arc<AtomicUsize>);
    impl Drop for Foo {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let num_drops = Arc::new(AtomicUsize::new(0));
    let m = TestMutex::new(Foo(num_drops.clone()));
    assert_eq!(num_drops.load(Ordering::SeqCst), 0);

    {
        let _inner = m.into_inner();
        assert_eq!(num_drops.load(Ordering::SeqCst), 0);
    }

    assert_eq!(num_drops.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_locks() {
    let arc = Arc::new(TestMutex::new(1));
    let arc2 = Arc::new(TestMutex::new(arc));
    let (tx, rx) = channel();

    let t = thread::spawn(move || {
        let lock = arc2.lock();
        let lock2 = lock.lock();
        assert_eq!(*lock2, 1);
        tx.send(()).unwrap();
    });

    rx.recv().unwrap();
    t.join().unwrap();
}

#[test]
fn unsized_types() {
    let mutex: &TestMutex<[i32]> = &TestMutex::new([1, 2, 3]);
    {
        let mut b = mutex.lock();
        b[0] = 4;
        b[2] = 5;
    }
    let expected: &[i32] = &[4, 2, 5];
    assert_eq!(&*mutex.lock(), expected);
}

#[test]
#[cfg(feature = "smp")]
fn force_unlock_works() {
    let lock = TestMutex::new(());
    std::mem::forget(lock.lock());

    unsafe {
        lock.force_unlock();
    }

    assert!(lock.try_lock().is_some());
}

#[test]
fn debug_output() {
    let lock = TestMutex::new(42);
    let debug_str = format!("{:?}", lock);
    assert!(debug_str.contains("42") || debug_str.contains("SpinLock"));
}
