// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! A std-thread scheduler backing [`SchedulerIf`] for host-side tests.
//!
//! Enabled by the `host-test` feature (and for this crate's own tests).
//! It implements the interface contract faithfully enough to test the
//! primitives built on top of it: one global scheduler lock, FIFO wait
//! queues keyed by address, and a block operation whose
//! block-or-already-woken decision is made under the scheduler lock, so a
//! wakeup racing with a timeout is never lost.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use nerrno::{KError, KResult};

use crate::{SchedulerIf, ThreadId};

const MAX_TRACKED_CPUS: usize = 64;

enum WaitState {
    Sleeping,
    Woken(KResult),
}

struct Waiter {
    state: Mutex<WaitState>,
    cv: Condvar,
}

impl Waiter {
    fn new() -> Self {
        Self {
            state: Mutex::new(WaitState::Sleeping),
            cv: Condvar::new(),
        }
    }
}

struct Kernel {
    queues: BTreeMap<usize, VecDeque<Arc<Waiter>>>,
}

static KERNEL: Mutex<Kernel> = Mutex::new(Kernel {
    queues: BTreeMap::new(),
});

static RESCHED_REQUESTS: [AtomicUsize; MAX_TRACKED_CPUS] =
    [const { AtomicUsize::new(0) }; MAX_TRACKED_CPUS];

/// How many times a reschedule was requested for `cpu` (the IPI mailbox
/// observer for tests).
pub fn resched_requests(cpu: usize) -> usize {
    RESCHED_REQUESTS[cpu].load(Ordering::SeqCst)
}

static EXIT_HOOK: AtomicUsize = AtomicUsize::new(0);

/// Installs what `exit_current` should do, for tests that drive the
/// thread bootstrap path. Without a hook, thread exit is a test failure.
pub fn set_exit_hook(hook: fn(i32) -> !) {
    EXIT_HOOK.store(hook as usize, Ordering::SeqCst);
}

// Panic tests poison the kernel lock on purpose; later tests just take
// over the state.
fn kernel_lock() -> MutexGuard<'static, Kernel> {
    KERNEL.lock().unwrap_or_else(|e| e.into_inner())
}

std::thread_local! {
    // The scheduler lock held by this thread, if any.
    static HELD: RefCell<Option<MutexGuard<'static, Kernel>>> = const { RefCell::new(None) };
}

fn with_kernel<R>(f: impl FnOnce(&mut Kernel) -> R) -> R {
    HELD.with(|slot| {
        let mut slot = slot.borrow_mut();
        let guard = slot.as_mut().expect("scheduler lock not held");
        f(guard)
    })
}

fn next_thread_id() -> ThreadId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    std::thread_local! {
        static SELF_ID: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    SELF_ID.with(|id| *id)
}

fn wake_with(waiter: &Waiter, result: KResult) {
    let mut state = waiter.state.lock().unwrap_or_else(|e| e.into_inner());
    *state = WaitState::Woken(result);
    waiter.cv.notify_one();
}

/// The host scheduler; one per test binary, wired up through
/// `crate_interface`.
pub struct HostScheduler;

#[crate_interface::impl_interface]
impl SchedulerIf for HostScheduler {
    fn current_thread_id() -> ThreadId {
        next_thread_id()
    }

    fn sched_lock() -> usize {
        let guard = kernel_lock();
        HELD.with(|slot| {
            let prev = slot.borrow_mut().replace(guard);
            assert!(prev.is_none(), "scheduler lock is not recursive");
        });
        0
    }

    fn sched_unlock(_state: usize) {
        HELD.with(|slot| {
            slot.borrow_mut().take().expect("scheduler lock not held");
        });
    }

    fn sched_unlock_first_run() {
        // A bootstrap test may enter a brand-new context without going
        // through a reschedule, so there may be nothing to release.
        HELD.with(|slot| {
            slot.borrow_mut().take();
        });
    }

    fn wait_queue_block(key: usize, timeout_ns: Option<u64>) -> KResult {
        let waiter = Arc::new(Waiter::new());
        with_kernel(|k| {
            k.queues.entry(key).or_default().push_back(waiter.clone());
        });

        // Drop the scheduler lock while sleeping.
        HostScheduler::sched_unlock(0);

        let deadline = timeout_ns.map(|ns| Instant::now() + Duration::from_nanos(ns));
        {
            let mut state = waiter.state.lock().unwrap_or_else(|e| e.into_inner());
            loop {
                if matches!(*state, WaitState::Woken(_)) {
                    break;
                }
                match deadline {
                    None => {
                        state = waiter.cv.wait(state).unwrap_or_else(|e| e.into_inner());
                    }
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        state = waiter
                            .cv
                            .wait_timeout(state, deadline - now)
                            .unwrap_or_else(|e| e.into_inner())
                            .0;
                    }
                }
            }
        }

        // Reacquire the scheduler lock, then settle the race between a
        // wakeup and the timeout under it.
        HostScheduler::sched_lock();
        let late = waiter.state.lock().unwrap_or_else(|e| e.into_inner());
        match *late {
            WaitState::Woken(result) => result,
            WaitState::Sleeping => {
                drop(late);
                with_kernel(|k| {
                    if let Some(q) = k.queues.get_mut(&key) {
                        q.retain(|w| !Arc::ptr_eq(w, &waiter));
                    }
                });
                Err(KError::TimedOut)
            }
        }
    }

    fn wait_queue_wake_one(key: usize, _resched: bool) -> usize {
        with_kernel(|k| {
            if let Some(w) = k.queues.get_mut(&key).and_then(|q| q.pop_front()) {
                wake_with(&w, Ok(()));
                1
            } else {
                0
            }
        })
    }

    fn wait_queue_wake_all_err(key: usize, err: KError) -> usize {
        with_kernel(|k| {
            let mut woken = 0;
            if let Some(mut q) = k.queues.remove(&key) {
                while let Some(w) = q.pop_front() {
                    wake_with(&w, Err(err));
                    woken += 1;
                }
            }
            woken
        })
    }

    fn request_resched(cpu_id: usize) {
        RESCHED_REQUESTS[cpu_id].fetch_add(1, Ordering::SeqCst);
    }

    fn exit_current(code: i32) -> ! {
        let hook = EXIT_HOOK.load(Ordering::SeqCst);
        if hook != 0 {
            let hook = unsafe { core::mem::transmute::<usize, fn(i32) -> !>(hook) };
            hook(code)
        }
        panic!("exit_current({code}) called on the host scheduler");
    }

    fn run_idle() -> ! {
        panic!("run_idle called on the host scheduler");
    }
}
