// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Interfaces the kernel core consumes from the scheduler/thread layer.
//!
//! The run queues, the wait-queue bookkeeping and thread lifecycle all live
//! outside this workspace. What the core needs from them is narrow: a
//! global scheduler lock, the identity of the current thread, the ability
//! to block on and wake a wait queue, and a handful of lifecycle hooks.
//! [`SchedulerIf`] declares exactly that; the scheduler provides the one
//! implementation per kernel image.

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "host-test", not(test)))]
extern crate std;

#[cfg(any(test, feature = "host-test"))]
pub mod host;

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use crate_interface::call_interface;
use nerrno::{KError, KResult};

/// Thread identity as reported by the scheduler. `0` means "no thread".
pub type ThreadId = u64;

/// Operations provided by the external scheduler/thread layer.
///
/// Locking contract: `wait_queue_block` must be entered with the scheduler
/// lock held; the scheduler releases it while the thread sleeps and
/// reacquires it before returning. The decision between "block" and
/// "already woken" is made under that lock, so a wakeup racing with a
/// timeout cannot be lost. The wake and exit operations likewise expect
/// the caller to hold the scheduler lock.
#[crate_interface::def_interface]
pub trait SchedulerIf {
    /// Identity of the calling thread.
    fn current_thread_id() -> ThreadId;

    /// Acquires the global scheduler lock, disabling local interrupts.
    /// Returns the saved interrupt state.
    fn sched_lock() -> usize;

    /// Releases the global scheduler lock and restores the interrupt state
    /// captured by the matching [`sched_lock`](SchedulerIf::sched_lock).
    fn sched_unlock(state: usize);

    /// Releases the scheduler lock a brand-new thread still holds from the
    /// reschedule that first ran it. Called once per thread, from the
    /// bootstrap trampoline.
    fn sched_unlock_first_run();

    /// Blocks the calling thread on the wait queue identified by `key`.
    ///
    /// `timeout_ns` of `None` waits forever. Returns `Ok` when woken
    /// normally, `Err(TimedOut)` on expiry, or whatever error the waker
    /// supplied.
    fn wait_queue_block(key: usize, timeout_ns: Option<u64>) -> KResult;

    /// Wakes at most one thread blocked on `key`, returning how many were
    /// woken. With `resched` set, the woken thread is given a chance to
    /// run before the caller.
    fn wait_queue_wake_one(key: usize, resched: bool) -> usize;

    /// Wakes every thread blocked on `key` with the given error and
    /// forgets the queue. Returns how many were woken.
    fn wait_queue_wake_all_err(key: usize, err: KError) -> usize;

    /// Asks `cpu_id` to run through its scheduler as soon as it can
    /// (the reschedule-IPI mailbox).
    fn request_resched(cpu_id: usize);

    /// Terminates the calling thread with `code`. Called by the bootstrap
    /// trampoline when a thread's entry function returns.
    fn exit_current(code: i32) -> !;

    /// Enters the scheduler's idle loop on the calling CPU. Used by a
    /// secondary CPU once its bring-up is complete.
    fn run_idle() -> !;
}

/// Identity of the calling thread.
#[inline]
pub fn current_thread_id() -> ThreadId {
    call_interface!(SchedulerIf::current_thread_id)
}

/// RAII holder of the global scheduler lock.
pub struct SchedLockGuard {
    saved: usize,
}

impl SchedLockGuard {
    /// Acquires the scheduler lock.
    #[inline]
    pub fn lock() -> Self {
        Self {
            saved: call_interface!(SchedulerIf::sched_lock),
        }
    }
}

impl Drop for SchedLockGuard {
    #[inline]
    fn drop(&mut self) {
        call_interface!(SchedulerIf::sched_unlock, self.saved);
    }
}

const WAIT_QUEUE_MAGIC: u32 = 0x7761_6974; // 'wait'

/// A token identifying one wait queue to the scheduler.
///
/// The queue's thread list lives in the scheduler; this token only carries
/// identity (its address) and a magic for catching use-after-destroy in
/// debug builds. It is therefore const-constructible and can sit inside a
/// statically allocated mutex.
pub struct WaitQueue {
    magic: AtomicU32,
}

impl WaitQueue {
    /// Creates a wait queue token.
    pub const fn new() -> Self {
        Self {
            magic: AtomicU32::new(WAIT_QUEUE_MAGIC),
        }
    }

    #[inline]
    fn key(&self) -> usize {
        self as *const Self as usize
    }

    /// Whether the queue has not been destroyed.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.magic.load(Ordering::Relaxed) == WAIT_QUEUE_MAGIC
    }

    /// Blocks the calling thread until woken or until `timeout` expires.
    ///
    /// Must be called with the scheduler lock held; see [`SchedulerIf`].
    pub fn block(&self, _lock: &SchedLockGuard, timeout: Option<Duration>) -> KResult {
        if !self.is_alive() {
            return Err(KError::BadState);
        }
        call_interface!(
            SchedulerIf::wait_queue_block,
            self.key(),
            timeout.map(|t| t.as_nanos() as u64)
        )
    }

    /// Wakes at most one blocked thread. Must be called with the scheduler
    /// lock held.
    pub fn wake_one(&self, _lock: &SchedLockGuard, resched: bool) -> usize {
        debug_assert!(self.is_alive());
        call_interface!(SchedulerIf::wait_queue_wake_one, self.key(), resched)
    }

    /// Invalidates the queue and releases every waiter with
    /// `Err(BadState)`. Must be called with the scheduler lock held.
    pub fn destroy(&self, _lock: &SchedLockGuard) -> usize {
        self.magic.store(0, Ordering::Relaxed);
        call_interface!(
            SchedulerIf::wait_queue_wake_all_err,
            self.key(),
            KError::BadState
        )
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn block_times_out() {
        let queue = WaitQueue::new();
        let lock = SchedLockGuard::lock();
        let r = queue.block(&lock, Some(Duration::from_millis(20)));
        assert_eq!(r, Err(KError::TimedOut));
    }

    #[test]
    fn wake_one_wakes_exactly_one() {
        static QUEUE: WaitQueue = WaitQueue::new();

        let mut waiters = Vec::new();
        for _ in 0..2 {
            waiters.push(thread::spawn(|| {
                let lock = SchedLockGuard::lock();
                QUEUE.block(&lock, None)
            }));
        }

        // Wait until both are enqueued, then release them one at a time.
        loop {
            thread::sleep(Duration::from_millis(5));
            let lock = SchedLockGuard::lock();
            let woken = QUEUE.wake_one(&lock, false);
            drop(lock);
            if woken == 1 {
                break;
            }
        }
        loop {
            let lock = SchedLockGuard::lock();
            let woken = QUEUE.wake_one(&lock, false);
            drop(lock);
            if woken == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        for w in waiters {
            assert_eq!(w.join().unwrap(), Ok(()));
        }
    }

    #[test]
    fn destroy_releases_waiters_with_error() {
        static QUEUE: WaitQueue = WaitQueue::new();

        let waiter = thread::spawn(|| {
            let lock = SchedLockGuard::lock();
            QUEUE.block(&lock, None)
        });

        thread::sleep(Duration::from_millis(20));
        let lock = SchedLockGuard::lock();
        assert_eq!(QUEUE.destroy(&lock), 1);
        drop(lock);

        assert_eq!(waiter.join().unwrap(), Err(KError::BadState));
        assert!(!QUEUE.is_alive());

        // Blocking on a destroyed queue fails immediately.
        let lock = SchedLockGuard::lock();
        assert_eq!(QUEUE.block(&lock, None), Err(KError::BadState));
    }

    #[test]
    fn thread_ids_are_distinct() {
        let a = current_thread_id();
        let b = thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
    }
}
