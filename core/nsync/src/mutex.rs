// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! A blocking, ownership-tracked mutex.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use nerrno::{KError, KResult};
use nsched::{SchedLockGuard, ThreadId, WaitQueue, current_thread_id};

const MUTEX_MAGIC: u32 = 0x6d75_7478; // 'mutx'

struct MutexState {
    /// Number of threads currently inside `acquire` for this mutex,
    /// holding or waiting. `0` means free.
    count: i64,
    /// The thread recorded as owner while the mutex is held.
    holder: ThreadId,
}

/// A [`lock_api::RawMutex`] implementation that blocks contended callers
/// on a scheduler wait queue.
///
/// # Accounting
///
/// `acquire` increments `count` before looking at it: the pre-increment
/// value decides between the uncontended fast path (`0`, caller becomes
/// holder at once) and blocking. `release` decrements symmetrically and
/// wakes one waiter whenever the post-decrement count shows someone still
/// inside `acquire`. Because both sides run under the global scheduler
/// lock, `count` always equals the number of threads between entering
/// `acquire` and completing `release`, which is what lets a timed-out or
/// aborted acquire compensate with a simple decrement.
pub struct RawMutex {
    magic: AtomicU32,
    state: UnsafeCell<MutexState>,
    queue: WaitQueue,
}

// `state` is only touched under the scheduler lock.
unsafe impl Sync for RawMutex {}
unsafe impl Send for RawMutex {}

impl RawMutex {
    /// Creates an unheld mutex.
    #[inline]
    pub const fn new() -> Self {
        Self {
            magic: AtomicU32::new(MUTEX_MAGIC),
            state: UnsafeCell::new(MutexState {
                count: 0,
                holder: 0,
            }),
            queue: WaitQueue::new(),
        }
    }

    /// Access to the state; caller must hold the scheduler lock.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    fn state_mut(&self, _lock: &SchedLockGuard) -> &mut MutexState {
        unsafe { &mut *self.state.get() }
    }

    #[inline]
    fn check_magic(&self) {
        debug_assert_eq!(
            self.magic.load(Ordering::Relaxed),
            MUTEX_MAGIC,
            "operation on a destroyed or uninitialized mutex"
        );
    }

    /// Acquires the mutex, blocking for at most `timeout`.
    ///
    /// `None` waits forever. Returns `Err(TimedOut)` on expiry, in which
    /// case the mutex is exactly as if the acquire had never been
    /// attempted. Any other error means the mutex went away mid-wait
    /// (destroyed); its state is not touched further.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds this mutex.
    pub fn acquire(&self, timeout: Option<Duration>) -> KResult {
        self.check_magic();
        let me = current_thread_id();

        let sched = SchedLockGuard::lock();

        let contended = {
            let state = self.state_mut(&sched);
            assert_ne!(
                state.holder, me,
                "thread {me} tried to acquire mutex it already owns"
            );
            state.count += 1;
            state.count > 1
        };

        if contended {
            if let Err(e) = self.queue.block(&sched, timeout) {
                if e == KError::TimedOut {
                    // Back out the optimistic increment.
                    self.state_mut(&sched).count -= 1;
                }
                // Any other error: the mutex may already be freed, leave
                // it alone.
                return Err(e);
            }
        }

        // Ownership transfers here, under the same lock the waker held:
        // the winner records itself once it is scheduled.
        self.state_mut(&sched).holder = me;
        Ok(())
    }

    /// Acquires the mutex without blocking.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds this mutex.
    pub fn try_acquire(&self) -> bool {
        self.check_magic();
        let me = current_thread_id();

        let sched = SchedLockGuard::lock();
        let state = self.state_mut(&sched);
        assert_ne!(
            state.holder, me,
            "thread {me} tried to acquire mutex it already owns"
        );
        if state.count == 0 {
            state.count = 1;
            state.holder = me;
            true
        } else {
            false
        }
    }

    /// Releases the mutex, waking one waiter if any thread is blocked.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread is not the holder. A holder of `0`
    /// means the mutex is not held at all, so a double release trips the
    /// same check.
    pub fn release(&self) {
        self.check_magic();
        let me = current_thread_id();

        let sched = SchedLockGuard::lock();
        let woken = {
            let state = self.state_mut(&sched);
            assert_eq!(
                state.holder, me,
                "thread {me} tried to release mutex it doesn't own"
            );
            state.holder = 0;
            state.count -= 1;
            debug_assert!(state.count >= 0);
            // A post-decrement count of 1 or more means threads are still
            // inside acquire(): hand the mutex to exactly one of them.
            state.count >= 1
        };
        if woken {
            self.queue.wake_one(&sched, true);
        }
    }

    /// Destroys the mutex.
    ///
    /// Threads blocked in [`acquire`](Self::acquire) unblock with
    /// `Err(BadState)` instead of hanging forever. The mutex must not be
    /// used again afterwards.
    ///
    /// # Panics
    ///
    /// Panics if a thread other than the caller holds the mutex.
    pub fn destroy(&self) {
        let me = current_thread_id();

        let sched = SchedLockGuard::lock();
        {
            let state = self.state_mut(&sched);
            if state.holder != 0 && state.holder != me {
                panic!(
                    "thread {me} tried to destroy mutex held by thread {}",
                    state.holder
                );
            }
            state.count = 0;
            state.holder = 0;
        }
        self.magic.store(0, Ordering::Relaxed);
        self.queue.destroy(&sched);
    }

    /// Whether the mutex is currently held by any thread.
    pub fn is_held(&self) -> bool {
        let sched = SchedLockGuard::lock();
        self.state_mut(&sched).holder != 0
    }

    /// The thread currently recorded as holder, `0` if unheld.
    pub fn holder(&self) -> ThreadId {
        let sched = SchedLockGuard::lock();
        self.state_mut(&sched).holder
    }

    /// Number of threads holding or waiting. Diagnostic only; the answer
    /// can be stale as soon as the caller sees it.
    pub fn count(&self) -> i64 {
        let sched = SchedLockGuard::lock();
        self.state_mut(&sched).count
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawMutex {
    type GuardMarker = lock_api::GuardSend;

    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawMutex::new();

    #[inline]
    fn lock(&self) {
        if let Err(e) = self.acquire(None) {
            panic!("mutex wait aborted: {e:?}");
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.release();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        let sched = SchedLockGuard::lock();
        self.state_mut(&sched).count > 0
    }
}

/// An alias of [`lock_api::Mutex`].
pub type Mutex<T> = lock_api::Mutex<RawMutex, T>;
/// An alias of [`lock_api::MutexGuard`].
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, RawMutex, T>;
