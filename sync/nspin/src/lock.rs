// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Spinlock implementation with configurable guards.

#[cfg(feature = "smp")]
use core::sync::atomic::{AtomicBool, Ordering};
use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use crate::guard::BaseGuard;

#[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
use core::sync::atomic::AtomicUsize;

#[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
const NO_OWNER: usize = usize::MAX;

/// A busy-wait lock coupled with a guard type `G`.
///
/// The guard decides what the critical section suppresses while the lock
/// is held: nothing ([`crate::NoOp`]), preemption ([`crate::NoPreempt`]),
/// IRQs ([`crate::IrqSave`]), or both ([`crate::NoPreemptIrqSave`]).
///
/// # Single-core optimization
///
/// Without the `smp` feature there is no other core to race with, so the
/// lock word is compiled out and only the guard remains.
///
/// # Usage errors
///
/// A core must not take a lock it already holds; with interrupts disabled
/// that spin can never end. Debug builds of SMP kernels record the holder
/// CPU and assert on re-acquisition.
pub struct SpinLock<G: BaseGuard, T: ?Sized> {
    _phantom: PhantomData<G>,
    #[cfg(feature = "smp")]
    lock: AtomicBool,
    #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
    owner_cpu: AtomicUsize,
    data: UnsafeCell<T>,
}

/// RAII guard for [`SpinLock`].
///
/// Gives mutable access to the protected data; dropping it releases the
/// lock word first and leaves the guard's critical section second, so the
/// protected data is never reachable with the lock word still set.
pub struct SpinLockGuard<'a, G: BaseGuard, T: ?Sized + 'a> {
    _phantom: &'a PhantomData<G>,
    guard_state: G::State,
    data: *mut T,
    #[cfg(feature = "smp")]
    lock: &'a AtomicBool,
    #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
    owner_cpu: &'a AtomicUsize,
}

// Same unsafe impls as `std::sync::Mutex`
unsafe impl<G: BaseGuard, T: ?Sized + Send> Sync for SpinLock<G, T> {}
unsafe impl<G: BaseGuard, T: ?Sized + Send> Send for SpinLock<G, T> {}

impl<G: BaseGuard, T> SpinLock<G, T> {
    /// Create a new spinlock wrapping `data`.
    #[inline(always)]
    pub const fn new(data: T) -> Self {
        Self {
            _phantom: PhantomData,
            data: UnsafeCell::new(data),
            #[cfg(feature = "smp")]
            lock: AtomicBool::new(false),
            #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
            owner_cpu: AtomicUsize::new(NO_OWNER),
        }
    }

    /// Consume the lock and return the inner value.
    #[inline(always)]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<G: BaseGuard, T: ?Sized> SpinLock<G, T> {
    #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
    #[inline]
    fn debug_check_not_held_by_me(&self) {
        let me = crate_interface::call_interface!(crate::KernelGuardIf::current_cpu_id);
        debug_assert_ne!(
            self.owner_cpu.load(Ordering::Relaxed),
            me,
            "spinlock re-acquired by the CPU that holds it"
        );
    }

    #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
    #[inline]
    fn debug_mark_held(&self) {
        let me = crate_interface::call_interface!(crate::KernelGuardIf::current_cpu_id);
        self.owner_cpu.store(me, Ordering::Relaxed);
    }

    /// Acquire the lock, spinning until it is available.
    #[inline(always)]
    pub fn lock(&self) -> SpinLockGuard<'_, G, T> {
        let guard_state = G::acquire();

        #[cfg(feature = "smp")]
        {
            #[cfg(all(debug_assertions, target_os = "none"))]
            self.debug_check_not_held_by_me();

            while self
                .lock
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                while self.is_locked() {
                    core::hint::spin_loop();
                }
            }

            #[cfg(all(debug_assertions, target_os = "none"))]
            self.debug_mark_held();
        }

        SpinLockGuard {
            _phantom: &PhantomData,
            guard_state,
            data: unsafe { &mut *self.data.get() },
            #[cfg(feature = "smp")]
            lock: &self.lock,
            #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
            owner_cpu: &self.owner_cpu,
        }
    }

    /// Check if the lock is currently held.
    ///
    /// # Warning
    ///
    /// The answer can be stale by the time the caller looks at it. Do not
    /// use it for synchronization; it exists for assertions and debugging.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        #[cfg(feature = "smp")]
        {
            self.lock.load(Ordering::Relaxed)
        }
        #[cfg(not(feature = "smp"))]
        {
            false
        }
    }

    /// Try to acquire the lock without spinning.
    ///
    /// Returns `Some(guard)` on success, `None` if the lock is held
    /// elsewhere. The guard's critical section is entered and left again
    /// on failure.
    #[inline(always)]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, G, T>> {
        let guard_state = G::acquire();

        #[cfg(feature = "smp")]
        let acquired = self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok();

        #[cfg(not(feature = "smp"))]
        let acquired = true;

        if acquired {
            #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
            self.debug_mark_held();

            Some(SpinLockGuard {
                _phantom: &PhantomData,
                guard_state,
                data: unsafe { &mut *self.data.get() },
                #[cfg(feature = "smp")]
                lock: &self.lock,
                #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
                owner_cpu: &self.owner_cpu,
            })
        } else {
            G::release(guard_state);
            None
        }
    }

    /// Force unlock.
    ///
    /// # Safety
    ///
    /// Only sound if the calling CPU holds the lock; anything else is a
    /// data race on the protected value.
    #[inline(always)]
    pub unsafe fn force_unlock(&self) {
        #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
        self.owner_cpu.store(NO_OWNER, Ordering::Relaxed);
        #[cfg(feature = "smp")]
        self.lock.store(false, Ordering::Release);
    }

    /// Get a mutable reference to the protected data without locking.
    ///
    /// The exclusive borrow of the lock itself guarantees nobody else can
    /// hold it.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }
}

impl<G: BaseGuard, T: Default> Default for SpinLock<G, T> {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<G: BaseGuard, T: ?Sized + fmt::Debug> fmt::Debug for SpinLock<G, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("data", &&*guard).finish(),
            None => f
                .debug_struct("SpinLock")
                .field("data", &"<locked>")
                .finish(),
        }
    }
}

impl<G: BaseGuard, T: ?Sized> Deref for SpinLockGuard<'_, G, T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        unsafe { &*self.data }
    }
}

impl<G: BaseGuard, T: ?Sized> DerefMut for SpinLockGuard<'_, G, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data }
    }
}

impl<G: BaseGuard, T: ?Sized + fmt::Debug> fmt::Debug for SpinLockGuard<'_, G, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<G: BaseGuard, T: ?Sized> Drop for SpinLockGuard<'_, G, T> {
    #[inline(always)]
    fn drop(&mut self) {
        #[cfg(all(feature = "smp", debug_assertions, target_os = "none"))]
        self.owner_cpu.store(NO_OWNER, Ordering::Relaxed);

        // Lock word first, guard second: once interrupts come back on, the
        // lock is already free for whoever they hand the CPU to.
        #[cfg(feature = "smp")]
        self.lock.store(false, Ordering::Release);

        G::release(self.guard_state);
    }
}
