// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Interrupt controller interface and the shared handler table.

use core::sync::atomic::{AtomicUsize, Ordering};

/// An interrupt handler: receives the argument it was registered with and
/// returns whether the interrupted CPU should reschedule on exit.
pub type Handler = fn(usize) -> bool;

/// Destination of a software-generated interrupt.
#[derive(Clone, Copy, Debug)]
pub enum TargetCpu {
    /// The calling CPU itself.
    Self_,
    /// One specific CPU.
    Specific(usize),
    /// Every CPU except the caller.
    AllButSelf {
        /// The calling CPU.
        me: usize,
        /// Total number of online CPUs.
        total: usize,
    },
}

/// Operations on the platform's interrupt controller.
#[crate_interface::def_interface]
pub trait IntrManager {
    /// Enables or disables (masks) the given interrupt.
    fn enable(irq: usize, enabled: bool);

    /// Translates a raw trap cause into a vector number, performing any
    /// controller-side acknowledge and end-of-interrupt. Returns `None`
    /// for a spurious interrupt.
    fn dispatch_irq(irq: usize) -> Option<usize>;

    /// Sends a software-generated interrupt to the target CPUs.
    fn notify_cpu(irq: usize, target: TargetCpu);

    /// Sets the priority of the given interrupt.
    fn set_prio(irq: usize, priority: u8);
}

/// Sentinel stored in a handler slot while its argument is being written.
const CLAIMED: usize = 1;

/// A fixed-size table mapping vector numbers to `(handler, argument)`
/// pairs.
///
/// Registration is register-once: a slot can only be claimed while empty.
/// Lookup is a single atomic load, so dispatch from interrupt context takes
/// no locks.
pub struct HandlerTable<const N: usize> {
    handlers: [AtomicUsize; N],
    args: [AtomicUsize; N],
}

impl<const N: usize> HandlerTable<N> {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            handlers: [const { AtomicUsize::new(0) }; N],
            args: [const { AtomicUsize::new(0) }; N],
        }
    }

    /// Registers `handler` for `idx`, to be invoked with `arg`.
    ///
    /// Returns `false` if `idx` is out of range or already registered.
    pub fn register_handler(&self, idx: usize, handler: Handler, arg: usize) -> bool {
        if idx >= N {
            return false;
        }
        // Claim the slot first so a concurrent registration cannot observe
        // a handler published before its argument.
        if self.handlers[idx]
            .compare_exchange(0, CLAIMED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        self.args[idx].store(arg, Ordering::Relaxed);
        self.handlers[idx].store(handler as usize, Ordering::Release);
        true
    }

    /// Removes the handler for `idx`, returning it if one was registered.
    pub fn unregister_handler(&self, idx: usize) -> Option<Handler> {
        if idx >= N {
            return None;
        }
        let h = self.handlers[idx].swap(0, Ordering::AcqRel);
        if h > CLAIMED {
            Some(unsafe { core::mem::transmute::<usize, Handler>(h) })
        } else {
            None
        }
    }

    /// Invokes the handler for `idx` with its registered argument.
    ///
    /// Returns the handler's reschedule request, or `None` if no handler is
    /// registered for this vector.
    pub fn handle(&self, idx: usize) -> Option<bool> {
        if idx >= N {
            return None;
        }
        let h = self.handlers[idx].load(Ordering::Acquire);
        if h > CLAIMED {
            let arg = self.args[idx].load(Ordering::Relaxed);
            let handler = unsafe { core::mem::transmute::<usize, Handler>(h) };
            Some(handler(arg))
        } else {
            None
        }
    }

    /// Whether a handler is registered for `idx`.
    pub fn is_registered(&self, idx: usize) -> bool {
        idx < N && self.handlers[idx].load(Ordering::Acquire) > CLAIMED
    }
}

impl<const N: usize> Default for HandlerTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_arg: usize) -> bool {
        false
    }

    fn wants_resched(arg: usize) -> bool {
        arg == 7
    }

    #[test]
    fn register_once() {
        let table = HandlerTable::<8>::new();
        assert!(table.register_handler(3, nop, 0));
        assert!(!table.register_handler(3, nop, 0));
        assert!(table.is_registered(3));
        assert!(!table.is_registered(2));
    }

    #[test]
    fn out_of_range() {
        let table = HandlerTable::<4>::new();
        assert!(!table.register_handler(4, nop, 0));
        assert!(table.handle(4).is_none());
        assert!(table.unregister_handler(4).is_none());
    }

    #[test]
    fn dispatch_passes_argument() {
        let table = HandlerTable::<8>::new();
        assert!(table.register_handler(1, wants_resched, 7));
        assert!(table.register_handler(2, wants_resched, 8));
        assert_eq!(table.handle(1), Some(true));
        assert_eq!(table.handle(2), Some(false));
        assert_eq!(table.handle(5), None);
    }

    #[test]
    fn unregister_returns_handler() {
        let table = HandlerTable::<8>::new();
        assert!(table.register_handler(0, nop, 0));
        let h = table.unregister_handler(0).unwrap();
        assert_eq!(h as usize, nop as usize);
        assert!(table.handle(0).is_none());
        // The slot can be reused afterwards.
        assert!(table.register_handler(0, wants_resched, 7));
        assert_eq!(table.handle(0), Some(true));
    }
}
