// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Concrete guard type implementations.

use super::{BaseGuard, arch};

/// No-op guard (does nothing).
#[derive(Debug, Clone, Copy)]
pub struct NoOp;

impl BaseGuard for NoOp {
    type State = ();

    #[inline(always)]
    fn acquire() -> Self::State {}

    #[inline(always)]
    fn release(_state: Self::State) {}
}

impl NoOp {
    /// Create a new no-op guard.
    #[inline(always)]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for NoOp {
    fn default() -> Self {
        Self
    }
}

/// Guard that saves/restores the local IRQ state.
#[derive(Debug)]
pub struct IrqSave(usize);

/// Guard that disables/enables preemption.
#[derive(Debug)]
pub struct NoPreempt;

/// Guard that disables both preemption and IRQs.
#[derive(Debug)]
pub struct NoPreemptIrqSave(usize);

#[inline]
fn preempt_disable() {
    #[cfg(all(feature = "preempt", target_os = "none"))]
    crate_interface::call_interface!(super::KernelGuardIf::disable_preempt);
}

#[inline]
fn preempt_enable() {
    #[cfg(all(feature = "preempt", target_os = "none"))]
    crate_interface::call_interface!(super::KernelGuardIf::enable_preempt);
}

impl BaseGuard for IrqSave {
    type State = usize;

    #[inline]
    fn acquire() -> Self::State {
        arch::local_irq_save_and_disable()
    }

    #[inline]
    fn release(state: Self::State) {
        arch::local_irq_restore(state)
    }
}

impl IrqSave {
    /// Create a new guard, entering the critical section.
    #[inline]
    pub fn new() -> Self {
        Self(<Self as BaseGuard>::acquire())
    }
}

impl Drop for IrqSave {
    #[inline]
    fn drop(&mut self) {
        <Self as BaseGuard>::release(self.0)
    }
}

impl Default for IrqSave {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BaseGuard for NoPreempt {
    type State = ();

    #[inline]
    fn acquire() -> Self::State {
        preempt_disable();
    }

    #[inline]
    fn release(_state: Self::State) {
        // A pending reschedule may fire here, once the scheduler sees the
        // preemption counter drop to zero.
        preempt_enable();
    }
}

impl NoPreempt {
    /// Create a new guard, entering the critical section.
    #[inline]
    pub fn new() -> Self {
        <Self as BaseGuard>::acquire();
        Self
    }
}

impl Drop for NoPreempt {
    #[inline]
    fn drop(&mut self) {
        <Self as BaseGuard>::release(())
    }
}

impl Default for NoPreempt {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BaseGuard for NoPreemptIrqSave {
    type State = usize;

    #[inline]
    fn acquire() -> Self::State {
        // Order: disable preemption first, then IRQs.
        preempt_disable();
        arch::local_irq_save_and_disable()
    }

    #[inline]
    fn release(state: Self::State) {
        // Order: restore IRQs first, then enable preemption.
        arch::local_irq_restore(state);
        preempt_enable();
    }
}

impl NoPreemptIrqSave {
    /// Create a new guard, entering the critical section.
    #[inline]
    pub fn new() -> Self {
        Self(<Self as BaseGuard>::acquire())
    }
}

impl Drop for NoPreemptIrqSave {
    #[inline]
    fn drop(&mut self) {
        <Self as BaseGuard>::release(self.0)
    }
}

impl Default for NoPreemptIrqSave {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
