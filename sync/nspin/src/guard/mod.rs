// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! RAII guards for critical sections with IRQ/preemption control.

/// Low-level kernel hooks consumed by the guard types.
///
/// The scheduler implements this to plug its preemption counter into the
/// guards; re-enabling preemption is where a deferred reschedule may fire.
#[crate_interface::def_interface]
pub trait KernelGuardIf {
    /// Enable kernel preemption.
    fn enable_preempt();

    /// Disable kernel preemption.
    fn disable_preempt();

    /// The CPU the caller is running on, used by debug lock tracking.
    fn current_cpu_id() -> usize;
}

/// Base trait for all guard types.
///
/// Guards manage a critical section as an RAII pair: `acquire` enters and
/// returns the state `release` needs to leave again.
pub trait BaseGuard {
    /// State saved when entering the critical section.
    type State: Clone + Copy;

    /// Enter the critical section, returning the saved state.
    fn acquire() -> Self::State;

    /// Exit the critical section, restoring the saved state.
    fn release(state: Self::State);
}

mod arch;
mod types;

pub use types::{IrqSave, NoOp, NoPreempt, NoPreemptIrqSave};

/// Snapshots the local interrupt-enable state and disables interrupts.
///
/// The returned token is opaque and must be passed to exactly one matching
/// [`interrupt_restore`]. Pairs nest: restoring an inner token leaves
/// interrupts as the inner save found them, which keeps an outer section's
/// interrupts disabled.
#[inline]
pub fn interrupt_save() -> usize {
    arch::local_irq_save_and_disable()
}

/// Restores the interrupt-enable state captured by [`interrupt_save`].
///
/// Interrupts are re-enabled only if the token says they were enabled at
/// the save point.
#[inline]
pub fn interrupt_restore(state: usize) {
    arch::local_irq_restore(state)
}

/// Whether local interrupts are currently enabled.
#[inline]
pub fn interrupts_enabled() -> bool {
    arch::local_irq_enabled()
}
