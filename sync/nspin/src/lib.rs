// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Architecture
//!
//! The crate has two layers:
//!
//! ## Guards (`guard` module)
//!
//! RAII guards that enter and leave a critical section:
//! - [`NoOp`]: no protection (for contexts that already run with IRQs off)
//! - [`NoPreempt`]: disables kernel preemption
//! - [`IrqSave`]: snapshots and disables local IRQs, restoring the
//!   snapshot on drop
//! - [`NoPreemptIrqSave`]: disables both preemption and IRQs
//!
//! The IRQ guards are built on the standalone [`interrupt_save`] and
//! [`interrupt_restore`] primitives, which nest: an inner save/restore pair
//! only re-enables interrupts if they were enabled at *its own* save point.
//!
//! ## Locks (`lock` module)
//!
//! [`SpinLock<G, T>`] couples a one-word busy-wait lock with a guard type
//! `G`, so that lock state and interrupt state are managed as a single
//! resource: acquire enters the guard's critical section before taking the
//! lock word, release drops the lock word first and only then leaves the
//! critical section.
//!
//! # Feature Flags
//!
//! - `smp`: enable for multi-core systems (adds the atomic lock word)
//! - `preempt`: enable preemption control (requires implementing
//!   [`KernelGuardIf`])

mod guard;
mod lock;
#[cfg(test)]
mod tests;

pub use guard::{
    BaseGuard, IrqSave, KernelGuardIf, NoOp, NoPreempt, NoPreemptIrqSave, interrupt_restore,
    interrupt_save, interrupts_enabled,
};
pub use lock::{SpinLock, SpinLockGuard};

/// A spinlock with no guards.
///
/// **Warning**: only for contexts where preemption and IRQs are already
/// disabled.
pub type SpinRaw<T> = SpinLock<NoOp, T>;

/// Guard for [`SpinRaw`].
pub type SpinRawGuard<'a, T> = SpinLockGuard<'a, NoOp, T>;

/// A spinlock that disables preemption while held.
///
/// Usable when IRQ handlers never touch the protected data.
pub type SpinNoPreempt<T> = SpinLock<NoPreempt, T>;

/// Guard for [`SpinNoPreempt`].
pub type SpinNoPreemptGuard<'a, T> = SpinLockGuard<'a, NoPreempt, T>;

/// A spinlock that disables preemption and IRQs while held.
///
/// Safe in any context, including interrupt handlers.
pub type SpinNoIrq<T> = SpinLock<NoPreemptIrqSave, T>;

/// Guard for [`SpinNoIrq`].
pub type SpinNoIrqGuard<'a, T> = SpinLockGuard<'a, NoPreemptIrqSave, T>;
