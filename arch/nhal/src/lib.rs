// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Hardware abstraction layer of the nucleus kernel.
//!
//! Everything above this crate is architecture- and platform-agnostic:
//! [`irq`] owns the interrupt vector table and the fixed entry/exit
//! protocol every hardware interrupt runs through, and [`percpu`] owns the
//! per-CPU records and the secondary-CPU boot gate. The architecture
//! specifics live in [`ncpu`], the board specifics behind the [`nplat`]
//! interfaces.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

extern crate alloc;

pub mod irq;
pub mod percpu;

#[cfg(any(test, not(target_os = "none"), feature = "dummy-plat"))]
mod dummy;

#[cfg(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv32",
    target_arch = "riscv64"
))]
pub use ncpu::{ExceptionContext, TaskContext, TrapFrame, asm, init_trap};
