// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

#[macro_use]
mod macros;

mod ctx;
mod excp;

pub mod instrs;
pub use instrs as asm;

#[cfg(feature = "fp-simd")]
pub use self::ctx::FpState;
pub use self::ctx::{ExceptionContext as TrapFrame, ExceptionContext, GeneralRegisters, TaskContext};

use core::arch::asm;

unsafe extern "C" {
    fn trap_vector_base();
}

/// Installs the trap vector on the calling hart.
pub fn init_trap() {
    // Direct mode: all traps funnel through one base.
    unsafe { asm!("csrw stvec, {}", in(reg) trap_vector_base as usize) };
}
