// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

mod ctx;
mod excp;

pub mod instrs;
pub use instrs as asm;

#[cfg(feature = "fp-simd")]
pub use self::ctx::FpState;
pub use self::ctx::{ExceptionContext as TrapFrame, ExceptionContext, TaskContext};

use aarch64_cpu::registers::VBAR_EL1;
use tock_registers::interfaces::Writeable;

unsafe extern "C" {
    fn exception_vector_base();
}

/// Installs the exception vectors on the calling CPU.
pub fn init_trap() {
    VBAR_EL1.set(exception_vector_base as usize as u64);
}
