// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

mod ctx;
mod excp;
mod idt;

pub mod instrs;
pub use instrs as asm;

#[cfg(feature = "fp-simd")]
pub use self::ctx::{ExtendedState, FxsaveArea};
pub use self::ctx::{ExceptionContext as TrapFrame, ExceptionContext, TaskContext};

/// Installs the exception vectors on the calling CPU.
pub fn init_trap() {
    idt::init_idt();
}
