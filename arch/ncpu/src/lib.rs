// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

#[macro_use]
extern crate log;

#[macro_use]
pub mod trap;

mod active_trapframe;
mod bootstrap;

pub use active_trapframe::{TrapFrameGuard, active_trap_frame, with_active_trap_frame};

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use self::x86_64::*;
    } else if #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))] {
        mod riscv;
        pub use self::riscv::*;
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use self::aarch64::*;
    }
}

#[cfg(test)]
mod tests;
