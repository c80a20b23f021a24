// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Compile-time configuration of the kernel core.
//!
//! These constants stand in for a board configuration system: every value
//! here is fixed at build time and consumed by the other crates in the
//! workspace. Nothing in the core reads configuration at runtime.

#![no_std]

/// Hard upper bound on the number of CPUs the kernel is built to manage.
///
/// Per-CPU state tables are sized with this constant; the number of CPUs
/// actually brought up is clamped to it.
pub const SMP_MAX_CPUS: usize = 8;

/// Number of CPUs the current platform configuration expects to bring up,
/// including the boot CPU.
pub const CPU_NUM: usize = 4;

/// Size of each kernel task stack, in bytes.
pub const TASK_STACK_SIZE: usize = 0x10000;

/// Number of entries in the interrupt vector table.
pub const MAX_IRQ_COUNT: usize = 1024;

/// Software-generated vector reserved for cross-CPU notifications.
///
/// The platform maps this onto its controller's software-interrupt
/// mechanism (SGI on GIC, SSIP on RISC-V, a free IDT vector on x86).
pub const IPI_IRQ: usize = 0;

/// Required alignment of task stacks, in bytes.
pub const STACK_ALIGN: usize = 16;

const _: () = assert!(CPU_NUM >= 1 && CPU_NUM <= SMP_MAX_CPUS);
const _: () = assert!(TASK_STACK_SIZE % STACK_ALIGN == 0);
