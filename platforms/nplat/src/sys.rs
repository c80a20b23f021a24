// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Power and CPU control interface.

/// System-level control operations.
#[crate_interface::def_interface]
pub trait SysCtrl {
    /// Starts the given secondary CPU with its boot stack.
    #[cfg(feature = "smp")]
    fn boot_ap(cpu_id: usize, stack_top_paddr: usize);

    /// Shuts down or halts the whole system. Does not return.
    fn shutdown() -> !;
}
