// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Platform boot hooks.

/// Early and late platform initialization, called by the runtime around
/// core bring-up.
#[crate_interface::def_interface]
pub trait BootHandler {
    /// Runs before anything else on the boot CPU (console, early clocks).
    fn early_init(cpu_id: usize, arg: usize);

    /// Runs after the core is up on the boot CPU (interrupt controller,
    /// remaining devices).
    fn final_init(cpu_id: usize, arg: usize);

    /// Early per-CPU initialization on a secondary CPU.
    #[cfg(feature = "smp")]
    fn early_init_ap(cpu_id: usize);

    /// Late per-CPU initialization on a secondary CPU.
    #[cfg(feature = "smp")]
    fn final_init_ap(cpu_id: usize);
}
