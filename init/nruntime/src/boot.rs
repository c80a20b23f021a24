// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Boot-CPU bring-up.

use core::sync::atomic::Ordering;

use crate_interface::call_interface;
use nplat::boot::BootHandler;
use nsched::SchedulerIf;

use crate::{INITED_CPUS, is_init_ok};

const BANNER: &str = r"
                     _
  _ __  _   _  ___ | | ___ _   _ ___
 | '_ \| | | |/ __|| |/ _ \ | | / __|
 | | | | |_| | (__ | |  __/ |_| \__ \
 |_| |_|\__,_|\___||_|\___|\__,_|___/
";

const ARCH: &str = if cfg!(target_arch = "x86_64") {
    "x86_64"
} else if cfg!(target_arch = "aarch64") {
    "aarch64"
} else if cfg!(target_arch = "riscv64") {
    "riscv64"
} else if cfg!(target_arch = "riscv32") {
    "riscv32"
} else {
    "unknown"
};

unsafe extern "C" {
    /// Application's entry point.
    fn main();
}

#[unsafe(no_mangle)]
extern "Rust" fn __nucleus_main(cpu_id: usize, arg: usize) -> ! {
    rust_main(cpu_id, arg)
}

/// The main entry point of the runtime.
///
/// Called from the bootstrapping code in the platform crate with the
/// logical id of the boot CPU and the boot argument (typically a device
/// tree blob address). In a multi-core configuration the secondary cores
/// go through [`rust_main_secondary`](crate::rust_main_secondary)
/// instead.
pub fn rust_main(cpu_id: usize, arg: usize) -> ! {
    nhal::percpu::init_primary(cpu_id, cpu_id);
    call_interface!(nplat::boot::BootHandler::early_init, cpu_id, arg);

    kprintln!("{}", BANNER);
    kprintln!(
        "arch = {}\nbuild_mode = {}\nlog_level = {}\nsmp = {}\n",
        ARCH,
        if cfg!(debug_assertions) { "debug" } else { "release" },
        option_env!("NUCLEUS_LOG").unwrap_or("warn"),
        crate::expected_cpus(),
    );

    nlog::init();
    nlog::set_log_level(option_env!("NUCLEUS_LOG").unwrap_or(""));
    info!("Logging is enabled.");
    info!("Primary CPU {cpu_id} started, arg = {arg:#x}.");

    nhal::init_trap();

    info!("Initialize platform devices...");
    call_interface!(nplat::boot::BootHandler::final_init, cpu_id, arg);

    init_interrupt();

    #[cfg(feature = "smp")]
    {
        nipi::init();
        crate::mp::start_secondary_cpus(cpu_id);
    }

    info!("Primary CPU {cpu_id} init OK.");
    INITED_CPUS.fetch_add(1, Ordering::Release);

    while !is_init_ok() {
        core::hint::spin_loop();
    }

    // All CPUs are up; interrupts may flow before the app starts.
    nhal::asm::enable_irqs();

    unsafe { main() };

    call_interface!(nsched::SchedulerIf::exit_current, 0)
}

#[cfg(feature = "smp")]
fn ipi_vector_entry(_arg: usize) -> bool {
    nipi::ipi_handler()
}

fn init_interrupt() {
    info!("Initialize interrupt handlers...");
    #[cfg(feature = "smp")]
    if !nhal::irq::register(nconfig::IPI_IRQ, ipi_vector_entry, 0) {
        panic!("failed to register the IPI vector");
    }
}
