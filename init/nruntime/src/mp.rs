// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! SMP bring-up helpers for the runtime.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate_interface::call_interface;
use nconfig::{CPU_NUM, TASK_STACK_SIZE};
use nplat::boot::BootHandler;
use nplat::sys::SysCtrl;
use nsched::SchedulerIf;

use crate::{INITED_CPUS, is_init_ok};

#[repr(align(16))]
struct BootStacks(UnsafeCell<[[u8; TASK_STACK_SIZE]; CPU_NUM - 1]>);

// Written only by the secondary that runs on each stack.
unsafe impl Sync for BootStacks {}

#[unsafe(link_section = ".bss.stack")]
static SECONDARY_BOOT_STACK: BootStacks =
    BootStacks(UnsafeCell::new([[0; TASK_STACK_SIZE]; CPU_NUM - 1]));

static ENTERED_CPUS: AtomicUsize = AtomicUsize::new(1);

/// Starts all secondary CPUs and waits until each enters the runtime.
///
/// The per-CPU record arena is allocated and published through the boot
/// gate before any secondary is told to run: a secondary's first look at
/// shared state must already be consistent.
pub fn start_secondary_cpus(primary_cpu_id: usize) {
    nhal::percpu::alloc_secondary_records(CPU_NUM - 1);
    nhal::percpu::release_secondaries();

    let mut logic_cpu_id = 0;
    for i in 0..CPU_NUM {
        if i != primary_cpu_id && logic_cpu_id < CPU_NUM - 1 {
            let stack_top = unsafe {
                (SECONDARY_BOOT_STACK.0.get() as *mut [u8; TASK_STACK_SIZE])
                    .add(logic_cpu_id + 1)
            } as usize;

            debug!("starting CPU {i}...");
            call_interface!(nplat::sys::SysCtrl::boot_ap, i, stack_top);
            logic_cpu_id += 1;

            while ENTERED_CPUS.load(Ordering::Acquire) <= logic_cpu_id {
                core::hint::spin_loop();
            }
        }
    }
}

#[unsafe(no_mangle)]
extern "Rust" fn __nucleus_main_secondary(cpu_id: usize) -> ! {
    rust_main_secondary(cpu_id)
}

/// The main entry point of the runtime for secondary cores.
///
/// Called from the bootstrapping code in the platform crate. Runs only
/// the secondary-safe subset of initialization, then parks in the
/// scheduler's idle loop.
pub fn rust_main_secondary(cpu_id: usize) -> ! {
    // The record arena may not be visible yet; hold at the gate.
    nhal::percpu::wait_for_release();
    nhal::percpu::init_secondary(cpu_id, cpu_id);
    call_interface!(nplat::boot::BootHandler::early_init_ap, cpu_id);

    nhal::init_trap();

    ENTERED_CPUS.fetch_add(1, Ordering::Release);
    info!("Secondary CPU {cpu_id} started.");

    call_interface!(nplat::boot::BootHandler::final_init_ap, cpu_id);

    nipi::init();

    info!("Secondary CPU {cpu_id} init OK.");
    INITED_CPUS.fetch_add(1, Ordering::Release);

    while !is_init_ok() {
        core::hint::spin_loop();
    }

    nhal::asm::enable_irqs();

    call_interface!(nsched::SchedulerIf::run_idle)
}
