// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Runtime bring-up of the nucleus kernel.
//!
//! The platform's bootstrapping code jumps into [`rust_main`] on the boot
//! CPU and, with the `smp` feature, into [`rust_main_secondary`] on every
//! other CPU. The runtime wires the console into the logger, installs the
//! trap vectors, registers the IPI vector, starts the secondaries and
//! finally hands over to the external application's `main`.
//!
//! # Cargo Features
//!
//! - `smp`: bring up secondary CPUs and enable IPIs.
//! - `fp-simd`: floating-point context tracking in the architecture layer.
//! - `preempt`: preemption control hooks in the spinlock guards.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate nlog;

use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(all(target_os = "none", not(test)))]
mod lang_items;

#[cfg(target_os = "none")]
mod boot;

#[cfg(all(feature = "smp", target_os = "none"))]
mod mp;

#[cfg(target_os = "none")]
pub use boot::rust_main;
#[cfg(all(feature = "smp", target_os = "none"))]
pub use mp::rust_main_secondary;

static INITED_CPUS: AtomicUsize = AtomicUsize::new(0);

const fn expected_cpus() -> usize {
    if cfg!(feature = "smp") {
        nconfig::CPU_NUM
    } else {
        1
    }
}

fn is_init_ok() -> bool {
    INITED_CPUS.load(Ordering::Acquire) == expected_cpus()
}

struct LogIfImpl;

#[crate_interface::impl_interface]
impl nlog::LogSink for LogIfImpl {
    fn write_str(s: &str) {
        crate_interface::call_interface!(nplat::io::Terminal::write_data, s.as_bytes());
    }

    fn now() -> core::time::Duration {
        core::time::Duration::from_nanos(crate_interface::call_interface!(
            nplat::timer::SysTimer::now_ns
        ))
    }

    fn cpu_id() -> Option<usize> {
        if is_init_ok() {
            Some(nhal::percpu::this_cpu_id())
        } else {
            None
        }
    }

    fn task_id() -> Option<u64> {
        if is_init_ok() {
            Some(nsched::current_thread_id())
        } else {
            None
        }
    }
}
