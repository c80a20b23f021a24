// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! No-op implementations of the platform interfaces defined in [`nplat`].
//!
//! Linked on hosted builds and when no real platform crate is selected,
//! so the rest of the kernel can be built and tested without a board.

use nplat::boot::BootHandler;
use nplat::impl_dev_interface;
use nplat::interrupts::{IntrManager, TargetCpu};
use nplat::io::Terminal;
use nplat::sys::SysCtrl;
use nplat::timer::SysTimer;

struct DummyInit;
struct DummyConsole;
struct DummyTime;
struct DummyPower;
struct DummyIrq;

#[impl_dev_interface]
impl BootHandler for DummyInit {
    fn early_init(_cpu_id: usize, _arg: usize) {}

    fn final_init(_cpu_id: usize, _arg: usize) {}

    #[cfg(feature = "smp")]
    fn early_init_ap(_cpu_id: usize) {}

    #[cfg(feature = "smp")]
    fn final_init_ap(_cpu_id: usize) {}
}

#[impl_dev_interface]
impl Terminal for DummyConsole {
    fn write_data(_bytes: &[u8]) {}

    fn read_data(_bytes: &mut [u8]) -> usize {
        0
    }
}

#[impl_dev_interface]
impl SysTimer for DummyTime {
    fn now_ns() -> u64 {
        0
    }
}

#[impl_dev_interface]
impl SysCtrl for DummyPower {
    #[cfg(feature = "smp")]
    fn boot_ap(_cpu_id: usize, _stack_top_paddr: usize) {}

    fn shutdown() -> ! {
        unimplemented!()
    }
}

#[impl_dev_interface]
impl IntrManager for DummyIrq {
    fn enable(_irq: usize, _enabled: bool) {}

    // Identity vectoring: the raw cause already is the vector number.
    fn dispatch_irq(irq: usize) -> Option<usize> {
        Some(irq)
    }

    fn notify_cpu(_irq: usize, _target: TargetCpu) {}

    fn set_prio(_irq: usize, _priority: u8) {}
}
