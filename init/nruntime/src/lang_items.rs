// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    kprintln!("{}", info);
    // If the panic came out of a trap, the interrupted registers tell the
    // real story; dump them before halting.
    ncpu::with_active_trap_frame(|tf| {
        if let Some(tf) = tf {
            kprintln!("{:#x?}", tf);
        }
    });
    crate_interface::call_interface!(nplat::sys::SysCtrl::shutdown)
}
