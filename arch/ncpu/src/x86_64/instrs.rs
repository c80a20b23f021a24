// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Privileged and synchronization instructions.

use core::arch::asm;

const IF_BIT: u64 = 1 << 9;

/// Allows the current CPU to respond to interrupts.
#[inline]
pub fn enable_irqs() {
    unsafe { asm!("sti") }
}

/// Makes the current CPU ignore interrupts.
#[inline]
pub fn disable_irqs() {
    unsafe { asm!("cli") }
}

/// Whether the current CPU is responding to interrupts.
#[inline]
pub fn irqs_enabled() -> bool {
    let flags: u64;
    unsafe { asm!("pushfq", "pop {}", out(reg) flags) };
    flags & IF_BIT != 0
}

/// Disables interrupts, returning an opaque token for
/// [`irqs_restore`].
#[inline]
pub fn irqs_save_disable() -> usize {
    let flags: u64;
    unsafe { asm!("pushfq", "pop {}", "cli", out(reg) flags) };
    (flags & IF_BIT) as usize
}

/// Restores the interrupt-enable state captured by
/// [`irqs_save_disable`]. Only re-enables; never disables.
#[inline]
pub fn irqs_restore(token: usize) {
    if token != 0 {
        unsafe { asm!("sti") };
    }
}

/// Sleeps until the next interrupt arrives. Interrupts are enabled for
/// the wait even if the caller had them disabled.
#[inline]
pub fn wait_for_irqs() {
    unsafe { asm!("sti", "hlt") }
}

/// Stops the current CPU with interrupts off.
#[inline]
pub fn halt() -> ! {
    loop {
        unsafe { asm!("cli", "hlt") };
    }
}

/// Signals other CPUs waiting in [`wait_for_event`]. No hardware event
/// mechanism on x86; waiters poll.
#[inline]
pub fn send_event() {}

/// Pauses until another CPU signals an event. Degrades to a pause hint.
#[inline]
pub fn wait_for_event() {
    core::hint::spin_loop();
}

/// Relaxes the CPU inside a spin loop.
#[inline]
pub fn cpu_relax() {
    core::hint::spin_loop();
}
