// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Architecture-specific interrupt save/restore.
//!
//! Each port encodes "interrupts were enabled" into the saved word so that
//! restore can decide whether to re-enable. Restore never disables: a
//! save/restore pair inside a disabled section leaves it disabled.

#![allow(dead_code)]

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "none", target_arch = "x86_64"))] {
        use core::arch::asm;

        const IF_BIT: usize = 1 << 9;

        #[inline]
        pub fn local_irq_save_and_disable() -> usize {
            let flags: usize;
            unsafe { asm!("pushfq", "pop {}", "cli", out(reg) flags) };
            flags & IF_BIT
        }

        #[inline]
        pub fn local_irq_restore(flags: usize) {
            if flags != 0 {
                unsafe { asm!("sti") };
            }
        }

        #[inline]
        pub fn local_irq_enabled() -> bool {
            let flags: usize;
            unsafe { asm!("pushfq", "pop {}", out(reg) flags) };
            flags & IF_BIT != 0
        }
    } else if #[cfg(all(target_os = "none", target_arch = "aarch64"))] {
        use core::arch::asm;

        const DAIF_I_BIT: usize = 1 << 7;

        #[inline]
        pub fn local_irq_save_and_disable() -> usize {
            let flags: usize;
            unsafe { asm!("mrs {}, daif", "msr daifset, #2", out(reg) flags) };
            flags
        }

        #[inline]
        pub fn local_irq_restore(flags: usize) {
            unsafe { asm!("msr daif, {}", in(reg) flags) };
        }

        #[inline]
        pub fn local_irq_enabled() -> bool {
            let flags: usize;
            unsafe { asm!("mrs {}, daif", out(reg) flags) };
            flags & DAIF_I_BIT == 0
        }
    } else if #[cfg(all(target_os = "none", any(target_arch = "riscv32", target_arch = "riscv64")))] {
        use core::arch::asm;

        const SIE_BIT: usize = 1 << 1;

        #[inline]
        pub fn local_irq_save_and_disable() -> usize {
            let flags: usize;
            // Clear SIE and read the previous sstatus in one instruction.
            unsafe { asm!("csrrc {}, sstatus, {}", out(reg) flags, in(reg) SIE_BIT) };
            flags & SIE_BIT
        }

        #[inline]
        pub fn local_irq_restore(flags: usize) {
            if flags != 0 {
                unsafe { asm!("csrs sstatus, {}", in(reg) SIE_BIT) };
            }
        }

        #[inline]
        pub fn local_irq_enabled() -> bool {
            let flags: usize;
            unsafe { asm!("csrr {}, sstatus", out(reg) flags) };
            flags & SIE_BIT != 0
        }
    } else {
        // Hosted targets have no hardware interrupt state; a process-wide
        // flag follows the same save/restore rules so the nesting behavior
        // is observable in tests.
        use core::sync::atomic::{AtomicBool, Ordering};

        static FAKE_IRQ_ENABLED: AtomicBool = AtomicBool::new(true);

        #[inline]
        pub fn local_irq_save_and_disable() -> usize {
            usize::from(FAKE_IRQ_ENABLED.swap(false, Ordering::Relaxed))
        }

        #[inline]
        pub fn local_irq_restore(flags: usize) {
            if flags != 0 {
                FAKE_IRQ_ENABLED.store(true, Ordering::Relaxed);
            }
        }

        #[inline]
        pub fn local_irq_enabled() -> bool {
            FAKE_IRQ_ENABLED.load(Ordering::Relaxed)
        }
    }
}
