// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Trap handler fan-out.
//!
//! The architecture layer delivers hardware interrupts to whoever
//! registered on the [`IRQ`] slice; the HAL's interrupt entry/exit
//! protocol lives there. Registration is a link-time slice element, not a
//! runtime call:
//!
//! ```ignore
//! #[linkme::distributed_slice(ncpu::trap::IRQ)]
//! static IRQ_ENTRY: fn(usize) -> bool = my_irq_handler;
//! ```
//!
//! Hard faults are not fanned out; each architecture's dispatcher dumps
//! the exception frame and panics.

pub use linkme::distributed_slice as register_trap_handler;

/// Hardware interrupt handlers. The argument is the raw, architecture
/// specific trap cause; the return value reports whether a reschedule
/// should happen on interrupt exit.
#[linkme::distributed_slice]
pub static IRQ: [fn(usize) -> bool] = [..];

bitflags::bitflags! {
    /// Decoded access kind of a faulting memory operation, for fault
    /// diagnostics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFaultFlags: u32 {
        /// The fault was caused by a read.
        const READ = 1 << 0;
        /// The fault was caused by a write.
        const WRITE = 1 << 1;
        /// The fault was caused by an instruction fetch.
        const EXECUTE = 1 << 2;
        /// The fault came from unprivileged mode.
        const USER = 1 << 3;
    }
}

/// Invokes the first registered handler on a trap slice.
macro_rules! dispatch_trap {
    ($trap:ident, $($args:tt)*) => {{
        let mut iter = $crate::trap::$trap.iter();
        if let Some(func) = iter.next() {
            if iter.next().is_some() {
                warn!(
                    "Multiple handlers registered for trap {}, only the first is used.",
                    stringify!($trap)
                );
            }
            func($($args)*)
        } else {
            warn!("No registered handler for trap {}", stringify!($trap));
            false
        }
    }};
}
