// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Active trapframe tracking.
//!
//! Exposes the register snapshot of the innermost trap the current CPU is
//! handling, so fault paths and debug dumps can reach the interrupted
//! context. One pointer per CPU; nested traps save and restore it through
//! [`TrapFrameGuard`].

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::ExceptionContext;

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        /// Pointer to the active trapframe; 0 means "not in a trap".
        #[percpu::def_percpu]
        static ACTIVE_TRAP_FRAME: AtomicUsize = AtomicUsize::new(0);

        #[inline]
        fn frame_cell() -> &'static AtomicUsize {
            unsafe { ACTIVE_TRAP_FRAME.current_ref_raw() }
        }
    } else {
        // Hosted builds never take traps; a plain static keeps the API
        // compilable.
        static ACTIVE_TRAP_FRAME: AtomicUsize = AtomicUsize::new(0);

        #[inline]
        fn frame_cell() -> &'static AtomicUsize {
            &ACTIVE_TRAP_FRAME
        }
    }
}

/// Returns the currently active trapframe, if any.
///
/// The returned reference is only valid while the CPU is still inside the
/// trap whose frame it is; treat it as a snapshot, do not store it.
#[inline]
pub fn active_trap_frame() -> Option<&'static ExceptionContext> {
    let ptr = frame_cell().load(Ordering::Relaxed);
    if ptr == 0 {
        None
    } else {
        Some(unsafe { &*(ptr as *const ExceptionContext) })
    }
}

/// Calls `f` with the currently active trapframe.
#[inline]
pub fn with_active_trap_frame<T>(f: impl FnOnce(Option<&ExceptionContext>) -> T) -> T {
    f(active_trap_frame())
}

/// Marks `tf` as the active trapframe for the current scope.
///
/// Used at the top of every trap dispatcher; dropping the guard restores
/// whatever frame an enclosing trap had published.
pub struct TrapFrameGuard {
    prev: usize,
}

impl TrapFrameGuard {
    /// Publishes `tf` and returns the restoring guard.
    #[inline]
    pub fn new(tf: &ExceptionContext) -> Self {
        let ptr = tf as *const ExceptionContext as usize;
        let prev = frame_cell().swap(ptr, Ordering::Relaxed);
        Self { prev }
    }
}

impl Drop for TrapFrameGuard {
    #[inline]
    fn drop(&mut self) {
        frame_cell().store(self.prev, Ordering::Relaxed);
    }
}
