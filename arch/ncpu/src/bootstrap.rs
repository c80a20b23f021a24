// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Common tail of the per-architecture thread bootstrap.

use crate_interface::call_interface;

/// First Rust code a brand-new thread runs.
///
/// A fresh thread has no suspended execution to return into, so its
/// initial context is built to land here, with `entry` and `arg` carried
/// over in callee-saved registers by the per-architecture stub. The
/// reschedule that first ran this thread left the scheduler lock held and
/// interrupts off; both are undone before the thread's real entry point
/// gets control. If the entry function returns, its result code goes to
/// the scheduler's thread-exit path.
pub(crate) extern "C" fn task_bootstrap(entry: usize, arg: usize) -> ! {
    call_interface!(nsched::SchedulerIf::sched_unlock_first_run);
    #[cfg(target_os = "none")]
    crate::asm::enable_irqs();

    debug_assert_ne!(entry, 0);
    let entry: extern "C" fn(usize) -> i32 = unsafe { core::mem::transmute(entry) };
    let code = entry(arg);

    call_interface!(nsched::SchedulerIf::exit_current, code)
}
