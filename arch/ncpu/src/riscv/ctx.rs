// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Task context switching and the initial-thread frame.

use core::arch::naked_asm;

use memory_addr::VirtAddr;

/// General registers of RISC-V, in trap-frame order.
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct GeneralRegisters {
    pub ra: usize,
    pub sp: usize,
    pub gp: usize,
    pub tp: usize,
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    pub s0: usize,
    pub s1: usize,
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
    pub a6: usize,
    pub a7: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
    pub t3: usize,
    pub t4: usize,
    pub t5: usize,
    pub t6: usize,
}

/// Register snapshot pushed on every trap entry; layout matches the save
/// sequence in `trap.S`.
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct ExceptionContext {
    /// General registers; the `sp` slot holds the pre-trap stack pointer.
    pub regs: GeneralRegisters,
    /// Interrupted program counter.
    pub sepc: usize,
    /// Saved supervisor status.
    pub sstatus: usize,
    // Keeps the frame a multiple of 16 bytes so the trap entry preserves
    // stack alignment.
    _pad: [usize; 3],
}

static_assertions::const_assert_eq!(
    core::mem::size_of::<ExceptionContext>() % 16,
    0
);

/// Floating-point register state (D extension).
#[cfg(feature = "fp-simd")]
#[repr(C)]
#[derive(Debug)]
pub struct FpState {
    /// Registers f0..f31.
    pub regs: [u64; 32],
    /// Floating-point control and status.
    pub fcsr: u32,
}

#[cfg(feature = "fp-simd")]
impl FpState {
    const fn new() -> Self {
        Self {
            regs: [0; 32],
            fcsr: 0,
        }
    }
}

/// Saved hardware state of a suspended task.
///
/// Callee-saved registers are stored in the structure itself by the
/// switch code. Floating-point registers are spilled only when sstatus
/// reports them dirty, so tasks that never touch the FPU never pay for
/// it.
#[repr(C)]
#[derive(Debug)]
pub struct TaskContext {
    /// Return address of the suspended task.
    pub ra: usize,
    /// Saved stack pointer.
    pub sp: usize,
    /// Callee-saved registers s0..s11.
    pub s0: usize,
    pub s1: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
    /// Lazily saved floating-point state.
    #[cfg(feature = "fp-simd")]
    pub fp_state: FpState,
}

impl TaskContext {
    /// Creates an empty context; [`init`](Self::init) must run before the
    /// first switch into it.
    pub const fn new() -> Self {
        Self {
            ra: 0,
            sp: 0,
            s0: 0,
            s1: 0,
            s2: 0,
            s3: 0,
            s4: 0,
            s5: 0,
            s6: 0,
            s7: 0,
            s8: 0,
            s9: 0,
            s10: 0,
            s11: 0,
            #[cfg(feature = "fp-simd")]
            fp_state: FpState::new(),
        }
    }

    /// Builds the initial state so that the first switch into this
    /// context starts `entry(arg)` through the bootstrap trampoline.
    pub fn init(&mut self, entry: usize, arg: usize, kstack_top: VirtAddr) {
        self.sp = kstack_top.as_usize() & !0xf;
        self.ra = task_entry_stub as usize;
        self.s0 = entry;
        self.s1 = arg;
    }

    /// Suspends the current task into `self` and resumes `next_ctx`.
    ///
    /// Returns when somebody switches back into `self`. The scheduler
    /// lock must be held across the call.
    pub fn switch_to(&mut self, next_ctx: &Self) {
        #[cfg(all(feature = "fp-simd", target_os = "none"))]
        {
            fp::save_if_dirty(&mut self.fp_state);
            fp::restore(&next_ctx.fp_state);
        }
        unsafe { context_switch(self, next_ctx) }
    }
}

/// First instructions of a brand-new task: forward the seeded entry and
/// argument to the common bootstrap.
#[unsafe(naked)]
unsafe extern "C" fn task_entry_stub() {
    naked_asm!(
        "mv   a0, s0",
        "mv   a1, s1",
        "call {bootstrap}",
        "unimp",
        bootstrap = sym crate::bootstrap::task_bootstrap,
    )
}

#[unsafe(naked)]
unsafe extern "C" fn context_switch(_current: &mut TaskContext, _next: &TaskContext) {
    naked_asm!(
        include_asm_macros!(),
        "STR  ra, a0, 0",
        "STR  sp, a0, 1",
        "STR  s0, a0, 2",
        "STR  s1, a0, 3",
        "STR  s2, a0, 4",
        "STR  s3, a0, 5",
        "STR  s4, a0, 6",
        "STR  s5, a0, 7",
        "STR  s6, a0, 8",
        "STR  s7, a0, 9",
        "STR  s8, a0, 10",
        "STR  s9, a0, 11",
        "STR  s10, a0, 12",
        "STR  s11, a0, 13",
        "LDR  s11, a1, 13",
        "LDR  s10, a1, 12",
        "LDR  s9, a1, 11",
        "LDR  s8, a1, 10",
        "LDR  s7, a1, 9",
        "LDR  s6, a1, 8",
        "LDR  s5, a1, 7",
        "LDR  s4, a1, 6",
        "LDR  s3, a1, 5",
        "LDR  s2, a1, 4",
        "LDR  s1, a1, 3",
        "LDR  s0, a1, 2",
        "LDR  sp, a1, 1",
        "LDR  ra, a1, 0",
        "ret",
    )
}

#[cfg(all(feature = "fp-simd", target_os = "none"))]
mod fp {
    use core::arch::{asm, naked_asm};

    use super::FpState;

    const SSTATUS_FS_MASK: usize = 0b11 << 13;
    const SSTATUS_FS_DIRTY: usize = 0b11 << 13;
    const SSTATUS_FS_CLEAN: usize = 0b10 << 13;

    fn fs_bits() -> usize {
        let sstatus: usize;
        unsafe { asm!("csrr {}, sstatus", out(reg) sstatus) };
        sstatus & SSTATUS_FS_MASK
    }

    fn set_fs_clean() {
        unsafe {
            asm!(
                "csrc sstatus, {dirty}",
                "csrs sstatus, {clean}",
                dirty = in(reg) SSTATUS_FS_MASK,
                clean = in(reg) SSTATUS_FS_CLEAN,
            )
        };
    }

    /// Spills the FP registers only when the hardware marked them dirty
    /// since the last switch.
    pub(super) fn save_if_dirty(state: &mut FpState) {
        if fs_bits() == SSTATUS_FS_DIRTY {
            unsafe { fpstate_save(state) };
            set_fs_clean();
        }
    }

    pub(super) fn restore(state: &FpState) {
        unsafe { fpstate_restore(state) };
        set_fs_clean();
    }

    #[unsafe(naked)]
    unsafe extern "C" fn fpstate_save(_state: &mut FpState) {
        naked_asm!(
            "fsd  f0, 0 * 8(a0)",
            "fsd  f1, 1 * 8(a0)",
            "fsd  f2, 2 * 8(a0)",
            "fsd  f3, 3 * 8(a0)",
            "fsd  f4, 4 * 8(a0)",
            "fsd  f5, 5 * 8(a0)",
            "fsd  f6, 6 * 8(a0)",
            "fsd  f7, 7 * 8(a0)",
            "fsd  f8, 8 * 8(a0)",
            "fsd  f9, 9 * 8(a0)",
            "fsd  f10, 10 * 8(a0)",
            "fsd  f11, 11 * 8(a0)",
            "fsd  f12, 12 * 8(a0)",
            "fsd  f13, 13 * 8(a0)",
            "fsd  f14, 14 * 8(a0)",
            "fsd  f15, 15 * 8(a0)",
            "fsd  f16, 16 * 8(a0)",
            "fsd  f17, 17 * 8(a0)",
            "fsd  f18, 18 * 8(a0)",
            "fsd  f19, 19 * 8(a0)",
            "fsd  f20, 20 * 8(a0)",
            "fsd  f21, 21 * 8(a0)",
            "fsd  f22, 22 * 8(a0)",
            "fsd  f23, 23 * 8(a0)",
            "fsd  f24, 24 * 8(a0)",
            "fsd  f25, 25 * 8(a0)",
            "fsd  f26, 26 * 8(a0)",
            "fsd  f27, 27 * 8(a0)",
            "fsd  f28, 28 * 8(a0)",
            "fsd  f29, 29 * 8(a0)",
            "fsd  f30, 30 * 8(a0)",
            "fsd  f31, 31 * 8(a0)",
            "frcsr t0",
            "sw   t0, 32 * 8(a0)",
            "ret",
        )
    }

    #[unsafe(naked)]
    unsafe extern "C" fn fpstate_restore(_state: &FpState) {
        naked_asm!(
            "lw   t0, 32 * 8(a0)",
            "fscsr t0",
            "fld  f0, 0 * 8(a0)",
            "fld  f1, 1 * 8(a0)",
            "fld  f2, 2 * 8(a0)",
            "fld  f3, 3 * 8(a0)",
            "fld  f4, 4 * 8(a0)",
            "fld  f5, 5 * 8(a0)",
            "fld  f6, 6 * 8(a0)",
            "fld  f7, 7 * 8(a0)",
            "fld  f8, 8 * 8(a0)",
            "fld  f9, 9 * 8(a0)",
            "fld  f10, 10 * 8(a0)",
            "fld  f11, 11 * 8(a0)",
            "fld  f12, 12 * 8(a0)",
            "fld  f13, 13 * 8(a0)",
            "fld  f14, 14 * 8(a0)",
            "fld  f15, 15 * 8(a0)",
            "fld  f16, 16 * 8(a0)",
            "fld  f17, 17 * 8(a0)",
            "fld  f18, 18 * 8(a0)",
            "fld  f19, 19 * 8(a0)",
            "fld  f20, 20 * 8(a0)",
            "fld  f21, 21 * 8(a0)",
            "fld  f22, 22 * 8(a0)",
            "fld  f23, 23 * 8(a0)",
            "fld  f24, 24 * 8(a0)",
            "fld  f25, 25 * 8(a0)",
            "fld  f26, 26 * 8(a0)",
            "fld  f27, 27 * 8(a0)",
            "fld  f28, 28 * 8(a0)",
            "fld  f29, 29 * 8(a0)",
            "fld  f30, 30 * 8(a0)",
            "fld  f31, 31 * 8(a0)",
            "ret",
        )
    }
}
