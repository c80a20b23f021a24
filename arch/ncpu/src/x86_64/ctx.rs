// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Task context switching and the initial-thread frame.

use core::arch::naked_asm;

use memory_addr::VirtAddr;

/// Register snapshot pushed on every exception or interrupt entry.
///
/// The layout matches the save sequence in `trap.S`: general registers
/// pushed by software, then the vector and error code, then the frame the
/// hardware pushed.
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct ExceptionContext {
    /// General register rax.
    pub rax: u64,
    /// General register rcx.
    pub rcx: u64,
    /// General register rdx.
    pub rdx: u64,
    /// General register rbx.
    pub rbx: u64,
    /// Frame pointer.
    pub rbp: u64,
    /// General register rsi.
    pub rsi: u64,
    /// General register rdi.
    pub rdi: u64,
    /// General register r8.
    pub r8: u64,
    /// General register r9.
    pub r9: u64,
    /// General register r10.
    pub r10: u64,
    /// General register r11.
    pub r11: u64,
    /// General register r12.
    pub r12: u64,
    /// General register r13.
    pub r13: u64,
    /// General register r14.
    pub r14: u64,
    /// General register r15.
    pub r15: u64,
    /// Exception vector number.
    pub vector: u64,
    /// Hardware error code, 0 where the CPU pushes none.
    pub error_code: u64,
    /// Interrupted instruction pointer.
    pub rip: u64,
    /// Code segment.
    pub cs: u64,
    /// Saved RFLAGS.
    pub rflags: u64,
    /// Interrupted stack pointer.
    pub rsp: u64,
    /// Stack segment.
    pub ss: u64,
}

/// Registers a suspended task keeps on its own stack, in the order the
/// switch code pops them.
#[repr(C)]
#[derive(Debug, Default)]
struct ContextSwitchFrame {
    r15: u64,
    r14: u64,
    r13: u64,
    r12: u64,
    rbx: u64,
    rbp: u64,
    rip: u64,
}

/// FXSAVE area, 512 bytes.
#[cfg(feature = "fp-simd")]
#[repr(C, align(16))]
#[derive(Debug)]
pub struct FxsaveArea {
    /// x87 control word.
    pub fcw: u16,
    /// x87 status word.
    pub fsw: u16,
    /// x87 tag word.
    pub ftw: u16,
    /// Last x87 opcode.
    pub fop: u16,
    /// Last x87 instruction pointer.
    pub fip: u64,
    /// Last x87 data pointer.
    pub fdp: u64,
    /// SSE control/status.
    pub mxcsr: u32,
    /// Valid MXCSR bits.
    pub mxcsr_mask: u32,
    /// x87/MMX registers.
    pub st: [u128; 8],
    /// SSE registers.
    pub xmm: [u128; 16],
    _reserved: [u128; 6],
}

#[cfg(feature = "fp-simd")]
static_assertions::const_assert_eq!(core::mem::size_of::<FxsaveArea>(), 512);

/// Floating-point and SIMD state of a task.
#[cfg(feature = "fp-simd")]
#[repr(C)]
#[derive(Debug)]
pub struct ExtendedState {
    /// The backing FXSAVE area.
    pub fxsave_area: FxsaveArea,
}

#[cfg(feature = "fp-simd")]
impl ExtendedState {
    #[inline]
    fn save(&mut self) {
        unsafe {
            core::arch::asm!(
                "fxsave64 [{}]",
                in(reg) &raw mut self.fxsave_area,
            );
        }
    }

    #[inline]
    fn restore(&self) {
        unsafe {
            core::arch::asm!(
                "fxrstor64 [{}]",
                in(reg) &raw const self.fxsave_area,
            );
        }
    }

    const fn default() -> Self {
        Self {
            fxsave_area: FxsaveArea {
                fcw: 0x37f,
                fsw: 0,
                ftw: 0,
                fop: 0,
                fip: 0,
                fdp: 0,
                mxcsr: 0x1f80,
                mxcsr_mask: 0,
                st: [0; 8],
                xmm: [0; 16],
                _reserved: [0; 6],
            },
        }
    }
}

/// Saved hardware state of a suspended task.
///
/// The callee-saved registers live in a [`ContextSwitchFrame`] on the
/// task's own stack; the context only records where that stack ended up.
/// The floating-point state is kept here and swapped eagerly on every
/// switch, since FXSAVE/FXRSTOR make that cheap on this architecture.
#[repr(C)]
#[derive(Debug)]
pub struct TaskContext {
    /// Stack pointer after the callee-saved frame was pushed.
    pub rsp: u64,
    /// Extended (FP/SIMD) state.
    #[cfg(feature = "fp-simd")]
    pub ext_state: ExtendedState,
}

impl TaskContext {
    /// Creates an empty context; [`init`](Self::init) must run before the
    /// first switch into it.
    pub const fn new() -> Self {
        Self {
            rsp: 0,
            #[cfg(feature = "fp-simd")]
            ext_state: ExtendedState::default(),
        }
    }

    /// Builds the initial frame so that the first switch into this
    /// context starts `entry(arg)` through the bootstrap trampoline.
    ///
    /// `kstack_top` must point at the end of a stack block owned by this
    /// task.
    pub fn init(&mut self, entry: usize, arg: usize, kstack_top: VirtAddr) {
        let top = kstack_top.as_usize() & !0xf;
        unsafe {
            let frame_ptr = (top as *mut ContextSwitchFrame).sub(1);
            frame_ptr.write(ContextSwitchFrame {
                r15: entry as u64,
                r14: arg as u64,
                rip: task_entry_stub as usize as u64,
                ..Default::default()
            });
            self.rsp = frame_ptr as u64;
        }
    }

    /// Suspends the current task into `self` and resumes `next_ctx`.
    ///
    /// Returns when somebody switches back into `self`. The scheduler
    /// lock must be held across the call; there is no safe preemption
    /// point inside.
    pub fn switch_to(&mut self, next_ctx: &Self) {
        #[cfg(feature = "fp-simd")]
        {
            self.ext_state.save();
            next_ctx.ext_state.restore();
        }
        unsafe { context_switch(&mut self.rsp, &next_ctx.rsp) }
    }
}

/// First instructions of a brand-new task: forward the seeded entry and
/// argument to the common bootstrap.
#[unsafe(naked)]
unsafe extern "C" fn task_entry_stub() {
    naked_asm!(
        "mov  rdi, r15",
        "mov  rsi, r14",
        "xor  rbp, rbp",
        "call {bootstrap}",
        "ud2",
        bootstrap = sym crate::bootstrap::task_bootstrap,
    )
}

#[unsafe(naked)]
unsafe extern "C" fn context_switch(_current_stack: &mut u64, _next_stack: &u64) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov  [rdi], rsp",
        "mov  rsp, [rsi]",
        "pop  r15",
        "pop  r14",
        "pop  r13",
        "pop  r12",
        "pop  rbx",
        "pop  rbp",
        "ret",
    )
}
