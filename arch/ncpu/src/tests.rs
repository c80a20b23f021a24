// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Host-side tests of the context switch and the thread bootstrap.
//!
//! The register save/restore path is unprivileged, so a freshly built
//! context can be entered and left on an ordinary host thread, with the
//! std-thread scheduler from `nsched` standing in for the real one.

#![cfg(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv32",
    target_arch = "riscv64"
))]

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use memory_addr::VirtAddr;

use crate::TaskContext;

struct CtxCell(UnsafeCell<TaskContext>);
unsafe impl Sync for CtxCell {}

impl CtxCell {
    const fn new() -> Self {
        Self(UnsafeCell::new(TaskContext::new()))
    }

    fn get(&self) -> *mut TaskContext {
        self.0.get()
    }
}

fn stack_top(stack: &mut Vec<u128>) -> VirtAddr {
    let top = unsafe { stack.as_mut_ptr().add(stack.len()) } as usize;
    VirtAddr::from(top & !0xf)
}

// --- bootstrap: entry runs once, return code reaches exit_current ---

static BOOT_MAIN: CtxCell = CtxCell::new();
static BOOT_TASK: CtxCell = CtxCell::new();
static ENTRY_RUNS: AtomicUsize = AtomicUsize::new(0);
static ENTRY_ARG: AtomicUsize = AtomicUsize::new(0);
static EXIT_CODE: AtomicI32 = AtomicI32::new(0);

extern "C" fn boot_entry(arg: usize) -> i32 {
    ENTRY_RUNS.fetch_add(1, Ordering::SeqCst);
    ENTRY_ARG.store(arg, Ordering::SeqCst);
    42
}

fn exit_back_to_main(code: i32) -> ! {
    EXIT_CODE.store(code, Ordering::SeqCst);
    unsafe { (*BOOT_TASK.get()).switch_to(&*BOOT_MAIN.get()) };
    unreachable!("exited context was resumed");
}

#[test]
fn bootstrap_runs_entry_once_then_exits() {
    nsched::host::set_exit_hook(exit_back_to_main);

    let mut stack = vec![0u128; 4096];
    unsafe {
        (*BOOT_TASK.get()).init(boot_entry as usize, 0x1234, stack_top(&mut stack));
        (*BOOT_MAIN.get()).switch_to(&*BOOT_TASK.get());
    }

    assert_eq!(ENTRY_RUNS.load(Ordering::SeqCst), 1);
    assert_eq!(ENTRY_ARG.load(Ordering::SeqCst), 0x1234);
    assert_eq!(EXIT_CODE.load(Ordering::SeqCst), 42);
}

// --- round trip: registers and stack survive switching out and back ---

static PP_MAIN: CtxCell = CtxCell::new();
static PP_TASK: CtxCell = CtxCell::new();
static PONGS: AtomicUsize = AtomicUsize::new(0);

extern "C" fn pingpong_entry(step: usize) -> i32 {
    // Locals in callee-saved registers and on the stack must survive
    // every switch for the loop to count correctly.
    let mut local = 0usize;
    loop {
        local += step;
        PONGS.store(local, Ordering::SeqCst);
        unsafe { (*PP_TASK.get()).switch_to(&*PP_MAIN.get()) };
    }
}

#[test]
fn context_switch_round_trip() {
    let mut stack = vec![0u128; 4096];
    unsafe {
        (*PP_TASK.get()).init(pingpong_entry as usize, 3, stack_top(&mut stack));
    }

    for round in 1..=4 {
        unsafe { (*PP_MAIN.get()).switch_to(&*PP_TASK.get()) };
        assert_eq!(PONGS.load(Ordering::SeqCst), round * 3);
    }
}
