// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

use riscv::{
    interrupt::{
        Trap,
        supervisor::{Exception as E, Interrupt as I},
    },
    register::{scause, stval},
};

use super::ExceptionContext;
use crate::trap::PageFaultFlags;

core::arch::global_asm!(
    include_asm_macros!(),
    include_str!("trap.S"),
    trapframe_size = const core::mem::size_of::<ExceptionContext>(),
);

fn handle_breakpoint(sepc: &mut usize) {
    debug!("Exception(Breakpoint) @ {sepc:#x} ");
    *sepc += 2;
}

fn handle_page_fault(tf: &ExceptionContext, access_flags: PageFaultFlags) -> ! {
    // No demand paging in this kernel: every page fault is fatal.
    let vaddr = stval::read();
    panic!(
        "Unhandled Supervisor Page Fault @ {:#x}, fault_vaddr={:#x} ({:?}):\n{:#x?}",
        tf.sepc, vaddr, access_flags, tf,
    );
}

#[unsafe(no_mangle)]
fn riscv_trap_handler(tf: &mut ExceptionContext) {
    let _tf_guard = crate::TrapFrameGuard::new(tf);
    let scause = scause::read();
    if let Ok(cause) = scause.cause().try_into::<I, E>() {
        match cause {
            Trap::Exception(E::LoadPageFault) => handle_page_fault(tf, PageFaultFlags::READ),
            Trap::Exception(E::StorePageFault) => handle_page_fault(tf, PageFaultFlags::WRITE),
            Trap::Exception(E::InstructionPageFault) => {
                handle_page_fault(tf, PageFaultFlags::EXECUTE)
            }
            Trap::Exception(E::Breakpoint) => handle_breakpoint(&mut tf.sepc),
            Trap::Interrupt(_) => {
                dispatch_trap!(IRQ, scause.bits());
            }
            _ => {
                panic!(
                    "Unhandled trap {:?} @ {:#x}, stval={:#x}:\n{:#x?}",
                    cause,
                    tf.sepc,
                    stval::read(),
                    tf,
                );
            }
        }
    } else {
        panic!(
            "Unknown trap {:#x?} @ {:#x}:\n{:#x?}",
            scause.cause(),
            tf.sepc,
            tf,
        );
    }
}
