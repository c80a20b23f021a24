// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

use x86::controlregs::cr2;
use x86::irq::{
    BREAKPOINT_VECTOR, EXCEPTIONS, GENERAL_PROTECTION_FAULT_VECTOR, PAGE_FAULT_VECTOR,
};
use x86_64::structures::idt::PageFaultErrorCode;

use super::ExceptionContext;
use crate::trap::PageFaultFlags;

core::arch::global_asm!(include_str!("trap.S"));

pub(super) const IRQ_VECTOR_START: u8 = 0x20;
pub(super) const IRQ_VECTOR_END: u8 = 0xff;

#[unsafe(no_mangle)]
fn x86_trap_handler(tf: &mut ExceptionContext) {
    let _tf_guard = crate::TrapFrameGuard::new(tf);
    match tf.vector as u8 {
        PAGE_FAULT_VECTOR => {
            // No demand paging in this kernel: every page fault is fatal.
            let vaddr = unsafe { cr2() };
            panic!(
                "Unhandled #PF @ {:#x}, fault_vaddr={:#x}, error_code={:#x} ({:?}):\n{:#x?}",
                tf.rip,
                vaddr,
                tf.error_code,
                err_code_to_flags(tf.error_code),
                tf,
            );
        }
        BREAKPOINT_VECTOR => debug!("#BP @ {:#x} ", tf.rip),
        GENERAL_PROTECTION_FAULT_VECTOR => {
            panic!(
                "#GP @ {:#x}, error_code={:#x}:\n{:#x?}",
                tf.rip, tf.error_code, tf,
            );
        }
        IRQ_VECTOR_START..=IRQ_VECTOR_END => {
            dispatch_trap!(IRQ, tf.vector as _);
        }
        _ => {
            panic!(
                "Unhandled exception {} ({}, error_code={:#x}) @ {:#x}:\n{:#x?}",
                tf.vector,
                vec_to_str(tf.vector),
                tf.error_code,
                tf.rip,
                tf,
            );
        }
    }
}

fn vec_to_str(vec: u64) -> &'static str {
    if vec < 32 {
        EXCEPTIONS[vec as usize].mnemonic
    } else {
        "Unknown"
    }
}

fn err_code_to_flags(err_code: u64) -> Result<PageFaultFlags, u64> {
    let code = PageFaultErrorCode::from_bits_truncate(err_code);
    let reserved_bits = (PageFaultErrorCode::CAUSED_BY_WRITE
        | PageFaultErrorCode::USER_MODE
        | PageFaultErrorCode::INSTRUCTION_FETCH
        | PageFaultErrorCode::PROTECTION_VIOLATION)
        .complement();
    if code.intersects(reserved_bits) {
        Err(err_code)
    } else {
        let mut flags = PageFaultFlags::empty();
        if code.contains(PageFaultErrorCode::CAUSED_BY_WRITE) {
            flags |= PageFaultFlags::WRITE;
        } else {
            flags |= PageFaultFlags::READ;
        }
        if code.contains(PageFaultErrorCode::USER_MODE) {
            flags |= PageFaultFlags::USER;
        }
        if code.contains(PageFaultErrorCode::INSTRUCTION_FETCH) {
            flags |= PageFaultFlags::EXECUTE;
        }
        Ok(flags)
    }
}
