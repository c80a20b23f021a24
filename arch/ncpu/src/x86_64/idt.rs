// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Interrupt descriptor table setup.

use lazyinit::LazyInit;
use x86_64::VirtAddr;
use x86_64::structures::DescriptorTablePointer;

const NUM_VECTORS: usize = 256;

unsafe extern "C" {
    // Defined in trap.S: the address of every vector's entry stub.
    static trap_handler_table: [usize; NUM_VECTORS];
}

#[repr(C, align(16))]
struct IdtStruct {
    slots: [[u64; 2]; NUM_VECTORS],
}

impl IdtStruct {
    fn new() -> Self {
        let cs = x86::segmentation::cs().bits() as u64;
        let mut slots = [[0u64; 2]; NUM_VECTORS];
        for (i, slot) in slots.iter_mut().enumerate() {
            let base = unsafe { trap_handler_table[i] } as u64;
            // 64-bit interrupt gate, DPL 0, present. Interrupt gates clear
            // IF on entry, so handlers start with interrupts off.
            slot[0] = (base & 0xffff)
                | (cs << 16)
                | (0x8eu64 << 40)
                | ((base & 0xffff_0000) << 32);
            slot[1] = base >> 32;
        }
        Self { slots }
    }

    fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            base: VirtAddr::new(self as *const _ as u64),
            limit: (core::mem::size_of::<Self>() - 1) as u16,
        }
    }
}

static IDT: LazyInit<IdtStruct> = LazyInit::new();

/// Builds the IDT once and loads it on the calling CPU.
pub(super) fn init_idt() {
    if !IDT.is_inited() {
        IDT.init_once(IdtStruct::new());
    }
    unsafe { x86_64::instructions::tables::lidt(&IDT.pointer()) };
}
