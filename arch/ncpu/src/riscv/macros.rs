// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Assembler macros shared by the RV32 and RV64 assembly paths.
//!
//! `STR`/`LDR` store and load one register slot; `XLENB` is the register
//! width in bytes, so slot offsets in the assembly are indices, not byte
//! offsets.

#[cfg(target_arch = "riscv32")]
macro_rules! include_asm_macros {
    () => {
        r"
        .ifndef NUCLEUS_ASM_MACROS
        .equ NUCLEUS_ASM_MACROS, 1
        .equ XLENB, 4
        .macro LDR rd, rs, off
            lw \rd, \off*XLENB(\rs)
        .endm
        .macro STR rs2, rs1, off
            sw \rs2, \off*XLENB(\rs1)
        .endm
        .endif"
    };
}

#[cfg(target_arch = "riscv64")]
macro_rules! include_asm_macros {
    () => {
        r"
        .ifndef NUCLEUS_ASM_MACROS
        .equ NUCLEUS_ASM_MACROS, 1
        .equ XLENB, 8
        .macro LDR rd, rs, off
            ld \rd, \off*XLENB(\rs)
        .endm
        .macro STR rs2, rs1, off
            sd \rs2, \off*XLENB(\rs1)
        .endm
        .endif"
    };
}
