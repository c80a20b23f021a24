// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Debug console interface.

/// The platform's debug console.
#[crate_interface::def_interface]
pub trait Terminal {
    /// Writes bytes to the console.
    fn write_data(bytes: &[u8]);

    /// Reads bytes from the console, returning how many were read.
    fn read_data(bytes: &mut [u8]) -> usize;
}
