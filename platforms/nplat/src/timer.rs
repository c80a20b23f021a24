// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Monotonic time source interface.

/// The platform's monotonic timer, used for log timestamps and debug
/// accounting. Timeout bookkeeping lives in the scheduler layer and does
/// not go through this interface.
#[crate_interface::def_interface]
pub trait SysTimer {
    /// Nanoseconds since boot.
    fn now_ns() -> u64;
}
