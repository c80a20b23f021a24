// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

#![cfg_attr(not(test), no_std)]

use core::fmt;

use strum::EnumCount;

/// The error kind type used by the kernel core.
///
/// Only kinds the core actually produces are defined. Timeouts are the one
/// recoverable error; everything else either propagates to a boot-time
/// fatal path or reports a caller bug.
#[repr(i32)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, EnumCount)]
pub enum KError {
    /// Bad internal state, e.g. an object destroyed while in use.
    BadState = 1,
    /// Invalid parameter/argument.
    InvalidInput,
    /// Not enough space/cannot allocate memory.
    NoMemory,
    /// The requested entity is not found.
    NotFound,
    /// Device or resource is busy.
    ResourceBusy,
    /// The operation's timeout expired.
    TimedOut,
    /// This operation is unsupported or unimplemented.
    Unsupported,
    /// The operation needs to block to complete, but blocking was not
    /// requested.
    WouldBlock,
}

impl KError {
    /// Returns the error description.
    pub fn as_str(&self) -> &'static str {
        use KError::*;
        match *self {
            BadState => "Bad internal state",
            InvalidInput => "Invalid input parameter",
            NoMemory => "Out of memory",
            NotFound => "Entity not found",
            ResourceBusy => "Resource busy",
            TimedOut => "Timed out",
            Unsupported => "Operation not supported",
            WouldBlock => "Operation would block",
        }
    }

    /// Returns the error code value in `i32`.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for KError {
    type Error = i32;

    #[inline]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value > 0 && value <= KError::COUNT as i32 {
            Ok(unsafe { core::mem::transmute::<i32, KError>(value) })
        } else {
            Err(value)
        }
    }
}

impl fmt::Display for KError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A specialized [`Result`] type with [`KError`] as the error type.
pub type KResult<T = ()> = Result<T, KError>;

/// Convenience method to construct a [`KError`] while printing a warning
/// message.
///
/// # Examples
///
/// ```
/// # use nerrno::{k_err_type, KError};
/// assert_eq!(k_err_type!(TimedOut), KError::TimedOut);
/// assert_eq!(k_err_type!(BadState, "queue is gone"), KError::BadState);
/// ```
#[macro_export]
macro_rules! k_err_type {
    ($err:ident) => {{
        let err = $crate::KError::$err;
        $crate::__priv::warn!("[{:?}]", err);
        err
    }};
    ($err:ident, $msg:expr) => {{
        let err = $crate::KError::$err;
        $crate::__priv::warn!("[{:?}] {}", err, $msg);
        err
    }};
}

/// Convenience method to construct an [`Err(KError)`] while printing a
/// warning message.
///
/// [`Err(KError)`]: Err
#[macro_export]
macro_rules! k_err {
    ($err:ident) => {
        Err($crate::k_err_type!($err))
    };
    ($err:ident, $msg:expr) => {
        Err($crate::k_err_type!($err, $msg))
    };
}

#[doc(hidden)]
pub mod __priv {
    pub use log::warn;
}

#[cfg(test)]
mod tests {
    use strum::EnumCount;

    use crate::KError;

    #[test]
    fn test_try_from() {
        let max_code = KError::COUNT as i32;
        assert_eq!(max_code, KError::WouldBlock.code());

        assert_eq!(KError::BadState.code(), 1);
        assert_eq!(Ok(KError::BadState), KError::try_from(1));
        assert_eq!(Ok(KError::WouldBlock), KError::try_from(max_code));
        assert_eq!(Err(max_code + 1), KError::try_from(max_code + 1));
        assert_eq!(Err(0), KError::try_from(0));
        assert_eq!(Err(i32::MAX), KError::try_from(i32::MAX));
    }

    #[test]
    fn test_display() {
        assert_eq!(KError::TimedOut.as_str(), "Timed out");
        assert_eq!(format!("{}", KError::TimedOut), "Timed out");
    }
}
