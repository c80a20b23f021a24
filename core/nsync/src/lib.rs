// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Blocking synchronization primitives for kernel threads.
//!
//! This crate provides the kernel's ownership-tracked [`Mutex`]. A held
//! mutex knows which thread holds it; acquiring it again from that thread,
//! releasing it from any other thread, or destroying it while another
//! thread holds it are caller bugs and panic rather than degrade into a
//! deadlock or a race.
//!
//! Threads that cannot take the mutex immediately block on a wait queue
//! provided by the scheduler layer, optionally bounded by a timeout.
//! Spinlocks live in [`nspin`], re-exported as [`spin`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use nsync::Mutex;
//!
//! static DATA: Mutex<u32> = Mutex::new(0);
//!
//! fn task() {
//!     let mut data = DATA.lock();
//!     *data += 1;
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub use nspin as spin;

mod mutex;

pub use self::mutex::{Mutex, MutexGuard, RawMutex};
