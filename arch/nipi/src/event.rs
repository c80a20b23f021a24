// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Callback payloads carried by generic IPIs.

use alloc::boxed::Box;
use alloc::sync::Arc;

/// A callback that executes once, on one target CPU.
pub struct Callback(Box<dyn FnOnce() + Send>);

impl Callback {
    /// Wraps `callback` for delivery to another CPU.
    pub fn new<F: FnOnce() + Send + 'static>(callback: F) -> Self {
        Self(Box::new(callback))
    }

    /// Consumes and runs the callback.
    pub fn call(self) {
        (self.0)()
    }
}

impl<T: FnOnce() + Send + 'static> From<T> for Callback {
    fn from(callback: T) -> Self {
        Self::new(callback)
    }
}

/// A callback that can be delivered to many CPUs at once.
#[derive(Clone)]
pub struct MulticastCallback(Arc<dyn Fn() + Send + Sync>);

impl MulticastCallback {
    /// Wraps `callback` for broadcast delivery.
    pub fn new<F: Fn() + Send + Sync + 'static>(callback: F) -> Self {
        Self(Arc::new(callback))
    }

    /// Converts one broadcast instance into a single-use callback.
    pub fn into_unicast(self) -> Callback {
        Callback(Box::new(move || (self.0)()))
    }

    /// Runs the callback.
    pub fn call(self) {
        (self.0)()
    }
}

impl<T: Fn() + Send + Sync + 'static> From<T> for MulticastCallback {
    fn from(callback: T) -> Self {
        Self::new(callback)
    }
}

/// One queued delivery: who sent it and what to run.
#[cfg(any(test, target_os = "none"))]
pub(crate) struct IpiEvent {
    pub src_cpu_id: usize,
    pub callback: Callback,
}
