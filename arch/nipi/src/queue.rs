// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Per-CPU FIFO of queued IPI callbacks.

use alloc::collections::VecDeque;

use crate::event::{Callback, IpiEvent};

/// Callbacks waiting for one CPU, delivered in the order they were
/// enqueued.
pub(crate) struct IpiEventQueue {
    events: VecDeque<IpiEvent>,
}

impl IpiEventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    #[allow(dead_code)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Enqueues a callback sent by `src_cpu_id`.
    pub fn push(&mut self, src_cpu_id: usize, callback: Callback) {
        self.events.push_back(IpiEvent {
            src_cpu_id,
            callback,
        });
    }

    /// Dequeues the oldest callback, if any.
    #[must_use]
    pub fn pop_one(&mut self) -> Option<(usize, Callback)> {
        self.events.pop_front().map(|e| (e.src_cpu_id, e.callback))
    }
}

impl Default for IpiEventQueue {
    fn default() -> Self {
        Self::new()
    }
}
