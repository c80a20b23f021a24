// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

#![cfg(test)]

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use nsched::host::resched_requests;

use super::*;
use crate::queue::IpiEventQueue;

// Tests that observe the shared pending sets must not interleave.
static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[test]
fn mask_construction() {
    let m = CpuMask::single(2);
    assert!(m.contains(2));
    assert!(!m.contains(1));
    assert_eq!(m.iter().collect::<Vec<_>>(), vec![2]);

    let m = CpuMask::from_raw(0b1011);
    assert_eq!(m.iter().collect::<Vec<_>>(), vec![0, 1, 3]);

    // Bits past the CPU limit are dropped.
    let m = CpuMask::from_raw(usize::MAX);
    assert_eq!(m.iter().count(), nconfig::SMP_MAX_CPUS);

    assert!(CpuMask::empty().is_empty());
}

#[test]
fn send_marks_pending_reasons_on_remote_cpus() {
    let _s = SERIAL.lock().unwrap();
    // The sender (CPU 0 on the host) never signals itself.
    send_ipi(CpuMask::from_raw(0b0111), IpiReason::Reschedule);
    assert_eq!(pending_reasons(0), 0);
    assert_eq!(pending_reasons(1), IpiReason::Reschedule.bit());
    assert_eq!(pending_reasons(2), IpiReason::Reschedule.bit());

    // Reasons coalesce instead of queueing.
    send_ipi(CpuMask::single(1), IpiReason::Generic);
    send_ipi(CpuMask::single(1), IpiReason::Generic);
    assert_eq!(
        pending_reasons(1),
        IpiReason::Reschedule.bit() | IpiReason::Generic.bit()
    );

    // Drain for other tests.
    PENDING[1].store(0, Ordering::SeqCst);
    PENDING[2].store(0, Ordering::SeqCst);
}

#[test]
fn reschedule_reason_reaches_the_mailbox() {
    let _s = SERIAL.lock().unwrap();
    let before = resched_requests(0);

    // Simulate the reception side: a reschedule IPI is pending for this
    // CPU when its handler runs.
    PENDING[0].store(IpiReason::Reschedule.bit(), Ordering::SeqCst);
    assert!(ipi_handler());
    assert_eq!(resched_requests(0), before + 1);
    assert_eq!(pending_reasons(0), 0);

    // A generic IPI asks for no reschedule.
    PENDING[0].store(IpiReason::Generic.bit(), Ordering::SeqCst);
    assert!(!ipi_handler());
    assert_eq!(resched_requests(0), before + 1);
}

#[test]
fn callback_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Callback>();
}

#[test]
fn multicast_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MulticastCallback>();
}

#[test]
fn callback_executes_once() {
    let executed = Arc::new(AtomicUsize::new(0));
    let executed_clone = executed.clone();

    let callback = Callback::new(move || {
        executed_clone.fetch_add(1, Ordering::SeqCst);
    });

    callback.call();
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[test]
fn multicast_callback_clones() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let callback = MulticastCallback::new(move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    let callback2 = callback.clone();
    callback.call();
    callback2.call();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn queue_is_fifo() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut queue = IpiEventQueue::new();

    for i in 0..3 {
        let order = order.clone();
        queue.push(
            i,
            Callback::new(move || {
                order.lock().unwrap().push(i);
            }),
        );
    }

    let (src, cb) = queue.pop_one().unwrap();
    assert_eq!(src, 0);
    cb.call();

    while let Some((_, cb)) = queue.pop_one() {
        cb.call();
    }
    assert!(queue.pop_one().is_none());

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn queue_empty_behaviour() {
    let mut queue = IpiEventQueue::new();
    assert!(queue.is_empty());
    assert!(queue.pop_one().is_none());

    queue.push(0, Callback::new(|| {}));
    assert!(!queue.is_empty());
    assert!(queue.pop_one().is_some());
    assert!(queue.is_empty());
}

#[test]
fn multicast_to_unicast_conversion() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let multicast = MulticastCallback::new(move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    multicast.clone().into_unicast().call();
    multicast.clone().into_unicast().call();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}
