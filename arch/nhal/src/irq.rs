// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Interrupt management: the vector table and the entry/exit protocol.
//!
//! Every hardware interrupt, on every architecture, runs the same
//! sequence: mark the CPU as in-interrupt and bump its statistics, let the
//! platform acknowledge the controller and name the vector, invoke the
//! registered handler, and on the way out convert the handler's
//! reschedule request into a *deferred* preemption. The preemption is
//! deferred by construction: a `NoPreempt` guard is held for the whole
//! handler, so the scheduler can only act once the interrupt context has
//! unwound and the guard drops.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate_interface::call_interface;
use nconfig::{MAX_IRQ_COUNT, SMP_MAX_CPUS};
use nplat::interrupts::{Handler, HandlerTable, IntrManager, TargetCpu};
use nsched::SchedulerIf;
use nspin::NoPreempt;

use crate::percpu::this_cpu_id;

static IRQ_HANDLER_TABLE: HandlerTable<MAX_IRQ_COUNT> = HandlerTable::new();

// Indexed by CPU; only the owning CPU writes its slot.
static IRQ_NESTING: [AtomicU32; SMP_MAX_CPUS] = [const { AtomicU32::new(0) }; SMP_MAX_CPUS];
static IRQ_COUNTS: [AtomicU64; SMP_MAX_CPUS] = [const { AtomicU64::new(0) }; SMP_MAX_CPUS];

/// Registers `handler` for `vector` and unmasks the vector.
///
/// Returns `false` if the vector is out of range or already taken.
pub fn register(vector: usize, handler: Handler, arg: usize) -> bool {
    if IRQ_HANDLER_TABLE.register_handler(vector, handler, arg) {
        set_enable(vector, true);
        true
    } else {
        warn!("register handler for IRQ {vector} failed");
        false
    }
}

/// Masks `vector` and removes its handler, returning it if one was
/// registered.
pub fn unregister(vector: usize) -> Option<Handler> {
    set_enable(vector, false);
    IRQ_HANDLER_TABLE.unregister_handler(vector)
}

/// Unmasks `vector` at the interrupt controller.
pub fn unmask(vector: usize) {
    set_enable(vector, true);
}

/// Masks `vector` at the interrupt controller.
pub fn mask(vector: usize) {
    set_enable(vector, false);
}

fn set_enable(vector: usize, enabled: bool) {
    call_interface!(nplat::interrupts::IntrManager::enable, vector, enabled);
}

/// Sends a software-generated interrupt to the given CPUs.
pub fn notify_cpu(vector: usize, target: TargetCpu) {
    call_interface!(nplat::interrupts::IntrManager::notify_cpu, vector, target);
}

/// Whether the calling CPU is currently handling an interrupt.
pub fn in_interrupt() -> bool {
    IRQ_NESTING[this_cpu_id()].load(Ordering::Relaxed) > 0
}

/// Number of interrupts `cpu` has handled since boot.
pub fn irq_count(cpu: usize) -> u64 {
    IRQ_COUNTS[cpu].load(Ordering::Relaxed)
}

/// The interrupt entry/exit protocol.
///
/// `cause` is the raw trap cause delivered by the architecture layer; the
/// platform translates it into a vector number while acknowledging its
/// controller. A vector nobody registered for is tolerated: some
/// controllers raise spurious vectors, and the answer is "no reschedule",
/// not a crash.
///
/// Returns whether the handler asked for a reschedule. The request is
/// also forwarded to the scheduler's mailbox here, while preemption is
/// still disabled; the actual switch happens after the guard drops.
pub fn irq_handler(cause: usize) -> bool {
    let guard = NoPreempt::new();
    let cpu = this_cpu_id();

    IRQ_NESTING[cpu].fetch_add(1, Ordering::Relaxed);
    IRQ_COUNTS[cpu].fetch_add(1, Ordering::Relaxed);
    trace!("IRQ enter: cause {cause:#x}");

    let resched = match call_interface!(nplat::interrupts::IntrManager::dispatch_irq, cause) {
        Some(vector) => IRQ_HANDLER_TABLE.handle(vector).unwrap_or_else(|| {
            debug!("spurious IRQ vector {vector}");
            false
        }),
        None => {
            debug!("spurious IRQ, cause {cause:#x}");
            false
        }
    };

    trace!("IRQ exit: cause {cause:#x}, resched {resched}");
    IRQ_NESTING[cpu].fetch_sub(1, Ordering::Relaxed);

    if resched {
        call_interface!(nsched::SchedulerIf::request_resched, cpu);
    }

    // Rescheduling may occur when preemption is re-enabled.
    drop(guard);
    resched
}

#[linkme::distributed_slice(ncpu::trap::IRQ)]
static IRQ_ENTRY: fn(usize) -> bool = irq_handler;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nsched::host::resched_requests;

    use super::*;

    static FIRES: AtomicUsize = AtomicUsize::new(0);

    fn counting_handler(arg: usize) -> bool {
        FIRES.fetch_add(1, Ordering::SeqCst);
        arg == 0xfeed
    }

    fn quiet_handler(_arg: usize) -> bool {
        false
    }

    // All host test threads report CPU 0, so tests that drive the
    // protocol must not interleave.
    static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn entry_exit_protocol() {
        let _s = SERIAL.lock().unwrap();
        assert!(!in_interrupt());
        let count_before = irq_count(0);
        let resched_before = resched_requests(0);

        // Vector 33 wants a reschedule, vector 34 does not.
        assert!(register(33, counting_handler, 0xfeed));
        assert!(register(34, counting_handler, 0));

        assert!(irq_handler(33));
        assert_eq!(resched_requests(0), resched_before + 1);

        assert!(!irq_handler(34));
        assert_eq!(resched_requests(0), resched_before + 1);

        assert_eq!(FIRES.load(Ordering::SeqCst), 2);
        assert_eq!(irq_count(0), count_before + 2);
        // The in-interrupt mark never leaks past exit.
        assert!(!in_interrupt());
    }

    #[test]
    fn spurious_vector_is_tolerated() {
        let _s = SERIAL.lock().unwrap();
        // Nothing registered for vector 77; the protocol reports "no
        // reschedule" instead of crashing.
        assert!(!irq_handler(77));
    }

    #[test]
    fn register_is_exclusive() {
        assert!(register(40, quiet_handler, 0));
        assert!(!register(40, quiet_handler, 0));
        assert!(unregister(40).is_some());
        assert!(unregister(40).is_none());
        assert!(register(40, quiet_handler, 0));
    }

    #[test]
    fn out_of_range_vector() {
        let _s = SERIAL.lock().unwrap();
        assert!(!register(MAX_IRQ_COUNT, quiet_handler, 0));
        assert!(!irq_handler(MAX_IRQ_COUNT));
    }
}
