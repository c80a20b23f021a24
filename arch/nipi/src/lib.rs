// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Inter-processor interrupts.
//!
//! Two layers share one software-generated vector. The low layer is a
//! per-CPU pending set of [`IpiReason`] bits: [`send_ipi`] marks the
//! reasons on every target in a [`CpuMask`] and pokes the interrupt
//! controller; the receiving core's [`ipi_handler`] drains them. A
//! `Reschedule` reason feeds the scheduler's mailbox path, a `Generic`
//! reason carries no payload of its own and is what the callback layer
//! ([`run_on_cpu`], [`run_on_each_cpu`]) and synchronization barriers
//! ride on.
//!
//! ## Safety
//!
//! All callbacks must be `Send` as they execute on other CPUs.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;
extern crate alloc;

use core::sync::atomic::{AtomicU8, Ordering};

use crate_interface::call_interface;
use nconfig::{IPI_IRQ, SMP_MAX_CPUS};
use nhal::percpu::this_cpu_id;
use nplat::interrupts::TargetCpu;
use nsched::SchedulerIf;

mod event;
#[cfg(any(test, target_os = "none"))]
mod queue;

pub use event::{Callback, MulticastCallback};

/// Why an IPI was sent. Encoded as one bit per reason in the per-CPU
/// pending set, so coalesced IPIs lose nothing.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpiReason {
    /// Wake the target for its own sake: synchronization barriers and
    /// queued callbacks.
    Generic = 0,
    /// Ask the target to run through its scheduler.
    Reschedule = 1,
}

impl IpiReason {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of target CPUs, one bit per logical id, clamped to
/// [`SMP_MAX_CPUS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuMask(usize);

impl CpuMask {
    const VALID: usize = (1 << SMP_MAX_CPUS) - 1;

    /// The empty mask.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A mask holding only `cpu_id`.
    pub const fn single(cpu_id: usize) -> Self {
        Self((1 << cpu_id) & Self::VALID)
    }

    /// Every configured CPU except `cpu_id`.
    pub fn all_but(cpu_id: usize) -> Self {
        let online = (1 << nhal::percpu::cpu_count()) - 1;
        Self(online & !(1 << cpu_id) & Self::VALID)
    }

    /// A mask from raw bits; bits beyond the CPU limit are dropped.
    pub const fn from_raw(bits: usize) -> Self {
        Self(bits & Self::VALID)
    }

    /// Whether `cpu_id` is in the mask.
    pub const fn contains(self, cpu_id: usize) -> bool {
        self.0 & (1 << cpu_id) != 0
    }

    /// Whether the mask is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the CPU ids in the mask, ascending.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..SMP_MAX_CPUS).filter(move |cpu| self.contains(*cpu))
    }
}

// Reasons waiting to be drained by each CPU's ipi_handler.
static PENDING: [AtomicU8; SMP_MAX_CPUS] = [const { AtomicU8::new(0) }; SMP_MAX_CPUS];

/// Sends `reason` to every CPU in `mask`.
///
/// The sender is never signalled, matching how reschedule requests are
/// used: a core asking others to reschedule has no reason to interrupt
/// itself. An empty mask is a no-op.
pub fn send_ipi(mask: CpuMask, reason: IpiReason) {
    let me = this_cpu_id();
    let mut sent = 0;
    for cpu in mask.iter() {
        if cpu == me {
            continue;
        }
        PENDING[cpu].fetch_or(reason.bit(), Ordering::Release);
        sent += 1;
    }
    if sent == 0 {
        return;
    }

    trace!("IPI {reason:?} -> {mask:?}");
    let target = if mask == CpuMask::all_but(me) {
        TargetCpu::AllButSelf {
            me,
            total: nhal::percpu::cpu_count(),
        }
    } else {
        // No broadcast shape matches; signal each target on its own.
        for cpu in mask.iter() {
            if cpu != me {
                nhal::irq::notify_cpu(IPI_IRQ, TargetCpu::Specific(cpu));
            }
        }
        return;
    };
    nhal::irq::notify_cpu(IPI_IRQ, target);
}

/// Drains and handles this CPU's pending IPI reasons.
///
/// Runs in interrupt context, registered on the IPI vector by the
/// runtime. Returns whether a reschedule was requested, which the
/// interrupt exit path turns into a deferred preemption.
pub fn ipi_handler() -> bool {
    let cpu = this_cpu_id();
    let pending = PENDING[cpu].swap(0, Ordering::AcqRel);

    if pending & IpiReason::Generic.bit() != 0 {
        #[cfg(target_os = "none")]
        drain_callbacks();
    }

    if pending & IpiReason::Reschedule.bit() != 0 {
        call_interface!(nsched::SchedulerIf::request_resched, cpu);
        return true;
    }
    false
}

/// Reads this CPU's pending reasons without draining them. Diagnostic
/// only.
pub fn pending_reasons(cpu: usize) -> u8 {
    PENDING[cpu].load(Ordering::Acquire)
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        use lazyinit::LazyInit;
        use nspin::SpinNoIrq;

        use crate::queue::IpiEventQueue;

        #[percpu::def_percpu]
        static IPI_EVENT_QUEUE: LazyInit<SpinNoIrq<IpiEventQueue>> = LazyInit::new();

        /// Initializes the calling CPU's IPI event queue.
        pub fn init() {
            IPI_EVENT_QUEUE.with_current(|ipi_queue| {
                ipi_queue.init_once(SpinNoIrq::new(IpiEventQueue::default()));
            });
        }

        /// Runs a callback on `dest_cpu` via a generic IPI.
        ///
        /// A callback for the calling CPU executes immediately instead of
        /// round-tripping through the controller.
        pub fn run_on_cpu<T: Into<Callback>>(dest_cpu: usize, callback: T) -> bool {
            if dest_cpu >= nhal::percpu::cpu_count() {
                error!(
                    "invalid IPI target CPU {dest_cpu} (max {})",
                    nhal::percpu::cpu_count() - 1
                );
                return false;
            }

            if dest_cpu == this_cpu_id() {
                callback.into().call();
            } else {
                unsafe { IPI_EVENT_QUEUE.remote_ref_raw(dest_cpu) }
                    .lock()
                    .push(this_cpu_id(), callback.into());
                send_ipi(CpuMask::single(dest_cpu), IpiReason::Generic);
            }
            true
        }

        /// Runs a callback on every CPU, the caller included.
        pub fn run_on_each_cpu<T: Into<MulticastCallback>>(callback: T) {
            let me = this_cpu_id();
            let callback = callback.into();

            callback.clone().call();

            for cpu in 0..nhal::percpu::cpu_count() {
                if cpu != me {
                    unsafe { IPI_EVENT_QUEUE.remote_ref_raw(cpu) }
                        .lock()
                        .push(me, callback.clone().into_unicast());
                }
            }
            send_ipi(CpuMask::all_but(me), IpiReason::Generic);
        }

        fn drain_callbacks() {
            while let Some((src_cpu_id, callback)) =
                unsafe { IPI_EVENT_QUEUE.current_ref_mut_raw() }.lock().pop_one()
            {
                debug!("IPI callback from CPU {src_cpu_id}");
                callback.call();
            }
        }
    }
}

#[cfg(test)]
mod tests;
