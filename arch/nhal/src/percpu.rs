// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Per-CPU records and the secondary-CPU boot gate.
//!
//! The boot CPU's record is statically allocated; the secondaries share
//! one contiguous arena allocated before they are released, clamped to
//! [`SMP_MAX_CPUS`] and never resized. After a core initializes its own
//! record the record is written only by that core; other cores read it to
//! route IPIs or dump state.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lazyinit::LazyInit;
use nconfig::SMP_MAX_CPUS;

/// One CPU's identity and bring-up state.
#[derive(Debug)]
pub struct PerCpu {
    /// Logical CPU number, the index of this record.
    pub cpu_id: usize,
    /// Hardware identity (MPIDR affinity, hart id, APIC id). Written once
    /// by the owning core during its bring-up.
    hw_id: AtomicUsize,
    online: AtomicBool,
}

impl PerCpu {
    const fn new(cpu_id: usize) -> Self {
        Self {
            cpu_id,
            hw_id: AtomicUsize::new(0),
            online: AtomicBool::new(false),
        }
    }

    /// The hardware id the owning core recorded.
    pub fn hw_id(&self) -> usize {
        self.hw_id.load(Ordering::Acquire)
    }

    /// Whether the owning core has entered the scheduler.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn bring_up(&self, hw_id: usize) {
        self.hw_id.store(hw_id, Ordering::Release);
        self.online.store(true, Ordering::Release);
    }
}

// The boot CPU needs no allocation to describe itself.
static BOOT_CPU: PerCpu = PerCpu::new(0);

static SECONDARY_CPUS: LazyInit<Box<[PerCpu]>> = LazyInit::new();
static SECONDARY_COUNT: AtomicUsize = AtomicUsize::new(0);

// Secondaries spin here until the primary has published the record arena.
static GATE_OPEN: AtomicBool = AtomicBool::new(false);

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        #[percpu::def_percpu]
        static CPU_ID: usize = 0;

        /// Logical id of the calling CPU.
        #[inline]
        pub fn this_cpu_id() -> usize {
            unsafe { CPU_ID.read_current_raw() }
        }

        fn init_percpu_area(cpu_id: usize, primary: bool) {
            if primary {
                percpu::init();
            }
            percpu::init_percpu_reg(cpu_id);
            unsafe { CPU_ID.write_current_raw(cpu_id) };
        }
    } else {
        /// Logical id of the calling CPU. Hosted builds are single-CPU.
        #[inline]
        pub fn this_cpu_id() -> usize {
            0
        }

        fn init_percpu_area(_cpu_id: usize, _primary: bool) {}
    }
}

/// Initializes the boot CPU's record and per-CPU area. No synchronization
/// needed; the boot CPU is alone at this point.
pub fn init_primary(cpu_id: usize, hw_id: usize) {
    debug_assert_eq!(cpu_id, 0);
    init_percpu_area(cpu_id, true);
    BOOT_CPU.bring_up(hw_id);
}

/// Allocates the secondary record arena, one record per expected
/// secondary, clamped to the compile-time CPU limit.
///
/// Must run on the boot CPU before any secondary is released. Returns the
/// number of records actually allocated. Allocation failure aborts boot;
/// the kernel cannot run a core without its record.
pub fn alloc_secondary_records(expected: usize) -> usize {
    let count = expected.min(SMP_MAX_CPUS - 1);
    if expected > count {
        warn!("clamping {expected} secondary CPUs to the configured maximum {count}");
    }
    let records: Vec<PerCpu> = (1..=count).map(PerCpu::new).collect();
    SECONDARY_CPUS.init_once(records.into_boxed_slice());
    SECONDARY_COUNT.store(count, Ordering::Release);
    count
}

/// Initializes the calling secondary CPU: sets up its per-CPU area and
/// fills in its pre-allocated record.
///
/// The caller must already have passed [`wait_for_release`].
pub fn init_secondary(cpu_id: usize, hw_id: usize) {
    init_percpu_area(cpu_id, false);
    let record = cpu_record(cpu_id).expect("no per-CPU record for this core");
    record.bring_up(hw_id);
}

/// Looks up a CPU's record by logical id.
pub fn cpu_record(cpu_id: usize) -> Option<&'static PerCpu> {
    if cpu_id == 0 {
        Some(&BOOT_CPU)
    } else if SECONDARY_CPUS.is_inited() {
        let records: &'static [PerCpu] = &SECONDARY_CPUS;
        records.get(cpu_id - 1)
    } else {
        None
    }
}

/// Number of CPUs with an allocated record, the boot CPU included.
pub fn cpu_count() -> usize {
    1 + SECONDARY_COUNT.load(Ordering::Acquire)
}

/// Opens the boot gate, allowing secondaries past [`wait_for_release`].
///
/// Everything the secondaries will read (the record arena above all) must
/// be published before this.
pub fn release_secondaries() {
    GATE_OPEN.store(true, Ordering::Release);
    #[cfg(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "riscv32",
        target_arch = "riscv64"
    ))]
    ncpu::asm::send_event();
}

/// Spins until the primary opens the boot gate.
///
/// A secondary enters kernel code with its caches possibly stale against
/// the primary's view of the record arena; it must not touch shared state
/// before this returns.
pub fn wait_for_release() {
    while !GATE_OPEN.load(Ordering::Acquire) {
        #[cfg(any(
            target_arch = "x86_64",
            target_arch = "aarch64",
            target_arch = "riscv32",
            target_arch = "riscv64"
        ))]
        ncpu::asm::wait_for_event();
        #[cfg(not(any(
            target_arch = "x86_64",
            target_arch = "aarch64",
            target_arch = "riscv32",
            target_arch = "riscv64"
        )))]
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn records_and_gate() {
        init_primary(0, 0x80000000);
        assert_eq!(BOOT_CPU.hw_id(), 0x80000000);

        // Ask for more secondaries than the build supports; the arena is
        // clamped.
        let count = alloc_secondary_records(SMP_MAX_CPUS + 3);
        assert_eq!(count, SMP_MAX_CPUS - 1);
        assert_eq!(cpu_count(), SMP_MAX_CPUS);

        // Exactly one record per core, each with its own id.
        for cpu in 0..cpu_count() {
            let record = cpu_record(cpu).unwrap();
            assert_eq!(record.cpu_id, cpu);
        }
        assert!(cpu_record(cpu_count()).is_none());

        // Secondaries block on the gate until the primary opens it.
        static PASSED: AtomicUsize = AtomicUsize::new(0);
        let mut secondaries = Vec::new();
        for cpu in 1..4 {
            secondaries.push(thread::spawn(move || {
                wait_for_release();
                PASSED.fetch_add(1, Ordering::SeqCst);
                init_secondary(cpu, 0x100 + cpu);
            }));
        }

        thread::sleep(Duration::from_millis(50));
        assert_eq!(PASSED.load(Ordering::SeqCst), 0);

        release_secondaries();
        for s in secondaries {
            s.join().unwrap();
        }
        assert_eq!(PASSED.load(Ordering::SeqCst), 3);

        for cpu in 1..4 {
            let record = cpu_record(cpu).unwrap();
            assert!(record.is_online());
            assert_eq!(record.hw_id(), 0x100 + cpu);
        }
        assert!(!cpu_record(4).unwrap().is_online());
    }
}
