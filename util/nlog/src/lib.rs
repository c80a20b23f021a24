// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 The nucleus Authors.

//! Kernel console printing and `log` facade wiring.
//!
//! The runtime implements [`LogSink`] over the platform console; this crate
//! turns that into a [`log::Log`] backend that prefixes each record with
//! the uptime, the CPU and the task that produced it. [`kprint!`] and
//! [`kprintln!`] bypass the facade and write to the sink directly, which is
//! what the panic path and early boot use.

#![cfg_attr(not(test), no_std)]

use core::fmt::{self, Write};

use crate_interface::call_interface;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Adapter the runtime implements to back the logger.
#[crate_interface::def_interface]
pub trait LogSink {
    /// Writes a string to the console.
    fn write_str(s: &str);

    /// Monotonic time since boot.
    fn now() -> core::time::Duration;

    /// The CPU the caller runs on, if per-CPU state is up.
    fn cpu_id() -> Option<usize>;

    /// The current task, if the scheduler is up.
    fn task_id() -> Option<u64>;
}

struct SinkWriter;

impl Write for SinkWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        call_interface!(LogSink::write_str, s);
        Ok(())
    }
}

#[doc(hidden)]
pub fn __print_impl(args: fmt::Arguments) {
    let _ = SinkWriter.write_fmt(args);
}

/// Prints to the console through the registered [`LogSink`].
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::__print_impl(format_args!($($arg)*))
    };
}

/// Prints to the console through the registered [`LogSink`], with a newline.
#[macro_export]
macro_rules! kprintln {
    () => { $crate::kprint!("\n") };
    ($($arg:tt)*) => {
        $crate::__print_impl(format_args!("{}\n", format_args!($($arg)*)))
    };
}

struct KernelLogger;

impl Log for KernelLogger {
    #[inline]
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = call_interface!(LogSink::now);
        let cpu = call_interface!(LogSink::cpu_id);
        let task = call_interface!(LogSink::task_id);
        let level = match record.level() {
            Level::Error => "E",
            Level::Warn => "W",
            Level::Info => "I",
            Level::Debug => "D",
            Level::Trace => "T",
        };
        let _ = SinkWriter.write_fmt(format_args!(
            "[{:>6}.{:06} {}:{} {} {}] {}\n",
            now.as_secs(),
            now.subsec_micros(),
            OptDisplay(cpu),
            OptDisplay(task),
            level,
            record.target(),
            record.args(),
        ));
    }

    fn flush(&self) {}
}

struct OptDisplay<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for OptDisplay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("-"),
        }
    }
}

static LOGGER: KernelLogger = KernelLogger;

/// Installs the kernel logger as the `log` facade backend.
pub fn init() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Warn);
}

/// Sets the maximum log level from its textual name.
///
/// Unknown names leave the current level unchanged.
pub fn set_log_level(level: &str) {
    let filter = match level {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => return,
    };
    log::set_max_level(filter);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    struct TestSink;

    #[crate_interface::impl_interface]
    impl LogSink for TestSink {
        fn write_str(s: &str) {
            CAPTURED.lock().unwrap().push_str(s);
        }

        fn now() -> core::time::Duration {
            core::time::Duration::from_micros(1_500_000)
        }

        fn cpu_id() -> Option<usize> {
            Some(0)
        }

        fn task_id() -> Option<u64> {
            None
        }
    }

    #[test]
    fn kprintln_writes_through_the_sink() {
        kprintln!("boot {} cpus", 4);
        assert!(CAPTURED.lock().unwrap().contains("boot 4 cpus\n"));
    }

    #[test]
    fn logger_formats_records() {
        init();
        set_log_level("info");
        log::info!(target: "nlog::tests", "hello");
        let captured = CAPTURED.lock().unwrap();
        let line = captured
            .lines()
            .find(|l| l.contains("hello"))
            .expect("record not written");
        // Uptime, cpu, level and target all make it into the prefix.
        assert!(line.contains("1.500000"));
        assert!(line.contains(" 0:- I nlog::tests"));
    }
}
