//! Global atomic counters for compile invocations.
//!
//! Counters are bumped silently; [`Metrics::flush`] emits them as one
//! `tracing::info!` event, e.g. when the CLI exits.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    invocations: AtomicU64,
    short_circuits: AtomicU64,
    source_files_submitted: AtomicU64,
    failures_ignored: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            invocations: AtomicU64::new(0),
            short_circuits: AtomicU64::new(0),
            source_files_submitted: AtomicU64::new(0),
            failures_ignored: AtomicU64::new(0),
        }
    }

    pub fn inc_invocations(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    /// An invocation that returned without starting the compiler.
    pub fn inc_short_circuits(&self) {
        self.short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_source_files(&self, count: u64) {
        self.source_files_submitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_failures_ignored(&self) {
        self.failures_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            invocations = self.invocations(),
            short_circuits = self.short_circuits(),
            source_files_submitted = self.source_files_submitted(),
            failures_ignored = self.failures_ignored(),
        );
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn short_circuits(&self) -> u64 {
        self.short_circuits.load(Ordering::Relaxed)
    }

    pub fn source_files_submitted(&self) -> u64 {
        self.source_files_submitted.load(Ordering::Relaxed)
    }

    pub fn failures_ignored(&self) -> u64 {
        self.failures_ignored.load(Ordering::Relaxed)
    }
}
