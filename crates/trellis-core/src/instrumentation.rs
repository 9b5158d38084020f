//! Hit/skip counters for the build and commit passes.
//!
//! A hit is a render or a self commit that actually ran, a skip is a node the
//! pass could leave alone. Each counter logs its running ratio at debug level
//! every `report_interval` samples.

use std::cell::Cell;

pub(crate) const DEFAULT_REPORT_INTERVAL: u64 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipStats {
    pub hits: u64,
    pub skips: u64,
}

impl SkipStats {
    pub fn total(&self) -> u64 {
        self.hits + self.skips
    }

    pub fn skip_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.skips as f64 / total as f64,
        }
    }
}

pub(crate) struct SkipRate {
    name: &'static str,
    hits: Cell<u64>,
    skips: Cell<u64>,
    interval: Cell<u64>,
}

impl SkipRate {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            hits: Cell::new(0),
            skips: Cell::new(0),
            interval: Cell::new(DEFAULT_REPORT_INTERVAL),
        }
    }

    pub(crate) fn hit(&self) {
        self.hits.set(self.hits.get() + 1);
        self.sampled();
    }

    pub(crate) fn skip(&self) {
        self.skips.set(self.skips.get() + 1);
        self.sampled();
    }

    fn sampled(&self) {
        let stats = self.stats();
        let interval = self.interval.get();
        if interval > 0 && stats.total() % interval == 0 {
            log::debug!(
                "{} skip rate {:.1}% ({} of {})",
                self.name,
                stats.skip_ratio() * 100.0,
                stats.skips,
                stats.total()
            );
        }
    }

    fn stats(&self) -> SkipStats {
        SkipStats {
            hits: self.hits.get(),
            skips: self.skips.get(),
        }
    }

    fn reset(&self) {
        self.hits.set(0);
        self.skips.set(0);
    }
}

thread_local! {
    pub(crate) static BUILD_RATE: SkipRate = const { SkipRate::new("build") };
    pub(crate) static COMMIT_RATE: SkipRate = const { SkipRate::new("commit") };
}

/// Counters of this thread's build passes since the last reset.
pub fn build_stats() -> SkipStats {
    BUILD_RATE.with(SkipRate::stats)
}

pub fn commit_stats() -> SkipStats {
    COMMIT_RATE.with(SkipRate::stats)
}

pub fn reset_stats() {
    BUILD_RATE.with(SkipRate::reset);
    COMMIT_RATE.with(SkipRate::reset);
}

/// Zero disables the log lines.
pub fn set_report_interval(samples: u64) {
    BUILD_RATE.with(|rate| rate.interval.set(samples));
    COMMIT_RATE.with(|rate| rate.interval.set(samples));
}
