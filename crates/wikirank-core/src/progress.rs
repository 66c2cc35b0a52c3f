//! Periodic progress notifications for long single-pass streams.
//!
//! Purely observational: a [`Progress`] emits an `info!` event every
//! `interval` units with the cumulative count and a wall-clock timestamp.
//! Nothing downstream depends on it, and an interval of zero disables it.

use chrono::{Local, SecondsFormat};
use tracing::info;

/// Batch-boundary progress reporter.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    stage: &'static str,
    interval: u64,
}

impl Progress {
    /// Default batch size: one notification per million lines.
    pub const DEFAULT_INTERVAL: u64 = 1_000_000;

    #[must_use]
    pub const fn new(stage: &'static str, interval: u64) -> Self {
        Self { stage, interval }
    }

    /// A reporter that never emits anything.
    #[must_use]
    pub const fn disabled(stage: &'static str) -> Self {
        Self::new(stage, 0)
    }

    #[must_use]
    pub const fn stage(&self) -> &'static str {
        self.stage
    }

    /// Returns `true` when `count` sits on a batch boundary.
    #[must_use]
    pub const fn is_boundary(&self, count: u64) -> bool {
        self.interval != 0 && count != 0 && count % self.interval == 0
    }

    /// Record that `count` units have been processed so far.
    pub fn observe(&self, count: u64) {
        if self.is_boundary(count) {
            info!(
                stage = self.stage,
                lines = count,
                at = %Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
                "progress"
            );
        }
    }
}
