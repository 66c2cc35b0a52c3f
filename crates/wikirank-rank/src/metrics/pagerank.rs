//! Damped power iteration over a link graph.
//!
//! # Algorithm
//!
//! With `P` the row-normalized adjacency matrix, `D` the dangling rows and
//! `α` the damping factor, one step maps the score row-vector `x` to
//!
//! ```text
//! x'[j] = α · ( Σ_i x[i]·P[i][j]  +  Σ_{d ∈ D} x[d] / N )  +  (1 − α) · Σ x / N
//! ```
//!
//! The dangling term hands the mass of link-less pages back to every node
//! uniformly, so `Σ x'` equals `Σ x` up to rounding.
//!
//! # Convergence
//!
//! After each step the error is the largest per-entry change, scaled by the
//! largest entry of the new vector (or 1.0 when that is zero). Iteration
//! stops once `error < N · tolerance`. Hitting `max_iter` first is not a
//! failure: the last vector is returned with [`StopReason::MaxIterations`]
//! and callers decide whether that is good enough.
//!
//! Per-entry work (the product, the update, the max-reductions) runs on the
//! rayon pool; the two scalar sums are sequential, so repeated runs on the
//! same graph are bit-identical.
//!
//! # Ownership
//!
//! [`CentralityEngine::new`] normalizes a private [`TransitionMatrix`];
//! the caller's adjacency matrix keeps its raw unit cells.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use wikirank_core::config::CentralitySettings;
use wikirank_core::error::RankError;
use wikirank_core::graph::AdjacencyMatrix;

use crate::metrics::transition::TransitionMatrix;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parameters of one power-iteration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralityConfig {
    /// Probability of following a link rather than teleporting.
    /// Must lie strictly inside (0, 1). Default: 0.85.
    pub damping: f64,
    /// Per-node error threshold; the stop test compares against
    /// `N · tolerance`. Default: 1e-10.
    pub tolerance: f64,
    /// Iteration cap. Default: 100.
    pub max_iter: usize,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-10,
            max_iter: 100,
        }
    }
}

impl From<&CentralitySettings> for CentralityConfig {
    fn from(settings: &CentralitySettings) -> Self {
        Self {
            damping: settings.damping,
            tolerance: settings.tolerance,
            max_iter: settings.max_iter,
        }
    }
}

impl CentralityConfig {
    /// Reject out-of-range parameters before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RankError> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(RankError::invalid(
                "damping",
                self.damping,
                "must lie strictly between 0 and 1",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(RankError::invalid(
                "tolerance",
                self.tolerance,
                "must be a positive finite number",
            ));
        }
        if self.max_iter == 0 {
            return Err(RankError::invalid("max_iter", 0, "must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why the iteration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The error fell below `N · tolerance`.
    Converged,
    /// `max_iter` steps ran without meeting the threshold.
    MaxIterations,
    /// The cancel flag was raised between iterations.
    Cancelled,
}

/// Scores plus the diagnostics needed to judge them.
#[derive(Debug, Clone, Serialize)]
pub struct CentralityResult {
    /// One score per node id.
    pub scores: Vec<f64>,
    /// Completed iterations.
    pub iterations: usize,
    /// Scaled error of the last completed iteration.
    pub error: f64,
    pub stop: StopReason,
}

impl CentralityResult {
    #[must_use]
    pub const fn converged(&self) -> bool {
        matches!(self.stop, StopReason::Converged)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Power-iteration driver bound to one graph.
///
/// Build once, then [`run`](Self::run) with as many configurations or warm
/// starts as needed; the normalized matrix is reused.
#[derive(Debug)]
pub struct CentralityEngine<'c> {
    matrix: TransitionMatrix,
    cancel: Option<&'c AtomicBool>,
}

impl<'c> CentralityEngine<'c> {
    #[must_use]
    pub fn new(adjacency: &AdjacencyMatrix) -> Self {
        Self {
            matrix: TransitionMatrix::from_adjacency(adjacency),
            cancel: None,
        }
    }

    /// Check `flag` between iterations and stop early once it is set.
    #[must_use]
    pub const fn with_cancel_flag(mut self, flag: &'c AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[must_use]
    pub const fn transition(&self) -> &TransitionMatrix {
        &self.matrix
    }

    /// Run from the uniform vector `1/N`.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] if `config` is out of range.
    #[allow(clippy::cast_precision_loss)]
    pub fn run(&self, config: &CentralityConfig) -> Result<CentralityResult, RankError> {
        config.validate()?;
        let n = self.matrix.dim();
        let start = vec![1.0 / n.max(1) as f64; n];
        Ok(self.iterate(config, start))
    }

    /// Run from a caller-supplied vector, e.g. scores from an earlier run.
    ///
    /// The vector is rescaled to sum to 1 before the first step.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] if `config` is out of range,
    /// or if `initial` has the wrong length, a negative or non-finite entry,
    /// or sums to zero.
    pub fn run_from(
        &self,
        config: &CentralityConfig,
        initial: &[f64],
    ) -> Result<CentralityResult, RankError> {
        config.validate()?;
        let n = self.matrix.dim();
        if initial.len() != n {
            return Err(RankError::invalid(
                "initial",
                initial.len(),
                "length must equal the node count",
            ));
        }
        if initial.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(RankError::invalid(
                "initial",
                "vector",
                "entries must be finite and nonnegative",
            ));
        }
        let total: f64 = initial.iter().sum();
        if n > 0 && total <= 0.0 {
            return Err(RankError::invalid("initial", total, "must have positive mass"));
        }

        let start = initial.iter().map(|v| v / total).collect();
        Ok(self.iterate(config, start))
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    #[allow(clippy::cast_precision_loss)]
    #[instrument(skip(self, start), fields(n = self.matrix.dim()))]
    fn iterate(&self, config: &CentralityConfig, start: Vec<f64>) -> CentralityResult {
        let n = self.matrix.dim();
        if n == 0 {
            return CentralityResult {
                scores: Vec::new(),
                iterations: 0,
                error: 0.0,
                stop: StopReason::Converged,
            };
        }

        let n_f64 = n as f64;
        let alpha = config.damping;
        let threshold = n_f64 * config.tolerance;

        let mut scores = start;
        let mut next = vec![0.0_f64; n];
        let mut error = f64::INFINITY;
        let mut iterations = 0;
        let mut stop = StopReason::MaxIterations;

        while iterations < config.max_iter {
            if self.cancelled() {
                stop = StopReason::Cancelled;
                break;
            }

            let dangling = self.matrix.dangling_mass(&scores) / n_f64;
            let teleport = (1.0 - alpha) * scores.iter().sum::<f64>() / n_f64;

            self.matrix.pull(&scores, &mut next);
            next.par_iter_mut()
                .for_each(|x| *x = alpha.mul_add(*x + dangling, teleport));

            let peak = next.par_iter().copied().reduce(|| 0.0, f64::max);
            let scale = if peak > 0.0 { peak } else { 1.0 };
            let delta = scores
                .par_iter()
                .zip(next.par_iter())
                .map(|(old, new)| (old - new).abs())
                .reduce(|| 0.0, f64::max);
            error = delta / scale;

            std::mem::swap(&mut scores, &mut next);
            iterations += 1;
            debug!(iteration = iterations, error, "power iteration step");

            if error < threshold {
                stop = StopReason::Converged;
                break;
            }
        }

        match stop {
            StopReason::Converged => info!(iterations, error, "centrality converged"),
            StopReason::MaxIterations => warn!(
                iterations,
                error,
                threshold,
                "centrality hit max_iter before converging"
            ),
            StopReason::Cancelled => warn!(iterations, "centrality cancelled"),
        }

        CentralityResult {
            scores,
            iterations,
            error,
            stop,
        }
    }
}

/// One-shot convenience: build an engine and run it from the uniform vector.
///
/// # Errors
///
/// Returns [`RankError::InvalidParameter`] if `config` is out of range.
pub fn centrality(
    adjacency: &AdjacencyMatrix,
    config: &CentralityConfig,
) -> Result<CentralityResult, RankError> {
    CentralityEngine::new(adjacency).run(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
