//! Sliding-window decomposition driver.
//!
//! Repeatedly carves a time window out of the live schedule, re-optimizes it
//! through the encoder and an external [`Solver`], and merges validated
//! improvements back, iterating until the pass budget is exhausted or a
//! full pass brings no improvement.
//!
//! Within one pass, extraction, encoding, and solving of all windows run in
//! parallel against the pass-start snapshot. Merges are drained serially:
//! two candidates may touch adjacent operations, so each is re-validated
//! against the live schedule and committed or discarded one at a time. Only
//! interior operations of a window are ever overwritten, so operations a
//! window could not see are provably unaffected, and the global validity
//! gate catches everything the boundary approximation missed.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, warn};

use jssp_core::{is_valid, Instance, JobId, Schedule, Time};

use crate::anneal::Solver;
use crate::encode::{Encoder, LagrangeWeights, OneHotEncoder};
use crate::window::Window;

/// Tuning knobs for the decomposition loop.
#[derive(Clone, Copy, Debug)]
pub struct DriverConfig {
    /// Width of the sliding window, exclusive of its end time.
    pub window_size: Time,
    /// Maximum number of outer passes over the schedule.
    pub passes: usize,
    /// Slack added above the current makespan when sweeping window starts,
    /// so late operations can still shift around.
    pub margin: Time,
    /// Visit window positions in random order instead of left to right.
    pub shuffle: bool,
    pub seed: u64,
    pub weights: LagrangeWeights,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            passes: 10,
            margin: 3,
            shuffle: false,
            seed: 0,
            weights: LagrangeWeights::default(),
        }
    }
}

/// A committed merge: the new live schedule and the window that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Improvement {
    pub schedule: Schedule,
    pub window_start: Time,
    pub makespan: Time,
}

/// Local re-optimization result for one window, pending a serial merge.
type Candidate = (Time, Vec<(JobId, usize, Time)>);

/// Single-pass iterator over committed merges. Owns the live schedule; every
/// yielded schedule has passed the global validity gate.
pub struct Driver<'a, S> {
    instance: &'a Instance,
    solver: S,
    encoder: OneHotEncoder,
    config: DriverConfig,
    current: Schedule,
    rng: StdRng,
    passes_done: usize,
    improved_this_pass: bool,
    pending: VecDeque<Candidate>,
    exhausted: bool,
}

impl<'a, S: Solver + Sync> Driver<'a, S> {
    /// Start a decomposition run from a feasible `initial` schedule.
    pub fn new(instance: &'a Instance, initial: Schedule, solver: S, config: DriverConfig) -> Self {
        debug_assert!(config.window_size > 0);
        debug_assert!(is_valid(instance, &initial), "initial schedule must be feasible");
        Self {
            instance,
            solver,
            encoder: OneHotEncoder::new(config.weights),
            config,
            current: initial,
            rng: StdRng::seed_from_u64(config.seed),
            passes_done: 0,
            improved_this_pass: false,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// The live schedule (always valid).
    pub fn schedule(&self) -> &Schedule {
        &self.current
    }

    /// Extract, encode, and solve one window against `snapshot`.
    /// `None` means the window is skipped for any of the recoverable
    /// reasons: empty interior, unsatisfiable encoding, solver failure, or
    /// an undecodable best sample.
    fn solve_window(&self, snapshot: &Schedule, start: Time) -> Option<Candidate> {
        let window = Window::extract(
            self.instance,
            snapshot,
            start,
            start + self.config.window_size,
        );
        if window.is_empty() {
            return None;
        }

        let encoded = match self.encoder.encode(&window) {
            Ok(encoded) => encoded,
            Err(err) => {
                debug!(window_start = start, %err, "window skipped: encoding");
                return None;
            }
        };

        let samples = match self.solver.solve(encoded.model()) {
            Ok(samples) => samples,
            Err(err) => {
                warn!(window_start = start, %err, "window skipped: solver");
                return None;
            }
        };

        match encoded.decode(&samples[0].assignment) {
            Ok(starts) => Some((start, starts)),
            Err(err) => {
                debug!(window_start = start, %err, "window skipped: decode");
                None
            }
        }
    }

    /// Solve every window of a pass in parallel against a snapshot of the
    /// live schedule, queueing candidates for serial merging.
    fn start_pass(&mut self) {
        let makespan = self.current.makespan(self.instance);
        let max_time = makespan + self.config.margin;

        let mut starts: Vec<Time> = (0..max_time.saturating_sub(self.config.window_size)).collect();
        if self.config.shuffle {
            starts.shuffle(&mut self.rng);
        }

        let snapshot = self.current.clone();
        let candidates: Vec<Option<Candidate>> = starts
            .par_iter()
            .map(|&start| self.solve_window(&snapshot, start))
            .collect();

        self.pending = candidates.into_iter().flatten().collect();
        self.improved_this_pass = false;
    }

    /// Apply one candidate to the live schedule. Only interior operations
    /// are overwritten; the result must pass the global validity gate and
    /// must not worsen the makespan.
    fn try_merge(&mut self, candidate: Candidate) -> Option<Improvement> {
        let (window_start, local_starts) = candidate;
        let before = self.current.makespan(self.instance);

        let mut merged = self.current.clone();
        for (job, position, local_t) in local_starts {
            merged.set_start(job, position, local_t + window_start);
        }

        if !is_valid(self.instance, &merged) {
            debug!(window_start, "merge discarded: validity");
            return None;
        }
        let after = merged.makespan(self.instance);
        if after > before {
            debug!(window_start, before, after, "merge discarded: worse makespan");
            return None;
        }
        if merged == self.current {
            return None;
        }

        if after < before {
            self.improved_this_pass = true;
        }
        debug!(window_start, before, after, "merge committed");
        self.current = merged.clone();
        Some(Improvement {
            schedule: merged,
            window_start,
            makespan: after,
        })
    }
}

impl<S: Solver + Sync> Iterator for Driver<'_, S> {
    type Item = Improvement;

    fn next(&mut self) -> Option<Improvement> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                if let Some(improvement) = self.try_merge(candidate) {
                    return Some(improvement);
                }
                continue;
            }

            // Pass boundary: converged, out of budget, or start the next one.
            if self.exhausted || self.passes_done >= self.config.passes {
                return None;
            }
            if self.passes_done > 0 && !self.improved_this_pass {
                debug!(passes = self.passes_done, "converged: no improvement in last pass");
                self.exhausted = true;
                return None;
            }
            self.start_pass();
            self.passes_done += 1;
        }
    }
}

/// Run the decomposition loop, yielding each committed schedule.
///
/// Convenience wrapper over [`Driver`] matching the shape of the rest of the
/// crate's free functions.
pub fn optimize<S: Solver + Sync>(
    instance: &Instance,
    initial: Schedule,
    solver: S,
    config: DriverConfig,
) -> Driver<'_, S> {
    Driver::new(instance, initial, solver, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anneal::{Sample, SolverError};
    use crate::greedy::solve_greedily;
    use crate::qubo::QuboModel;
    use pretty_assertions::assert_eq;

    /// Solver double that always fails, to exercise the skip path.
    struct Failing;

    impl Solver for Failing {
        fn solve(&self, _model: &QuboModel) -> Result<Vec<Sample>, SolverError> {
            Err(SolverError::NoSamples)
        }
    }

    /// Solver double that returns the all-false assignment (undecodable).
    struct Degenerate;

    impl Solver for Degenerate {
        fn solve(&self, model: &QuboModel) -> Result<Vec<Sample>, SolverError> {
            let assignment = vec![false; model.num_variables()];
            let energy = model.energy(&assignment);
            Ok(vec![Sample { assignment, energy }])
        }
    }

    fn three_by_three() -> Instance {
        Instance::build(vec![
            vec![(0, 2), (1, 1), (0, 1)],
            vec![(1, 1), (0, 1), (2, 2)],
            vec![(2, 1), (2, 1), (1, 1)],
        ])
        .unwrap()
    }

    #[test]
    fn solver_failures_leave_schedule_untouched() {
        let instance = three_by_three();
        let initial = solve_greedily(&instance);
        let config = DriverConfig {
            window_size: 5,
            passes: 2,
            ..DriverConfig::default()
        };

        let mut driver = Driver::new(&instance, initial.clone(), Failing, config);
        assert_eq!(driver.next(), None);
        assert_eq!(driver.schedule(), &initial);
    }

    #[test]
    fn undecodable_samples_are_skipped() {
        let instance = three_by_three();
        let initial = solve_greedily(&instance);
        let config = DriverConfig {
            window_size: 5,
            passes: 2,
            ..DriverConfig::default()
        };

        let mut driver = Driver::new(&instance, initial.clone(), Degenerate, config);
        assert_eq!(driver.next(), None);
        assert_eq!(driver.schedule(), &initial);
    }

    #[test]
    fn zero_passes_yields_nothing() {
        let instance = three_by_three();
        let initial = solve_greedily(&instance);
        let config = DriverConfig {
            passes: 0,
            ..DriverConfig::default()
        };
        let mut driver = Driver::new(&instance, initial, Failing, config);
        assert_eq!(driver.next(), None);
    }
}
