//! QUBO encoding of a window sub-problem.
//!
//! One binary variable per `(interior operation, local start time)` pair,
//! with penalty terms enforcing, at the optimum:
//!
//! 1. one-hot start: each operation starts at exactly one time;
//! 2. precedence: an operation never starts before its in-job predecessor
//!    finishes;
//! 3. machine exclusivity: no two operations overlap on one machine;
//! 4. boundary consistency: times conflicting with edge-crossing operations
//!    are pruned from the variable set entirely;
//!
//! plus a geometric bias on each job's last interior operation that makes any
//! feasible assignment with the earliest last-completion the unique global
//! minimum (base `n + 1` for `n` jobs, so no combination of earlier finishes
//! elsewhere can outweigh one job finishing later). The bias is scaled so
//! its total over all jobs stays strictly below every penalty weight:
//! violating a constraint never pays for an earlier finish.

use std::collections::HashMap;

use thiserror::Error;

use jssp_core::{JobId, Time};

use crate::qubo::{QuboModel, VarId};
use crate::window::{Window, WindowOp};

/// Penalty coefficients for the soft constraint terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LagrangeWeights {
    pub one_hot: f64,
    pub precedence: f64,
    pub share: f64,
}

impl Default for LagrangeWeights {
    fn default() -> Self {
        Self {
            one_hot: 1.0,
            precedence: 1.0,
            share: 1.0,
        }
    }
}

/// A window that cannot be encoded at its current width and position.
/// Recoverable: the caller skips the window and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("no candidate start time survives pruning for job {job}, operation {position}")]
    Unsatisfiable { job: JobId, position: usize },
}

/// A solver assignment that does not describe a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("job {job}, operation {position} has {count} active start variables, expected 1")]
    NotOneHot {
        job: JobId,
        position: usize,
        count: usize,
    },
    #[error("assignment has {actual} variables, model has {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Strategy interface for turning a window into a quadratic model.
///
/// The driver selects an implementation via configuration; only the binary
/// one-hot encoding is currently provided.
pub trait Encoder {
    fn encode(&self, window: &Window) -> Result<Encoded, EncodingError>;
}

/// An encoded window: the quadratic model plus the variable ↔
/// `(operation, local time)` maps needed to interpret solver output.
///
/// Produced fresh per window and discarded after solving.
#[derive(Clone, Debug)]
pub struct Encoded {
    model: QuboModel,
    ops: Vec<WindowOp>,
    /// Variable id → `(index into ops, local start)`.
    vars: Vec<(usize, Time)>,
    /// `(index into ops, local start)` → variable id.
    index: HashMap<(usize, Time), VarId>,
}

impl Encoded {
    pub fn model(&self) -> &QuboModel {
        &self.model
    }

    /// The interior operations this encoding covers, in variable order.
    pub fn ops(&self) -> &[WindowOp] {
        &self.ops
    }

    /// The variable for `(op, t)`, if it survived pruning.
    pub fn var(&self, op_index: usize, t: Time) -> Option<VarId> {
        self.index.get(&(op_index, t)).copied()
    }

    /// Surviving candidate start times of one interior operation, ascending.
    pub fn candidate_times(&self, op_index: usize) -> Vec<Time> {
        let mut times: Vec<Time> = self
            .vars
            .iter()
            .filter(|(op, _)| *op == op_index)
            .map(|&(_, t)| t)
            .collect();
        times.sort_unstable();
        times
    }

    /// Interpret a solver assignment as local start times, one per interior
    /// operation. Fails if any operation has zero or multiple active
    /// variables; callers treat this the same as a solver failure.
    pub fn decode(&self, assignment: &[bool]) -> Result<Vec<(JobId, usize, Time)>, DecodeError> {
        if assignment.len() != self.vars.len() {
            return Err(DecodeError::LengthMismatch {
                expected: self.vars.len(),
                actual: assignment.len(),
            });
        }

        let mut chosen: Vec<Option<Time>> = vec![None; self.ops.len()];
        let mut counts = vec![0usize; self.ops.len()];

        for (var, &(op, t)) in self.vars.iter().enumerate() {
            if assignment[var] {
                counts[op] += 1;
                chosen[op] = Some(t);
            }
        }

        for (op_index, op) in self.ops.iter().enumerate() {
            if counts[op_index] != 1 {
                return Err(DecodeError::NotOneHot {
                    job: op.job,
                    position: op.position,
                    count: counts[op_index],
                });
            }
        }

        Ok(self
            .ops
            .iter()
            .zip(chosen)
            .map(|(op, t)| (op.job, op.position, t.unwrap_or(0)))
            .collect())
    }

    /// The assignment selecting exactly the given local starts. `None` if a
    /// start was pruned from the encoding. Inverse of [`Encoded::decode`].
    pub fn assignment_of(&self, starts: &[(JobId, usize, Time)]) -> Option<Vec<bool>> {
        let mut assignment = vec![false; self.model.num_variables()];
        for &(job, position, t) in starts {
            let op_index = self
                .ops
                .iter()
                .position(|op| op.job == job && op.position == position)?;
            let var = self.var(op_index, t)?;
            assignment[var] = true;
        }
        Some(assignment)
    }
}

/// Binary one-hot start-time encoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct OneHotEncoder {
    pub weights: LagrangeWeights,
}

impl OneHotEncoder {
    pub fn new(weights: LagrangeWeights) -> Self {
        Self { weights }
    }

    /// Candidate local start times for every interior operation, after
    /// pruning. Returns `Unsatisfiable` if any operation ends up empty.
    fn candidate_times(window: &Window) -> Result<Vec<Vec<Time>>, EncodingError> {
        let len = window.len();

        // Slack pruning within each job's contiguous interior run: time
        // consumed by interior predecessors (head) and by the operation
        // itself plus interior successors (tail).
        let mut head = vec![0; window.ops.len()];
        let mut tail = vec![0; window.ops.len()];
        for (a, b) in window.precedence_pairs() {
            head[b] = head[a] + window.ops[a].duration;
        }
        for (a, b) in window.precedence_pairs().into_iter().rev() {
            tail[a] = tail[b] + window.ops[b].duration;
        }

        let mut all = Vec::with_capacity(window.ops.len());
        for (op_index, op) in window.ops.iter().enumerate() {
            let till = window.disable_till.get(&op.machine).copied().unwrap_or(0);
            let since = window
                .disable_since
                .get(&op.machine)
                .copied()
                .unwrap_or(len);

            let lo = head[op_index].max(till);
            let hi = (len - tail[op_index] - op.duration).min(since - op.duration);

            let times: Vec<Time> = (lo..=hi)
                .filter(|&t| !window.forbidden.contains(&(op.job, op.position, t)))
                .collect();

            if times.is_empty() {
                return Err(EncodingError::Unsatisfiable {
                    job: op.job,
                    position: op.position,
                });
            }
            all.push(times);
        }
        Ok(all)
    }
}

impl Encoder for OneHotEncoder {
    fn encode(&self, window: &Window) -> Result<Encoded, EncodingError> {
        let times = Self::candidate_times(window)?;

        // Variable table, deterministic order: ops in job-position order,
        // times ascending within each op.
        let mut vars: Vec<(usize, Time)> = Vec::new();
        let mut index: HashMap<(usize, Time), VarId> = HashMap::new();
        for (op_index, op_times) in times.iter().enumerate() {
            for &t in op_times {
                index.insert((op_index, t), vars.len());
                vars.push((op_index, t));
            }
        }

        let mut model = QuboModel::new(vars.len());
        let w = self.weights;

        // One-hot start: w * (1 - Σ_t x)^2 expanded over x^2 = x.
        for (op_index, op_times) in times.iter().enumerate() {
            model.add_offset(w.one_hot);
            for (i, &t) in op_times.iter().enumerate() {
                let u = index[&(op_index, t)];
                model.add_linear(u, -w.one_hot);
                for &tt in &op_times[i + 1..] {
                    model.add_quadratic(u, index[&(op_index, tt)], 2.0 * w.one_hot);
                }
            }
        }

        // Precedence: penalize the successor starting before the
        // predecessor finishes.
        for (a, b) in window.precedence_pairs() {
            let dur_a = window.ops[a].duration;
            for &t in &times[a] {
                let u = index[&(a, t)];
                for &tt in &times[b] {
                    if tt < t + dur_a {
                        model.add_quadratic(u, index[&(b, tt)], w.precedence);
                    }
                }
            }
        }

        // Machine exclusivity: penalize every overlapping slot pair of two
        // distinct operations sharing a machine.
        for a in 0..window.ops.len() {
            for b in a + 1..window.ops.len() {
                if window.ops[a].machine != window.ops[b].machine {
                    continue;
                }
                let (dur_a, dur_b) = (window.ops[a].duration, window.ops[b].duration);
                for &t in &times[a] {
                    let u = index[&(a, t)];
                    for &tt in &times[b] {
                        if t < tt + dur_b && tt < t + dur_a {
                            model.add_quadratic(u, index[&(b, tt)], w.share);
                        }
                    }
                }
            }
        }

        // Makespan bias on each job's last interior operation: geometric in
        // the end time with base (#jobs + 1), so any feasible assignment
        // finishing earlier dominates. The per-operation maximum is
        // 1/(2*base) at an edge-tight end time, keeping the total over all
        // jobs under 1/2 and therefore under every penalty weight.
        let num_jobs = {
            let mut jobs: Vec<JobId> = window.ops.iter().map(|op| op.job).collect();
            jobs.dedup();
            jobs.len()
        };
        let base = (num_jobs + 1) as f64;
        let len = window.len();
        for (op_index, op) in window.ops.iter().enumerate() {
            let is_last_of_run = window
                .ops
                .get(op_index + 1)
                .map_or(true, |next| next.job != op.job);
            if !is_last_of_run {
                continue;
            }
            for &t in &times[op_index] {
                let bias = 0.5 * base.powi((t + op.duration - len - 1) as i32);
                model.add_linear(index[&(op_index, t)], bias);
            }
        }

        Ok(Encoded {
            model,
            ops: window.ops.clone(),
            vars,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jssp_core::{Instance, Schedule};
    use pretty_assertions::assert_eq;

    fn extract(instance: &Instance, schedule: &Schedule, start: Time, end: Time) -> Window {
        Window::extract(instance, schedule, start, end)
    }

    fn encode(window: &Window) -> Encoded {
        OneHotEncoder::default().encode(window).unwrap()
    }

    #[test]
    fn single_op_window_is_one_hot_only() {
        let instance = Instance::build(vec![vec![(0, 2)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0]]);
        let window = extract(&instance, &schedule, 0, 4);
        let encoded = encode(&window);

        // t in {0, 1, 2}: t + 2 <= 4.
        assert_eq!(encoded.candidate_times(0), vec![0, 1, 2]);
        let model = encoded.model();
        assert_eq!(model.num_variables(), 3);
        // One-hot expansion: linear -1 each, pairwise +2, offset +1; plus
        // the makespan bias on the job's last op.
        let bias = |t: Time| 0.5 * 2.0_f64.powi((t + 2 - 4 - 1) as i32);
        assert_eq!(model.linear(0), -1.0 + bias(0));
        assert_eq!(model.linear(1), -1.0 + bias(1));
        assert_eq!(model.linear(2), -1.0 + bias(2));
        assert_eq!(model.quadratic(0, 1), 2.0);
        assert_eq!(model.offset(), 1.0);
    }

    #[test]
    fn earliest_start_is_the_unique_minimum() {
        let instance = Instance::build(vec![vec![(0, 2)]]).unwrap();
        let schedule = Schedule::new(vec![vec![1]]);
        let window = extract(&instance, &schedule, 0, 4);
        let encoded = encode(&window);
        let model = encoded.model();

        let e0 = model.energy(&[true, false, false]);
        let e1 = model.energy(&[false, true, false]);
        let e2 = model.energy(&[false, false, true]);
        assert!(e0 < e1 && e1 < e2);
        // Violating one-hot is never cheaper than the best satisfying choice.
        assert!(model.energy(&[false, false, false]) > e0);
        assert!(model.energy(&[true, true, false]) > e0);
    }

    #[test]
    fn precedence_couples_conflicting_slots() {
        // One job, two ops on different machines, window wide enough for
        // both: x[0,t] and x[1,tt] are coupled whenever tt < t + 2.
        let instance = Instance::build(vec![vec![(0, 2), (1, 1)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0, 2]]);
        let window = extract(&instance, &schedule, 0, 3);
        let encoded = encode(&window);
        let model = encoded.model();

        // Op 0: t in {0}, op 1: tt in {0, 1, 2}. Head/tail slack pruning
        // leaves t=0 for op 0 and tt=2 for op 1.
        assert_eq!(encoded.candidate_times(0), vec![0]);
        assert_eq!(encoded.candidate_times(1), vec![2]);
        // The only surviving pair is non-conflicting.
        let u = encoded.var(0, 0).unwrap();
        let v = encoded.var(1, 2).unwrap();
        assert_eq!(model.quadratic(u, v), 0.0);
    }

    #[test]
    fn share_couples_overlapping_slots() {
        // Two jobs, one machine, durations 2 and 1 in a window of 3.
        let instance = Instance::build(vec![vec![(0, 2)], vec![(0, 1)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0], vec![2]]);
        let window = extract(&instance, &schedule, 0, 3);
        let encoded = encode(&window);
        let model = encoded.model();

        let a0 = encoded.var(0, 0).unwrap();
        let b0 = encoded.var(1, 0).unwrap();
        let b2 = encoded.var(1, 2).unwrap();
        // [0,2) overlaps [0,1): coupled. [0,2) and [2,3): disjoint.
        assert!(model.quadratic(a0, b0) >= 1.0);
        assert_eq!(model.quadratic(a0, b2), 0.0);
    }

    #[test]
    fn boundary_pruning_removes_conflicting_predecessor_times() {
        // Job 0: op 0 (m0, 2) inside, op 1 (m1, 3) crossing the right edge
        // at global t = 4 of window [0, 5). No variable of op 0 with
        // t + 2 > 4 may survive.
        let instance = Instance::build(vec![vec![(0, 2), (1, 3)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0, 4]]);
        let window = extract(&instance, &schedule, 0, 5);
        let encoded = encode(&window);

        assert_eq!(window.disable_since.get(&1), Some(&4));
        for &t in &encoded.candidate_times(0) {
            assert!(t + 2 <= 4, "variable at t={t} should have been pruned");
        }
    }

    #[test]
    fn machine_bans_prune_both_sides() {
        // Machine 0 banned until local 2 and from local 5 in a window of 7;
        // a duration-2 op may only start in 2..=3.
        let instance = Instance::build(vec![
            vec![(0, 2)],
            vec![(0, 3), (1, 1)],
            vec![(1, 2), (0, 2)],
        ])
        .unwrap();
        // Job 1 op 0 crosses the left edge ([-1, 2) on m0), job 2 op 1
        // crosses the right edge ([6, 8) on m0).
        let schedule = Schedule::new(vec![vec![3], vec![-1, 2], vec![0, 6]]);
        let window = extract(&instance, &schedule, 0, 7);

        assert_eq!(window.disable_till.get(&0), Some(&2));
        assert_eq!(window.disable_since.get(&0), Some(&6));

        let encoded = encode(&window);
        // Interior op on m0 is job 0 op 0 (duration 2): t >= 2, t + 2 <= 6.
        let op_index = encoded
            .ops()
            .iter()
            .position(|op| op.job == 0)
            .unwrap();
        assert_eq!(encoded.candidate_times(op_index), vec![2, 3, 4]);
    }

    #[test]
    fn unsatisfiable_window_is_reported() {
        // Machine 0 banned until 3, and the only interior op needs 2 units
        // in a window of 4 starting at or after 3: impossible.
        let instance = Instance::build(vec![vec![(0, 2)], vec![(0, 4)]]).unwrap();
        let schedule = Schedule::new(vec![vec![1], vec![-1]]);
        let window = extract(&instance, &schedule, 0, 4);
        assert_eq!(window.disable_till.get(&0), Some(&3));

        let err = OneHotEncoder::default().encode(&window).unwrap_err();
        assert_eq!(
            err,
            EncodingError::Unsatisfiable {
                job: 0,
                position: 0
            }
        );
    }

    #[test]
    fn feasible_assignment_beats_dropping_an_edge_tight_operation() {
        // Window [0, 5) over the 3x3 reference schedule: job 1's operation 1
        // ends exactly at the window edge, where the makespan bias peaks.
        // Clearing that operation's variables must still cost more than the
        // schedule's own feasible assignment.
        let instance = Instance::build(vec![
            vec![(0, 2), (1, 1), (0, 1)],
            vec![(1, 1), (0, 1), (2, 2)],
            vec![(2, 1), (2, 1), (1, 1)],
        ])
        .unwrap();
        let schedule = Schedule::new(vec![vec![0, 2, 3], vec![0, 4, 5], vec![0, 1, 3]]);
        let window = extract(&instance, &schedule, 0, 5);
        let encoded = encode(&window);

        let own: Vec<(JobId, usize, Time)> = window
            .ops
            .iter()
            .map(|op| (op.job, op.position, op.local_start))
            .collect();
        let full = encoded.assignment_of(&own).unwrap();

        let op_index = encoded
            .ops()
            .iter()
            .position(|op| op.job == 1 && op.position == 1)
            .unwrap();
        let mut dropped = full.clone();
        dropped[encoded.var(op_index, 4).unwrap()] = false;

        let model = encoded.model();
        assert!(model.energy(&full) < model.energy(&dropped));
        // The dropped assignment is also undecodable, so the driver could
        // never merge it even if a solver preferred it.
        assert!(encoded.decode(&dropped).is_err());
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let instance = Instance::build(vec![vec![(0, 2)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0]]);
        let window = extract(&instance, &schedule, 0, 4);
        let encoded = encode(&window);

        let short = vec![true];
        assert_eq!(
            encoded.decode(&short),
            Err(DecodeError::LengthMismatch {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn decode_rejects_non_one_hot() {
        let instance = Instance::build(vec![vec![(0, 2)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0]]);
        let window = extract(&instance, &schedule, 0, 4);
        let encoded = encode(&window);

        let none = vec![false; encoded.model().num_variables()];
        assert!(matches!(
            encoded.decode(&none),
            Err(DecodeError::NotOneHot { count: 0, .. })
        ));

        let mut two = none.clone();
        two[0] = true;
        two[1] = true;
        assert!(matches!(
            encoded.decode(&two),
            Err(DecodeError::NotOneHot { count: 2, .. })
        ));
    }

    #[test]
    fn decode_round_trips_through_assignment_of() {
        let instance = Instance::build(vec![vec![(0, 2), (1, 1)]]).unwrap();
        let schedule = Schedule::new(vec![vec![0, 2]]);
        let window = extract(&instance, &schedule, 0, 3);
        let encoded = encode(&window);

        let starts = vec![(0, 0, 0), (0, 1, 2)];
        let assignment = encoded.assignment_of(&starts).unwrap();
        assert_eq!(encoded.decode(&assignment).unwrap(), starts);
    }
}
