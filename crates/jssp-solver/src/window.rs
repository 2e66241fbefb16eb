//! Window extraction: carve a bounded time interval out of a full schedule
//! and derive the constraints that keep a local re-optimization consistent
//! with the untouched remainder.
//!
//! Every operation is classified against the half-open window `[start, end)`:
//!
//! - fully inside: becomes an interior operation, relabeled to local time;
//! - crosses the right edge: the machine is banned from the crosser's local
//!   start onward (`disable_since`), and the crosser's in-job predecessor is
//!   forbidden any local start that would finish after the crosser begins;
//! - crosses the left edge: the machine is banned until the crosser's local
//!   end (`disable_till`), and the crosser's in-job successor is forbidden
//!   any local start before that end;
//! - crosses both edges: ignored; the window cannot move it and interior
//!   machine bans are unnecessary because nothing else fits around it.
//!
//! Extraction is deterministic and never mutates the schedule; `Window`
//! derives `PartialEq` so idempotence is checkable bit-for-bit.

use std::collections::{BTreeMap, BTreeSet};

use jssp_core::{Instance, JobId, MachineId, Schedule, Time};

/// An interior operation with its current (global) start time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowOp {
    pub job: JobId,
    pub position: usize,
    pub machine: MachineId,
    pub duration: Time,
    /// Current start, relative to the window origin.
    pub local_start: Time,
}

/// A bounded sub-problem cut from a schedule, plus the boundary constraints
/// derived from operations straddling the window edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: Time,
    pub end: Time,
    /// Interior operations in job-position order.
    pub ops: Vec<WindowOp>,
    /// Per machine: banned for local times `< value` (left-edge crossers).
    pub disable_till: BTreeMap<MachineId, Time>,
    /// Per machine: banned for local times `>= value` (right-edge crossers).
    pub disable_since: BTreeMap<MachineId, Time>,
    /// Explicit `(job, position, local_time)` bans for neighbours of
    /// edge-crossing operations.
    pub forbidden: BTreeSet<(JobId, usize, Time)>,
}

impl Window {
    /// Classify every operation of `schedule` against `[start, end)` and
    /// derive the boundary constraints.
    pub fn extract(instance: &Instance, schedule: &Schedule, start: Time, end: Time) -> Self {
        debug_assert!(start < end, "window must be non-empty");

        let mut ops = Vec::new();
        let mut disable_till: BTreeMap<MachineId, Time> = BTreeMap::new();
        let mut disable_since: BTreeMap<MachineId, Time> = BTreeMap::new();
        let mut forbidden: BTreeSet<(JobId, usize, Time)> = BTreeSet::new();

        for op in instance.operations() {
            let op_start = schedule.start(op.job, op.position);
            let op_end = op_start + op.duration;

            if op_start >= start && op_end <= end {
                // Fully inside.
                ops.push(WindowOp {
                    job: op.job,
                    position: op.position,
                    machine: op.machine,
                    duration: op.duration,
                    local_start: op_start - start,
                });
            } else if start <= op_start && op_start < end && op_end > end {
                // Crosses the right edge: machine taken from op_start on.
                let since = op_start - start;
                disable_since
                    .entry(op.machine)
                    .and_modify(|t| *t = (*t).min(since))
                    .or_insert(since);

                // The in-job predecessor must finish by op_start.
                if op.position > 0 {
                    let pred = instance.operation(op.job, op.position - 1);
                    for t in (since - pred.duration + 1).max(0)..(end - start) {
                        forbidden.insert((op.job, op.position - 1, t));
                    }
                }
            } else if op_start < start && start < op_end && op_end <= end {
                // Crosses the left edge: machine taken until op_end.
                let till = op_end - start;
                disable_till
                    .entry(op.machine)
                    .and_modify(|t| *t = (*t).max(till))
                    .or_insert(till);

                // The in-job successor cannot start before op_end.
                if op.position + 1 < instance.job(op.job).len() {
                    for t in 0..till {
                        forbidden.insert((op.job, op.position + 1, t));
                    }
                }
            }
            // Crossing both edges (or entirely outside): nothing to do.
        }

        Self {
            start,
            end,
            ops,
            disable_till,
            disable_since,
            forbidden,
        }
    }

    /// Window length in time units.
    pub fn len(&self) -> Time {
        self.end - self.start
    }

    /// Whether the window contains no interior operation.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consecutive `(index, index)` pairs of interior ops belonging to the
    /// same job. Interior ops of one job are contiguous in position (a gap
    /// would imply an operation both starting and ending outside a window
    /// that its neighbours fit into), so adjacency in the sorted op list is
    /// sufficient.
    pub fn precedence_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..self.ops.len().saturating_sub(1) {
            let (a, b) = (&self.ops[i], &self.ops[i + 1]);
            if a.job == b.job && a.position + 1 == b.position {
                pairs.push((i, i + 1));
            }
        }
        pairs
    }
}
