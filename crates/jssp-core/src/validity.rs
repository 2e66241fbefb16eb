//! Schedule feasibility checks.
//!
//! Two invariants must hold for a schedule to be feasible:
//! 1. Precedence: within a job, an operation starts no earlier than its
//!    predecessor's completion.
//! 2. Machine exclusivity: `[start, start + duration)` intervals on one
//!    machine never overlap.
//!
//! [`is_valid`] is the cheap boolean gate used inside the decomposition loop;
//! [`violations`] reports every broken constraint for diagnostics.

use crate::{Instance, JobId, MachineId, Schedule, Time};

/// One broken feasibility constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// An operation starts before time zero.
    NegativeStart { job: JobId, position: usize, start: Time },
    /// An operation starts before its job predecessor completes.
    PrecedenceBroken {
        job: JobId,
        position: usize,
        predecessor_end: Time,
        start: Time,
    },
    /// Two operations overlap on one machine.
    MachineOverlap {
        machine: MachineId,
        first: (JobId, usize),
        second: (JobId, usize),
    },
}

/// Whether `schedule` satisfies both job-shop invariants for `instance`.
///
/// Returns `false` (never panics) for malformed shapes as well, so the
/// decomposition loop can gate merge candidates without a fallible path.
pub fn is_valid(instance: &Instance, schedule: &Schedule) -> bool {
    if !schedule.matches(instance) {
        return false;
    }

    // Precedence + non-negative starts.
    for job in 0..instance.num_jobs() {
        let ops = instance.job(job);
        let starts = schedule.job(job);
        if starts[0] < 0 {
            return false;
        }
        for i in 0..ops.len() - 1 {
            if starts[i + 1] < 0 || starts[i] + ops[i].duration > starts[i + 1] {
                return false;
            }
        }
    }

    // Machine exclusivity: slots are sorted by start, so overlap can only
    // occur between neighbours.
    for slots in schedule.machine_timeline(instance) {
        for pair in slots.windows(2) {
            if pair[0].start + pair[0].duration > pair[1].start {
                return false;
            }
        }
    }

    true
}

/// Every violated constraint, in deterministic order. Empty iff
/// [`is_valid`] returns `true` for a well-shaped schedule.
pub fn violations(instance: &Instance, schedule: &Schedule) -> Vec<Violation> {
    let mut found = Vec::new();

    for job in 0..instance.num_jobs() {
        let ops = instance.job(job);
        let starts = schedule.job(job);
        for (position, &start) in starts.iter().enumerate() {
            if start < 0 {
                found.push(Violation::NegativeStart {
                    job,
                    position,
                    start,
                });
            }
        }
        for i in 0..ops.len() - 1 {
            let predecessor_end = starts[i] + ops[i].duration;
            if predecessor_end > starts[i + 1] {
                found.push(Violation::PrecedenceBroken {
                    job,
                    position: i + 1,
                    predecessor_end,
                    start: starts[i + 1],
                });
            }
        }
    }

    for (machine, slots) in schedule.machine_timeline(instance).into_iter().enumerate() {
        for pair in slots.windows(2) {
            if pair[0].start + pair[0].duration > pair[1].start {
                found.push(Violation::MachineOverlap {
                    machine,
                    first: (pair[0].job, pair[0].position),
                    second: (pair[1].job, pair[1].position),
                });
            }
        }
    }

    found
}
