//! Start-time assignments for an instance.

use serde::{Deserialize, Serialize};

use crate::{Instance, JobId, MachineId, Time};

/// One scheduled occupation of a machine, used when grouping a schedule by
/// machine instead of by job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSlot {
    pub job: JobId,
    pub position: usize,
    pub start: Time,
    pub duration: Time,
}

/// A start-time assignment: one start per operation, in the same shape as the
/// instance's job list.
///
/// A schedule is produced whole, by the greedy constructor or by merging a
/// re-optimized window into a copy of a previous schedule, and is never
/// partially mutated across a merge boundary without re-validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    starts: Vec<Vec<Time>>,
}

impl Schedule {
    pub fn new(starts: Vec<Vec<Time>>) -> Self {
        Self { starts }
    }

    /// Start times of one job, ordered by operation position.
    pub fn job(&self, job: JobId) -> &[Time] {
        &self.starts[job]
    }

    pub fn jobs(&self) -> &[Vec<Time>] {
        &self.starts
    }

    pub fn start(&self, job: JobId, position: usize) -> Time {
        self.starts[job][position]
    }

    pub fn set_start(&mut self, job: JobId, position: usize, start: Time) {
        self.starts[job][position] = start;
    }

    /// Whether this schedule has the same shape as `instance`.
    pub fn matches(&self, instance: &Instance) -> bool {
        self.starts.len() == instance.num_jobs()
            && self
                .starts
                .iter()
                .enumerate()
                .all(|(job, starts)| starts.len() == instance.job(job).len())
    }

    /// Completion time of the last operation across all jobs.
    pub fn makespan(&self, instance: &Instance) -> Time {
        self.starts
            .iter()
            .enumerate()
            .map(|(job, starts)| {
                let last = instance.job(job).len() - 1;
                starts[last] + instance.operation(job, last).duration
            })
            .max()
            .unwrap_or(0)
    }

    /// Group the schedule by machine: for every machine, the occupations
    /// sorted by start time. Read-only view consumed by the validity checker
    /// and by external visualization collaborators.
    pub fn machine_timeline(&self, instance: &Instance) -> Vec<Vec<MachineSlot>> {
        let mut timeline: Vec<Vec<MachineSlot>> = vec![Vec::new(); instance.num_machines()];
        for op in instance.operations() {
            timeline[op.machine].push(MachineSlot {
                job: op.job,
                position: op.position,
                start: self.start(op.job, op.position),
                duration: op.duration,
            });
        }
        for slots in &mut timeline {
            slots.sort_unstable_by_key(|slot| (slot.start, slot.job, slot.position));
        }
        timeline
    }

    /// Machines that are referenced by the timeline, for convenience.
    pub fn occupied_machines(&self, instance: &Instance) -> Vec<MachineId> {
        let timeline = self.machine_timeline(instance);
        (0..timeline.len())
            .filter(|&m| !timeline[m].is_empty())
            .collect()
    }
}
