//! # jssp-core
//!
//! Core domain model for the jssp job-shop scheduling engine.
//!
//! This crate provides:
//! - Domain types: `Instance`, `Operation`, `Schedule`
//! - The validity checker (precedence + machine exclusivity)
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use jssp_core::Instance;
//!
//! // Two jobs, two machines: each row is (machine, duration).
//! let instance = Instance::build(vec![
//!     vec![(0, 2), (1, 1)],
//!     vec![(1, 3), (0, 2)],
//! ]).unwrap();
//! assert_eq!(instance.num_jobs(), 2);
//! assert_eq!(instance.num_machines(), 2);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod schedule;
mod validity;

pub use schedule::{MachineSlot, Schedule};
pub use validity::{is_valid, violations, Violation};

// ============================================================================
// Type Aliases
// ============================================================================

/// Index of a job within an instance
pub type JobId = usize;

/// Index of a machine within an instance
pub type MachineId = usize;

/// Discrete scheduling time (unitless ticks)
pub type Time = i64;

// ============================================================================
// Operation
// ============================================================================

/// One machine-bound step of a job with a fixed duration.
///
/// Immutable once the owning [`Instance`] is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Owning job
    pub job: JobId,
    /// Index within the job (0-based, contiguous)
    pub position: usize,
    /// Machine this operation runs on
    pub machine: MachineId,
    /// Processing time, strictly positive
    pub duration: Time,
}

impl Operation {
    /// End time of this operation when started at `start`.
    pub fn end(&self, start: Time) -> Time {
        start + self.duration
    }
}

// ============================================================================
// Instance
// ============================================================================

/// Errors detected while building an [`Instance`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("instance has no jobs")]
    NoJobs,
    #[error("job {job} has no operations")]
    EmptyJob { job: JobId },
    #[error("job {job}, operation {position} has non-positive duration {duration}")]
    NonPositiveDuration {
        job: JobId,
        position: usize,
        duration: Time,
    },
}

/// An immutable job-shop instance: for every job, the ordered sequence of
/// operations it must run.
///
/// Operations are resolved to fixed `(job, position)` coordinates at build
/// time so the hot encoding loops never touch a hash map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    jobs: Vec<Vec<Operation>>,
    num_machines: usize,
}

impl Instance {
    /// Build an instance from `(machine, duration)` rows, one row per job.
    ///
    /// Fails if there are no jobs, a job is empty, or any duration is not
    /// strictly positive.
    pub fn build(jobs: Vec<Vec<(MachineId, Time)>>) -> Result<Self, InstanceError> {
        if jobs.is_empty() {
            return Err(InstanceError::NoJobs);
        }

        let mut built: Vec<Vec<Operation>> = Vec::with_capacity(jobs.len());
        let mut num_machines = 0;

        for (job, row) in jobs.into_iter().enumerate() {
            if row.is_empty() {
                return Err(InstanceError::EmptyJob { job });
            }
            let mut ops = Vec::with_capacity(row.len());
            for (position, (machine, duration)) in row.into_iter().enumerate() {
                if duration <= 0 {
                    return Err(InstanceError::NonPositiveDuration {
                        job,
                        position,
                        duration,
                    });
                }
                num_machines = num_machines.max(machine + 1);
                ops.push(Operation {
                    job,
                    position,
                    machine,
                    duration,
                });
            }
            built.push(ops);
        }

        Ok(Self {
            jobs: built,
            num_machines,
        })
    }

    /// All jobs, each an ordered slice of operations.
    pub fn jobs(&self) -> &[Vec<Operation>] {
        &self.jobs
    }

    /// Operations of one job, ordered by position.
    pub fn job(&self, job: JobId) -> &[Operation] {
        &self.jobs[job]
    }

    /// Look up a single operation by coordinates.
    pub fn operation(&self, job: JobId, position: usize) -> &Operation {
        &self.jobs[job][position]
    }

    /// Iterate over every operation in job-position order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.jobs.iter().flatten()
    }

    pub fn num_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// One past the largest machine id referenced by any operation.
    pub fn num_machines(&self) -> usize {
        self.num_machines
    }

    pub fn num_operations(&self) -> usize {
        self.jobs.iter().map(Vec::len).sum()
    }

    /// Sum of all durations; a trivial upper bound on the makespan.
    pub fn total_duration(&self) -> Time {
        self.operations().map(|op| op.duration).sum()
    }

    /// Remap durations to the small buckets `1..=steps.len()+1`: an operation
    /// shorter than `steps[i]` gets duration `i + 1`, anything longer gets
    /// `steps.len() + 1`. Shrinks the time horizon (and with it the QUBO
    /// variable count) while preserving the machine routing.
    pub fn squash(&self, steps: &[Time]) -> Self {
        let mut steps = steps.to_vec();
        steps.sort_unstable();

        let squash_one = |duration: Time| -> Time {
            for (i, step) in steps.iter().enumerate() {
                if duration < *step {
                    return (i + 1) as Time;
                }
            }
            (steps.len() + 1) as Time
        };

        let jobs = self
            .jobs
            .iter()
            .map(|ops| {
                ops.iter()
                    .map(|op| Operation {
                        duration: squash_one(op.duration),
                        ..*op
                    })
                    .collect()
            })
            .collect();

        Self {
            jobs,
            num_machines: self.num_machines,
        }
    }
}
