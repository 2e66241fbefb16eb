//! Greedy schedule construction.
//!
//! Maintains, per machine, an ordered list of free time intervals and places
//! operations round-robin by position index: operation `i` of a job goes into
//! the earliest free interval on its machine that starts no earlier than the
//! completion of operation `i - 1` and is long enough to hold the duration.
//! The interval is then split around the placement.
//!
//! Always produces a feasible schedule; it is deterministic for a fixed job
//! visit order. [`solve_randomized`] shuffles the visit order per round to
//! generate diverse (usually worse) restart seeds for the decomposition loop.

use jssp_core::{Instance, Schedule, Time};
use rand::seq::SliceRandom;
use rand::Rng;

/// Free time on one machine: finite `[from, to)` gaps sorted by start, plus
/// an unbounded tail `[tail, +inf)`.
#[derive(Debug)]
struct FreeList {
    gaps: Vec<(Time, Time)>,
    tail: Time,
}

impl FreeList {
    fn new() -> Self {
        Self {
            gaps: Vec::new(),
            tail: 0,
        }
    }

    /// Place a block of `duration` into the earliest gap that can hold it
    /// starting no earlier than `not_before`. Returns the chosen start.
    fn place(&mut self, not_before: Time, duration: Time) -> Time {
        for (i, &(from, to)) in self.gaps.iter().enumerate() {
            let start = from.max(not_before);
            if to - start >= duration {
                let end = start + duration;
                // Split the gap around [start, end).
                self.gaps.remove(i);
                if to > end {
                    self.gaps.insert(i, (end, to));
                }
                if start > from {
                    self.gaps.insert(i, (from, start));
                }
                return start;
            }
        }

        let start = self.tail.max(not_before);
        if start > self.tail {
            self.gaps.push((self.tail, start));
        }
        self.tail = start + duration;
        start
    }
}

fn solve_in_order(
    instance: &Instance,
    mut job_order: impl FnMut(usize, &mut Vec<usize>),
) -> Schedule {
    let mut machines: Vec<FreeList> = (0..instance.num_machines())
        .map(|_| FreeList::new())
        .collect();

    let mut starts: Vec<Vec<Time>> = instance
        .jobs()
        .iter()
        .map(|ops| Vec::with_capacity(ops.len()))
        .collect();

    let max_positions = instance.jobs().iter().map(Vec::len).max().unwrap_or(0);
    let mut round: Vec<usize> = (0..instance.num_jobs()).collect();

    for position in 0..max_positions {
        job_order(position, &mut round);
        for &job in &round {
            let ops = instance.job(job);
            if position >= ops.len() {
                continue;
            }
            let op = &ops[position];
            let not_before = if position == 0 {
                0
            } else {
                starts[job][position - 1] + ops[position - 1].duration
            };
            let start = machines[op.machine].place(not_before, op.duration);
            starts[job].push(start);
        }
    }

    Schedule::new(starts)
}

/// Build a feasible schedule deterministically, visiting jobs in index order.
pub fn solve_greedily(instance: &Instance) -> Schedule {
    solve_in_order(instance, |_, _| {})
}

/// Build a feasible schedule with the job visit order shuffled every round.
///
/// Still always feasible, usually worse than [`solve_greedily`]; that is
/// the point: it leaves the decomposition loop room for improvement and
/// diversifies restarts.
pub fn solve_randomized<R: Rng>(instance: &Instance, rng: &mut R) -> Schedule {
    solve_in_order(instance, |_, round| round.shuffle(rng))
}
