//! Solver abstraction and a reference simulated annealer.
//!
//! The decomposition driver only needs [`Solver`]: given a quadratic binary
//! model, return assignments ranked by objective value. Whether that is the
//! [`SimulatedAnnealer`] below, tabu search, or a remote physical annealer is
//! the caller's business.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::qubo::{QuboModel, VarId};

/// One candidate assignment with its objective value.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub assignment: Vec<bool>,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("solver produced no samples")]
    NoSamples,
    #[error("solver timed out before producing a sample")]
    TimedOut,
}

/// External combinatorial solver collaborator.
pub trait Solver {
    /// Minimize `model`, returning at least one sample, best first.
    fn solve(&self, model: &QuboModel) -> Result<Vec<Sample>, SolverError>;
}

/// Classic single-flip Metropolis annealer over a geometric temperature
/// ladder, sized from the model's coefficient range.
///
/// Deterministic for a fixed `seed`. A `time_budget` bounds wall-clock time
/// across all reads; reads that do not fit are dropped, and exhausting the
/// budget before the first read completes is a [`SolverError::TimedOut`].
#[derive(Clone, Debug)]
pub struct SimulatedAnnealer {
    /// Independent restarts; each contributes one sample.
    pub num_reads: usize,
    /// Full sweeps over all variables per read.
    pub sweeps: usize,
    pub seed: u64,
    pub time_budget: Option<Duration>,
}

impl Default for SimulatedAnnealer {
    fn default() -> Self {
        Self {
            num_reads: 40,
            sweeps: 200,
            seed: 0,
            time_budget: None,
        }
    }
}

/// Per-variable adjacency view of a model, for O(degree) flip deltas.
struct FlipTable {
    linear: Vec<f64>,
    neighbors: Vec<Vec<(VarId, f64)>>,
}

impl FlipTable {
    fn new(model: &QuboModel) -> Self {
        let n = model.num_variables();
        let mut neighbors: Vec<Vec<(VarId, f64)>> = vec![Vec::new(); n];
        for (u, v, coeff) in model.couplings() {
            neighbors[u].push((v, coeff));
            neighbors[v].push((u, coeff));
        }
        Self {
            linear: (0..n).map(|v| model.linear(v)).collect(),
            neighbors,
        }
    }

    /// Energy change of flipping `var` in `state`.
    fn delta(&self, state: &[bool], var: VarId) -> f64 {
        let mut d = self.linear[var];
        for &(other, coeff) in &self.neighbors[var] {
            if state[other] {
                d += coeff;
            }
        }
        if state[var] {
            -d
        } else {
            d
        }
    }
}

impl SimulatedAnnealer {
    /// Hot/cold temperatures from the largest effective single-flip energy
    /// scale, following the usual schedule heuristic.
    fn temperature_range(table: &FlipTable) -> (f64, f64) {
        let max_scale = table
            .linear
            .iter()
            .zip(&table.neighbors)
            .map(|(bias, neigh)| {
                bias.abs() + neigh.iter().map(|(_, c)| c.abs()).sum::<f64>()
            })
            .fold(0.0_f64, f64::max)
            .max(1.0);
        (max_scale, 0.05)
    }

    fn one_read(
        &self,
        table: &FlipTable,
        model: &QuboModel,
        rng: &mut StdRng,
    ) -> Sample {
        let n = model.num_variables();
        let mut state: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();

        let (hot, cold) = Self::temperature_range(table);
        let steps = self.sweeps.max(1);
        let cooling = (cold / hot).powf(1.0 / steps as f64);

        let mut temperature = hot;
        for _ in 0..steps {
            for var in 0..n {
                let delta = table.delta(&state, var);
                if delta <= 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
                    state[var] = !state[var];
                }
            }
            temperature *= cooling;
        }

        let energy = model.energy(&state);
        Sample {
            assignment: state,
            energy,
        }
    }
}

impl Solver for SimulatedAnnealer {
    fn solve(&self, model: &QuboModel) -> Result<Vec<Sample>, SolverError> {
        if model.num_variables() == 0 {
            return Err(SolverError::NoSamples);
        }

        let table = FlipTable::new(model);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let started = Instant::now();

        let mut samples = Vec::with_capacity(self.num_reads.max(1));
        for _ in 0..self.num_reads.max(1) {
            if let Some(budget) = self.time_budget {
                if started.elapsed() >= budget && !samples.is_empty() {
                    break;
                }
            }
            samples.push(self.one_read(&table, model, &mut rng));
            if let Some(budget) = self.time_budget {
                if started.elapsed() >= budget {
                    break;
                }
            }
        }

        if samples.is_empty() {
            return Err(SolverError::TimedOut);
        }
        samples.sort_by(|a, b| a.energy.total_cmp(&b.energy));
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn annealer() -> SimulatedAnnealer {
        SimulatedAnnealer {
            num_reads: 20,
            sweeps: 100,
            seed: 42,
            time_budget: None,
        }
    }

    #[test]
    fn finds_the_minimum_of_a_tiny_model() {
        // E = -x0 + x1 + 2 x0 x1: minimum at x0=1, x1=0, energy -1.
        let mut model = QuboModel::new(2);
        model.add_linear(0, -1.0);
        model.add_linear(1, 1.0);
        model.add_quadratic(0, 1, 2.0);

        let samples = annealer().solve(&model).unwrap();
        let best = &samples[0];
        assert_eq!(best.assignment, vec![true, false]);
        assert_eq!(best.energy, -1.0);
    }

    #[test]
    fn samples_are_ranked_ascending() {
        let mut model = QuboModel::new(3);
        model.add_linear(0, -1.0);
        model.add_linear(1, -2.0);
        model.add_linear(2, 3.0);

        let samples = annealer().solve(&model).unwrap();
        for pair in samples.windows(2) {
            assert!(pair[0].energy <= pair[1].energy);
        }
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let mut model = QuboModel::new(4);
        model.add_linear(0, -1.0);
        model.add_quadratic(0, 3, 1.5);
        model.add_quadratic(1, 2, -0.5);

        let a = annealer().solve(&model).unwrap();
        let b = annealer().solve(&model).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_model_is_an_error() {
        let model = QuboModel::new(0);
        assert_eq!(annealer().solve(&model), Err(SolverError::NoSamples));
    }

    #[test]
    fn flip_delta_matches_energy_difference() {
        let mut model = QuboModel::new(3);
        model.add_linear(0, -2.0);
        model.add_linear(2, 1.0);
        model.add_quadratic(0, 1, 5.0);
        model.add_quadratic(1, 2, -1.5);

        let table = FlipTable::new(&model);
        let state = vec![true, true, false];
        for var in 0..3 {
            let mut flipped = state.clone();
            flipped[var] = !flipped[var];
            let expected = model.energy(&flipped) - model.energy(&state);
            assert!((table.delta(&state, var) - expected).abs() < 1e-12);
        }
    }
}
