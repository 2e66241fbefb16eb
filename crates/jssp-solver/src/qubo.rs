//! Sparse quadratic pseudo-boolean model.
//!
//! The model is `E(x) = offset + Σ_i linear[i]·x_i + Σ_{i<j} quad[i,j]·x_i·x_j`
//! over binary variables, built through explicit add-linear/add-quadratic
//! calls. Coefficients accumulate, and quadratic keys are normalized to
//! `i < j` so the matrix stays symmetric-upper-triangular.

use std::collections::HashMap;

/// Index of a binary decision variable within a [`QuboModel`].
pub type VarId = usize;

/// A quadratic binary optimization model under minimization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuboModel {
    num_variables: usize,
    linear: Vec<f64>,
    quadratic: HashMap<(VarId, VarId), f64>,
    offset: f64,
}

impl QuboModel {
    pub fn new(num_variables: usize) -> Self {
        Self {
            num_variables,
            linear: vec![0.0; num_variables],
            quadratic: HashMap::new(),
            offset: 0.0,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn linear(&self, var: VarId) -> f64 {
        self.linear[var]
    }

    pub fn quadratic(&self, u: VarId, v: VarId) -> f64 {
        let key = if u < v { (u, v) } else { (v, u) };
        self.quadratic.get(&key).copied().unwrap_or(0.0)
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Accumulate `bias` onto a variable's linear coefficient.
    pub fn add_linear(&mut self, var: VarId, bias: f64) {
        self.linear[var] += bias;
    }

    /// Accumulate `coeff` onto a pair's quadratic coefficient. `u` and `v`
    /// must be distinct; the key is normalized to `u < v`.
    pub fn add_quadratic(&mut self, u: VarId, v: VarId, coeff: f64) {
        debug_assert_ne!(u, v, "diagonal terms belong in the linear part");
        let key = if u < v { (u, v) } else { (v, u) };
        *self.quadratic.entry(key).or_insert(0.0) += coeff;
    }

    pub fn add_offset(&mut self, constant: f64) {
        self.offset += constant;
    }

    /// Iterate over the non-zero quadratic couplings.
    pub fn couplings(&self) -> impl Iterator<Item = (VarId, VarId, f64)> + '_ {
        self.quadratic.iter().map(|(&(u, v), &c)| (u, v, c))
    }

    /// Objective value of a full assignment.
    pub fn energy(&self, assignment: &[bool]) -> f64 {
        debug_assert_eq!(assignment.len(), self.num_variables);
        let mut e = self.offset;
        for (var, &bias) in self.linear.iter().enumerate() {
            if assignment[var] {
                e += bias;
            }
        }
        for (&(u, v), &coeff) in &self.quadratic {
            if assignment[u] && assignment[v] {
                e += coeff;
            }
        }
        e
    }
}
