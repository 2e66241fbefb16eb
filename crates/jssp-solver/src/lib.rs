//! # jssp-solver
//!
//! Windowed QUBO decomposition solver for job-shop scheduling.
//!
//! This crate provides:
//! - A greedy constructor for the initial feasible schedule
//! - Window extraction with boundary-consistency constraints
//! - A one-hot QUBO encoder for window sub-problems
//! - A solver abstraction plus a reference simulated annealer
//! - The sliding-window decomposition driver
//!
//! ## Example
//!
//! ```rust
//! use jssp_core::Instance;
//! use jssp_solver::{optimize, solve_greedily, DriverConfig, SimulatedAnnealer};
//!
//! let instance = Instance::build(vec![
//!     vec![(0, 2), (1, 1), (0, 1)],
//!     vec![(1, 1), (0, 1), (2, 2)],
//!     vec![(2, 1), (2, 1), (1, 1)],
//! ]).unwrap();
//!
//! let initial = solve_greedily(&instance);
//! let config = DriverConfig { window_size: 5, passes: 2, ..DriverConfig::default() };
//! for improvement in optimize(&instance, initial, SimulatedAnnealer::default(), config) {
//!     println!("window {} -> makespan {}", improvement.window_start, improvement.makespan);
//! }
//! ```

mod anneal;
mod driver;
mod encode;
mod greedy;
mod qubo;
mod window;

pub use anneal::{Sample, SimulatedAnnealer, Solver, SolverError};
pub use driver::{optimize, Driver, DriverConfig, Improvement};
pub use encode::{DecodeError, Encoded, Encoder, EncodingError, LagrangeWeights, OneHotEncoder};
pub use greedy::{solve_greedily, solve_randomized};
pub use qubo::{QuboModel, VarId};
pub use window::{Window, WindowOp};
