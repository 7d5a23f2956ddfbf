pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod experiment;
pub mod fields;
pub mod friction;
pub mod math_utils;
pub mod mesh;
pub mod rheology;
pub mod sim;
pub mod sim_op;
pub mod solver;

pub use config::{ExperimentConfig, SolverConfig};
pub use diagnostics::{ExperimentResult, Snapshot};
pub use error::{MisiError, MisiResult};
pub use experiment::{run_experiment, Experiment};
