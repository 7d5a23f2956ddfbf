//! Error taxonomy for the flowline simulation.
//!
//! Every variant is fatal to the run. Floor activation during the perturbed
//! phase is advisory and is surfaced by the floor monitor operator through the
//! logger instead.

use thiserror::Error;

pub type MisiResult<T> = Result<T, MisiError>;

#[derive(Error, Debug)]
pub enum MisiError {
    /// Invalid domain or parameter value, detected before any solve.
    #[error("invalid configuration: {parameter} {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },

    /// The nonlinear stress-balance solve ran out of iterations.
    #[error("diagnostic solve did not converge at step {step}: {iterations} iterations, relative update {residual:.3e}")]
    SolverNonConvergence {
        step: usize,
        iterations: usize,
        residual: f64,
    },

    /// A field became NaN or infinite.
    #[error("non-finite {field} at step {step}, node {index}")]
    NumericalInstability {
        step: usize,
        field: &'static str,
        index: usize,
    },

    /// Thickness reached zero or below without a floor to catch it.
    #[error("thickness {value:.3} m at node {index} on step {step} leaves the friction ratio undefined")]
    NonPositiveThickness {
        step: usize,
        index: usize,
        value: f64,
    },

    #[error("field {field} has {found} values, mesh has {expected} nodes")]
    FieldSizeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MisiError {
    pub fn configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        MisiError::Configuration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Step index the failure occurred on, when it arose inside the driver.
    pub fn step(&self) -> Option<usize> {
        match self {
            MisiError::SolverNonConvergence { step, .. }
            | MisiError::NumericalInstability { step, .. }
            | MisiError::NonPositiveThickness { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Short kind label for run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            MisiError::Configuration { .. } => "configuration",
            MisiError::SolverNonConvergence { .. } => "solver-non-convergence",
            MisiError::NumericalInstability { .. } => "numerical-instability",
            MisiError::NonPositiveThickness { .. } => "non-positive-thickness",
            MisiError::FieldSizeMismatch { .. } => "field-size-mismatch",
            MisiError::Io(_) => "io",
            MisiError::Json(_) => "json",
        }
    }

    /// Re-tag a solver failure with the driver step it happened on.
    pub(crate) fn at_step(self, at: usize) -> Self {
        match self {
            MisiError::SolverNonConvergence {
                iterations,
                residual,
                ..
            } => MisiError::SolverNonConvergence {
                step: at,
                iterations,
                residual,
            },
            MisiError::NumericalInstability { field, index, .. } => {
                MisiError::NumericalInstability {
                    step: at,
                    field,
                    index,
                }
            }
            MisiError::NonPositiveThickness { index, value, .. } => {
                MisiError::NonPositiveThickness {
                    step: at,
                    index,
                    value,
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_retagged() {
        let err = MisiError::SolverNonConvergence {
            step: 0,
            iterations: 500,
            residual: 1e-3,
        }
        .at_step(42);

        assert_eq!(err.step(), Some(42));
        assert_eq!(err.kind(), "solver-non-convergence");
        assert!(err.to_string().contains("step 42"));
    }

    #[test]
    fn configuration_has_no_step() {
        let err = MisiError::configuration("nx", "must be at least 1");
        assert_eq!(err.step(), None);
        assert_eq!(err.to_string(), "invalid configuration: nx must be at least 1");
        assert_eq!(err.at_step(3).step(), None);
    }
}
