//! Typed parameter record for the two-phase MISI experiment.

use crate::constants::*;
use crate::error::{MisiError, MisiResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

static DEFAULT_CONFIG: Lazy<ExperimentConfig> = Lazy::new(|| ExperimentConfig {
    lx: DEFAULT_LX_M,
    nx: DEFAULT_NX,
    b_in: DEFAULT_B_IN_M,
    b_out: DEFAULT_B_OUT_M,
    delta_b: DEFAULT_DELTA_B_M,
    lambda: DEFAULT_LAMBDA,
    alpha: DEFAULT_ALPHA,
    s_in: DEFAULT_S_IN_M,
    s_out: DEFAULT_S_OUT_M,
    u_in: DEFAULT_U_IN_M_PER_YR,
    u_out: DEFAULT_U_OUT_M_PER_YR,
    temperature: DEFAULT_TEMPERATURE_K,
    c_0: DEFAULT_C_0,
    delta_c: DEFAULT_DELTA_C,
    a_0: DEFAULT_A_0_M_PER_YR,
    a_0_perturbed: DEFAULT_A_0_PERTURBED_M_PER_YR,
    delta_a: DEFAULT_DELTA_A_M_PER_YR,
    h_min: DEFAULT_H_MIN_M,
    num_years: DEFAULT_NUM_YEARS,
    timesteps_per_year: DEFAULT_TIMESTEPS_PER_YEAR,
    solver: SolverConfig::default(),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative max-norm velocity update at which Picard iteration stops.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Strain rate added in quadrature so the viscosity stays finite (1/yr).
    pub strain_rate_regularization: f64,
    /// Speed added in quadrature so the sliding law stays finite (m/yr).
    pub velocity_regularization: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SOLVER_TOLERANCE,
            max_iterations: DEFAULT_SOLVER_MAX_ITERATIONS,
            strain_rate_regularization: DEFAULT_STRAIN_RATE_REGULARIZATION,
            velocity_regularization: DEFAULT_VELOCITY_REGULARIZATION,
        }
    }
}

/// All experiment parameters, in metres, years and Kelvin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub lx: f64,
    pub nx: usize,

    // bed: linear ramp plus a gaussian bump centred at lambda·Lx
    pub b_in: f64,
    pub b_out: f64,
    pub delta_b: f64,
    pub lambda: f64,
    pub alpha: f64,

    pub s_in: f64,
    pub s_out: f64,
    pub u_in: f64,
    pub u_out: f64,
    pub temperature: f64,

    // friction ratio endpoints
    pub c_0: f64,
    pub delta_c: f64,

    // accumulation intercept (spin-up and perturbed) and slope
    pub a_0: f64,
    pub a_0_perturbed: f64,
    pub delta_a: f64,

    pub h_min: f64,
    pub num_years: usize,
    pub timesteps_per_year: usize,

    pub solver: SolverConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl ExperimentConfig {
    pub fn from_json_str(json: &str) -> MisiResult<ExperimentConfig> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MisiResult<ExperimentConfig> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> MisiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.timesteps_per_year as f64
    }

    pub fn phase_one_steps(&self) -> usize {
        self.num_years * self.timesteps_per_year
    }

    pub fn phase_two_steps(&self) -> usize {
        2 * self.phase_one_steps()
    }

    pub fn inflow_thickness(&self) -> f64 {
        self.s_in - self.b_in
    }

    pub fn validate(&self) -> MisiResult<()> {
        let finite = [
            ("lx", self.lx),
            ("b_in", self.b_in),
            ("b_out", self.b_out),
            ("delta_b", self.delta_b),
            ("lambda", self.lambda),
            ("alpha", self.alpha),
            ("s_in", self.s_in),
            ("s_out", self.s_out),
            ("u_in", self.u_in),
            ("u_out", self.u_out),
            ("temperature", self.temperature),
            ("c_0", self.c_0),
            ("delta_c", self.delta_c),
            ("a_0", self.a_0),
            ("a_0_perturbed", self.a_0_perturbed),
            ("delta_a", self.delta_a),
            ("h_min", self.h_min),
        ];
        for (parameter, value) in finite {
            if !value.is_finite() {
                return Err(MisiError::configuration(parameter, format!("must be finite, got {}", value)));
            }
        }

        if self.lx <= 0.0 {
            return Err(MisiError::configuration("lx", format!("must be positive, got {}", self.lx)));
        }
        if self.nx < 1 {
            return Err(MisiError::configuration("nx", "must be at least 1"));
        }
        if self.inflow_thickness() <= 0.0 {
            return Err(MisiError::configuration(
                "s_in",
                format!(
                    "must lie above b_in; inflow thickness is {}",
                    self.inflow_thickness()
                ),
            ));
        }
        if self.u_in <= 0.0 {
            return Err(MisiError::configuration("u_in", "must be positive"));
        }
        if self.temperature <= 0.0 {
            return Err(MisiError::configuration("temperature", "must be positive Kelvin"));
        }
        if self.h_min <= 0.0 {
            return Err(MisiError::configuration("h_min", "must be positive"));
        }
        if self.timesteps_per_year < 1 {
            return Err(MisiError::configuration("timesteps_per_year", "must be at least 1"));
        }
        if !(self.solver.tolerance > 0.0) {
            return Err(MisiError::configuration("solver.tolerance", "must be positive"));
        }
        if self.solver.max_iterations == 0 {
            return Err(MisiError::configuration("solver.max_iterations", "must be at least 1"));
        }
        if !(self.solver.strain_rate_regularization > 0.0)
            || !(self.solver.velocity_regularization > 0.0)
        {
            return Err(MisiError::configuration("solver", "regularizations must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_experiment() {
        let config = ExperimentConfig::default();
        assert_eq!(config.lx, 50.0e3);
        assert_eq!(config.nx, 50);
        assert_eq!(config.phase_one_steps(), 500);
        assert_eq!(config.phase_two_steps(), 1000);
        assert_eq!(config.dt(), 0.5);
        assert_eq!(config.inflow_thickness(), 650.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let config = ExperimentConfig::from_json_str(
            r#"{"nx": 20, "num_years": 10, "solver": {"max_iterations": 50}}"#,
        )
        .unwrap();

        assert_eq!(config.nx, 20);
        assert_eq!(config.num_years, 10);
        assert_eq!(config.solver.max_iterations, 50);
        assert_eq!(config.solver.tolerance, DEFAULT_SOLVER_TOLERANCE);
        assert_eq!(config.a_0, 1.2);
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let mut config = ExperimentConfig::default();
        config.a_0_perturbed = 0.9;
        let json = config.to_json().unwrap();
        assert_eq!(ExperimentConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn rejects_invalid_domain() {
        let mut config = ExperimentConfig::default();
        config.lx = -1.0;
        assert!(matches!(
            config.validate(),
            Err(MisiError::Configuration { parameter: "lx", .. })
        ));

        let mut config = ExperimentConfig::default();
        config.nx = 0;
        assert!(matches!(
            config.validate(),
            Err(MisiError::Configuration { parameter: "nx", .. })
        ));
    }

    #[test]
    fn rejects_non_positive_inflow_thickness() {
        let mut config = ExperimentConfig::default();
        config.s_in = config.b_in;
        assert!(matches!(
            config.validate(),
            Err(MisiError::Configuration { parameter: "s_in", .. })
        ));
    }

    #[test]
    fn rejects_non_finite_and_bad_solver_settings() {
        let mut config = ExperimentConfig::default();
        config.alpha = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.solver.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.timesteps_per_year = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            ExperimentConfig::from_json_str(r#"{"nx": "#),
            Err(MisiError::Json(_))
        ));
        assert!(matches!(
            ExperimentConfig::from_json_file("/path/that/does/not/exist.json"),
            Err(MisiError::Io(_))
        ));
    }
}
