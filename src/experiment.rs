//! Two-phase marine ice-sheet instability experiment.
//!
//! Phase 1 spins the flowline up under the baseline accumulation with no
//! thickness floor. Phase 2 lowers the accumulation intercept (slope
//! unchanged), enables the floor, and integrates twice as long from the
//! phase-1 end state. Steady and perturbed profiles are the result.

use crate::config::ExperimentConfig;
use crate::constants::DEFAULT_FLOOR_WARN_STREAK;
use crate::diagnostics::ExperimentResult;
use crate::error::MisiResult;
use crate::fields::InitialFields;
use crate::sim::{SimProps, Simulation, ThicknessFloor};
use crate::sim_op::{CsvWriterOp, FloorMonitorOp, ProgressReporterOp, SimOpHandle};
use crate::solver::{FlowSolver, IceStreamSolver};

pub struct Experiment {
    pub config: ExperimentConfig,
    pub fields: InitialFields,
    pub progress_interval: Option<usize>,
    pub csv_path: Option<(String, usize)>,
    pub floor_warn_streak: usize,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> MisiResult<Experiment> {
        let fields = InitialFields::new(&config)?;
        Ok(Experiment {
            config,
            fields,
            progress_interval: None,
            csv_path: None,
            floor_warn_streak: DEFAULT_FLOOR_WARN_STREAK,
        })
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Stream full profiles to a CSV file every `interval` steps.
    pub fn with_csv_output(mut self, path: &str, interval: usize) -> Self {
        self.csv_path = Some((path.to_string(), interval));
        self
    }

    pub fn with_floor_warn_streak(mut self, streak: usize) -> Self {
        self.floor_warn_streak = streak;
        self
    }

    fn ops(&self) -> Vec<SimOpHandle> {
        let mut ops = vec![FloorMonitorOp::handle(self.floor_warn_streak)];
        if let Some(interval) = self.progress_interval {
            ops.push(ProgressReporterOp::handle(interval));
        }
        if let Some((path, interval)) = &self.csv_path {
            ops.push(CsvWriterOp::handle(path.clone(), *interval));
        }
        ops
    }

    /// Run both phases with the finite-difference ice-stream solver.
    pub fn run(&self) -> MisiResult<ExperimentResult> {
        let solver = IceStreamSolver::new(self.fields.mesh.clone(), self.config.solver.clone());
        self.run_with_solver(Box::new(solver))
    }

    /// Run both phases against any solver. The first failure aborts the run.
    pub fn run_with_solver(&self, solver: Box<dyn FlowSolver>) -> MisiResult<ExperimentResult> {
        let config = &self.config;
        log::info!(
            "MISI experiment: Lx {} m, nx {}, dt {} yr, {} + {} steps, solver {}",
            config.lx,
            config.nx,
            config.dt(),
            config.phase_one_steps(),
            config.phase_two_steps(),
            solver.name()
        );

        let mut sim = Simulation::new(SimProps {
            name: "misi",
            fields: self.fields.clone(),
            dt: config.dt(),
            floor: ThicknessFloor::Unconstrained,
            ops: self.ops(),
            solver,
        })?;
        let initial = sim.snapshot("initial");

        log::info!("phase 1: spin-up under a_0 = {}, delta_a = {}", config.a_0, config.delta_a);
        sim.run(config.phase_one_steps())?;
        let steady_state = sim.snapshot("steady state");

        log::info!(
            "phase 2: a_0 {} -> {}, thickness floor {} m",
            config.a_0,
            config.a_0_perturbed,
            config.h_min
        );
        sim.set_accumulation(
            self.fields
                .accumulation_with_intercept(config.a_0_perturbed, config.delta_a),
        )?;
        sim.set_floor(ThicknessFloor::Enforced { h_min: config.h_min });
        sim.run(config.phase_two_steps())?;
        let perturbed = sim.snapshot("perturbed");

        let result = ExperimentResult {
            initial,
            steady_state,
            perturbed,
            floor_node_activations: sim.floor_stats.node_activations,
            floor_steps: sim.floor_stats.steps_with_activation,
        };
        result.log_summary();
        Ok(result)
    }
}

/// Validate the configuration and run the whole experiment.
pub fn run_experiment(config: &ExperimentConfig) -> MisiResult<ExperimentResult> {
    Experiment::new(config.clone())?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MisiError;
    use crate::mesh::Field;
    use more_asserts::assert_ge;

    fn short_config() -> ExperimentConfig {
        let mut config = ExperimentConfig::default();
        config.nx = 20;
        config.num_years = 5;
        config
    }

    #[test]
    fn phases_have_expected_lengths() {
        let config = short_config();
        let result = run_experiment(&config).unwrap();

        assert_eq!(result.initial.step, 0);
        assert_eq!(result.steady_state.step, 10);
        assert_eq!(result.perturbed.step, 30);
        assert_eq!(result.steady_state.len(), 21);
        assert_ge!(result.perturbed.time_years, 15.0 - 1e-9);
    }

    #[test]
    fn invalid_configuration_fails_before_any_solve() {
        let mut config = short_config();
        config.nx = 0;
        assert!(matches!(
            run_experiment(&config),
            Err(MisiError::Configuration { .. })
        ));
    }

    #[test]
    fn non_convergence_aborts_with_step() {
        // Converges on the initial solve, then fails on the third step.
        struct FailingSolver {
            inner: IceStreamSolver,
            diagnostic_calls: usize,
        }

        impl FlowSolver for FailingSolver {
            fn name(&self) -> &str {
                "FailingSolver"
            }

            fn diagnostic_solve(
                &mut self,
                velocity: &Field,
                thickness: &Field,
                surface: &Field,
                fluidity: &Field,
                friction: &Field,
            ) -> MisiResult<Field> {
                self.diagnostic_calls += 1;
                if self.diagnostic_calls == 4 {
                    return Err(MisiError::SolverNonConvergence {
                        step: 0,
                        iterations: 7,
                        residual: 0.5,
                    });
                }
                self.inner
                    .diagnostic_solve(velocity, thickness, surface, fluidity, friction)
            }

            fn prognostic_solve(
                &mut self,
                dt: f64,
                thickness: &Field,
                accumulation: &Field,
                velocity: &Field,
                thickness_inflow: &Field,
            ) -> MisiResult<Field> {
                self.inner
                    .prognostic_solve(dt, thickness, accumulation, velocity, thickness_inflow)
            }
        }

        let experiment = Experiment::new(short_config()).unwrap();
        let solver = FailingSolver {
            inner: IceStreamSolver::new(experiment.fields.mesh.clone(), experiment.config.solver.clone()),
            diagnostic_calls: 0,
        };

        match experiment.run_with_solver(Box::new(solver)) {
            Err(err) => {
                assert_eq!(err.kind(), "solver-non-convergence");
                assert_eq!(err.step(), Some(3));
            }
            Ok(_) => panic!("run should have aborted"),
        }
    }
}
