use crate::diagnostics::Snapshot;
use crate::error::MisiResult;
use crate::fields::InitialFields;
use crate::mesh::{Field, IntervalMesh};
use crate::sim::state::{ensure_finite, ensure_positive_thickness, GlacierState, StepReport, ThicknessFloor};
use crate::sim_op::{SimOp, SimOpHandle};
use crate::solver::FlowSolver;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct OpTiming {
    pub op_name: String,
    pub init_time: Duration,
    pub total_update_time: Duration,
    pub update_call_count: u32,
    pub after_time: Duration,
}

impl OpTiming {
    pub fn new(op_name: String) -> Self {
        Self {
            op_name,
            init_time: Duration::ZERO,
            total_update_time: Duration::ZERO,
            update_call_count: 0,
            after_time: Duration::ZERO,
        }
    }

    pub fn avg_update_time(&self) -> Duration {
        if self.update_call_count > 0 {
            self.total_update_time / self.update_call_count
        } else {
            Duration::ZERO
        }
    }

    pub fn total_time(&self) -> Duration {
        self.init_time + self.total_update_time + self.after_time
    }
}

/// Running totals of floor activity across every step taken so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorStats {
    pub node_activations: usize,
    pub steps_with_activation: usize,
}

/// Time-stepping driver: owns the evolving geometry and velocity and
/// alternates prognostic and diagnostic solves.
pub struct Simulation {
    pub name: String,
    pub mesh: IntervalMesh,
    pub bed: Field,
    pub fluidity: Field,
    pub friction: Field,
    pub accumulation: Field,
    pub thickness_inflow: Field,
    pub state: GlacierState,
    pub floor: ThicknessFloor,
    pub dt: f64,
    pub step: usize,
    pub time_years: f64,
    pub last_report: Option<StepReport>,
    pub floor_stats: FloorStats,
    pub ops: Vec<Box<dyn SimOp>>,
    pub op_timings: Vec<OpTiming>,
    solver: Box<dyn FlowSolver>,
}

pub struct SimProps {
    pub name: &'static str,
    pub fields: InitialFields,
    pub dt: f64,
    pub floor: ThicknessFloor,
    pub ops: Vec<SimOpHandle>,
    pub solver: Box<dyn FlowSolver>,
}

impl Simulation {
    /// Builds the `n = 0` state: initial geometry plus one diagnostic solve so
    /// the velocity is consistent with it.
    pub fn new(props: SimProps) -> MisiResult<Simulation> {
        let fields = props.fields;
        let mut solver = props.solver;

        let velocity = solver
            .diagnostic_solve(
                &fields.velocity,
                &fields.thickness,
                &fields.surface,
                &fields.fluidity,
                &fields.friction,
            )
            .map_err(|e| e.at_step(0))?;
        ensure_finite(&velocity, "velocity", 0)?;
        log::debug!(
            "{}: initial velocity {:.1} .. {:.1} m/yr",
            props.name,
            velocity.first(),
            velocity.last()
        );

        let ops: Vec<Box<dyn SimOp>> = props.ops.into_iter().map(|handle| handle.op).collect();
        let op_timings = ops.iter().map(|op| OpTiming::new(op.name().to_string())).collect();

        Ok(Simulation {
            name: props.name.to_string(),
            mesh: fields.mesh,
            bed: fields.bed,
            fluidity: fields.fluidity,
            friction: fields.friction,
            accumulation: fields.accumulation,
            thickness_inflow: fields.thickness.clone(),
            state: GlacierState {
                thickness: fields.thickness,
                surface: fields.surface,
                velocity,
            },
            floor: props.floor,
            dt: props.dt,
            step: 0,
            time_years: 0.0,
            last_report: None,
            floor_stats: FloorStats::default(),
            ops,
            op_timings,
            solver,
        })
    }

    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn solver(&self) -> &dyn FlowSolver {
        self.solver.as_ref()
    }

    /// Replace the accumulation profile (the phase-transition forcing change).
    pub fn set_accumulation(&mut self, accumulation: Field) -> MisiResult<()> {
        accumulation.ensure_len("accumulation", self.mesh.node_count())?;
        self.accumulation = accumulation;
        Ok(())
    }

    pub fn set_floor(&mut self, floor: ThicknessFloor) {
        self.floor = floor;
    }

    pub fn snapshot(&self, label: &str) -> Snapshot {
        Snapshot::capture(label, self)
    }

    /// One driver step without running operators.
    ///
    /// State is only replaced once every solve has succeeded, so a failed
    /// step leaves the previous state intact.
    pub fn advance(&mut self) -> MisiResult<StepReport> {
        let step = self.step + 1;

        let thickness = self
            .solver
            .prognostic_solve(
                self.dt,
                &self.state.thickness,
                &self.accumulation,
                &self.state.velocity,
                &self.thickness_inflow,
            )
            .map_err(|e| e.at_step(step))?;
        ensure_finite(&thickness, "thickness", step)?;

        let (thickness, floor_activations) = self.floor.apply(thickness);
        ensure_positive_thickness(&thickness, step)?;

        let surface = self
            .solver
            .compute_surface(&thickness, &self.bed)
            .map_err(|e| e.at_step(step))?;
        ensure_finite(&surface, "surface", step)?;

        let velocity = self
            .solver
            .diagnostic_solve(
                &self.state.velocity,
                &thickness,
                &surface,
                &self.fluidity,
                &self.friction,
            )
            .map_err(|e| e.at_step(step))?;
        ensure_finite(&velocity, "velocity", step)?;

        let report = StepReport {
            step,
            time_years: self.time_years + self.dt,
            floor_activations,
            min_thickness: thickness.min(),
            max_velocity: velocity.max(),
        };
        log::debug!(
            "step {}: h_min {:.2} m, u_max {:.1} m/yr, floor {}",
            step,
            report.min_thickness,
            report.max_velocity,
            floor_activations
        );

        self.state = GlacierState {
            thickness,
            surface,
            velocity,
        };
        self.step = step;
        self.time_years = report.time_years;
        if floor_activations > 0 {
            self.floor_stats.node_activations += floor_activations;
            self.floor_stats.steps_with_activation += 1;
        }
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Advance `steps` times, running the operators around the loop.
    ///
    /// If a step fails, `after_sim` and the timing report still run for the
    /// steps that completed before the error is returned.
    pub fn run(&mut self, steps: usize) -> MisiResult<()> {
        let start = self.step;
        self.simulate_init();
        let outcome = self.run_steps(steps);
        if let Err(e) = &outcome {
            log::error!("{}: run stopped after {} of {} steps: {}", self.name, self.step - start, steps, e);
        }
        self.simulate_end();
        self.log_timing_report(self.step - start);
        outcome
    }

    fn run_steps(&mut self, steps: usize) -> MisiResult<()> {
        for _ in 0..steps {
            self.advance()?;
            self.simulate_step();
        }
        Ok(())
    }

    /// Run a single step followed by the given operators only.
    pub fn step_with_ops(&mut self, ops: &mut [&mut dyn SimOp]) -> MisiResult<StepReport> {
        let report = self.advance()?;
        for op in ops {
            op.update_sim(self);
        }
        Ok(report)
    }

    fn simulate_init(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.init_sim(self);
            self.op_timings[i].init_time += start.elapsed();
        }
        self.ops = ops;
    }

    fn simulate_end(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.after_sim(self);
            self.op_timings[i].after_time += start.elapsed();
        }
        self.ops = ops;
    }

    fn simulate_step(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.update_sim(self);
            self.op_timings[i].total_update_time += start.elapsed();
            self.op_timings[i].update_call_count += 1;
        }
        self.ops = ops;
    }

    pub fn log_timing_report(&self, steps: usize) {
        if self.op_timings.is_empty() {
            return;
        }
        let total_time: Duration = self.op_timings.iter().map(|t| t.total_time()).sum();

        log::info!("{}: operator timing over {} steps", self.name, steps);
        for timing in &self.op_timings {
            let share = if total_time.as_nanos() > 0 {
                timing.total_time().as_nanos() as f64 / total_time.as_nanos() as f64 * 100.0
            } else {
                0.0
            };
            log::info!(
                "  {:<22} | total {:>8.2}ms | avg/step {:>8.3}ms | init {:>6.2}ms | after {:>6.2}ms | share {:>5.1}%",
                timing.op_name,
                timing.total_time().as_secs_f64() * 1e3,
                timing.avg_update_time().as_secs_f64() * 1e3,
                timing.init_time.as_secs_f64() * 1e3,
                timing.after_time.as_secs_f64() * 1e3,
                share
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::error::MisiError;
    use crate::solver::IceStreamSolver;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn small_simulation(ops: Vec<SimOpHandle>) -> Simulation {
        let mut config = ExperimentConfig::default();
        config.nx = 20;
        let fields = InitialFields::new(&config).unwrap();
        let solver = IceStreamSolver::new(fields.mesh.clone(), config.solver.clone());
        Simulation::new(SimProps {
            name: "driver_test",
            fields,
            dt: config.dt(),
            floor: ThicknessFloor::Unconstrained,
            ops,
            solver: Box::new(solver),
        })
        .unwrap()
    }

    #[test]
    fn creation_runs_initial_diagnostic_solve() {
        let sim = small_simulation(vec![]);
        assert_eq!(sim.current_step(), 0);
        assert_abs_diff_eq!(sim.state.velocity[0], 20.0);
        // initial guess was a 2400 m/yr ramp; the balanced velocity differs
        assert!((sim.state.velocity.last() - 2400.0).abs() > 1.0);
    }

    #[test]
    fn advance_keeps_surface_consistent() {
        let mut sim = small_simulation(vec![]);
        for _ in 0..5 {
            let report = sim.advance().unwrap();
            assert_eq!(report.floor_activations, 0);
        }
        assert_eq!(sim.step, 5);
        assert_abs_diff_eq!(sim.time_years, 2.5);
        for i in 0..sim.mesh.node_count() {
            let expected = crate::solver::compute_surface_at(sim.state.thickness[i], sim.bed[i]);
            assert_abs_diff_eq!(sim.state.surface[i], expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn inflow_thickness_is_held() {
        let mut sim = small_simulation(vec![]);
        let h0 = sim.state.thickness[0];
        sim.run(4).unwrap();
        assert_abs_diff_eq!(sim.state.thickness[0], h0);
    }

    #[test]
    fn accumulation_size_is_checked() {
        let mut sim = small_simulation(vec![]);
        let result = sim.set_accumulation(Field::from_values(vec![1.0; 3]));
        assert!(matches!(result, Err(MisiError::FieldSizeMismatch { .. })));
    }

    #[test]
    fn ops_are_called_each_step() {
        struct CountingOp {
            init: usize,
            updates: usize,
            after: usize,
        }

        impl SimOp for CountingOp {
            fn name(&self) -> &str {
                "CountingOp"
            }
            fn init_sim(&mut self, _sim: &mut Simulation) {
                self.init += 1;
            }
            fn update_sim(&mut self, sim: &mut Simulation) {
                self.updates += 1;
                assert_eq!(sim.current_step(), self.updates);
            }
            fn after_sim(&mut self, _sim: &mut Simulation) {
                self.after += 1;
            }
        }

        let mut op = CountingOp { init: 0, updates: 0, after: 0 };
        let mut sim = small_simulation(vec![]);
        sim.step_with_ops(&mut [&mut op]).unwrap();
        sim.step_with_ops(&mut [&mut op]).unwrap();
        assert_eq!(op.updates, 2);
        assert_eq!(op.init, 0);

        let mut sim = small_simulation(vec![SimOpHandle::new(Box::new(CountingOp {
            init: 0,
            updates: 0,
            after: 0,
        }))]);
        sim.run(3).unwrap();
        assert_eq!(sim.op_timings[0].update_call_count, 3);
        assert_eq!(sim.op_timings[0].op_name, "CountingOp");
    }

    #[test]
    fn failed_run_still_closes_ops() {
        // reference solver whose third prognostic solve fails
        struct FailsOnThirdStep {
            inner: IceStreamSolver,
            prognostic_calls: usize,
        }

        impl FlowSolver for FailsOnThirdStep {
            fn name(&self) -> &str {
                "FailsOnThirdStep"
            }

            fn diagnostic_solve(
                &mut self,
                velocity: &Field,
                thickness: &Field,
                surface: &Field,
                fluidity: &Field,
                friction: &Field,
            ) -> MisiResult<Field> {
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
                self.prognostic_calls += 1;
                if self.prognostic_calls == 3 {
                    return Err(MisiError::NumericalInstability {
                        step: 0,
                        field: "thickness",
                        index: 4,
                    });
                }
                self.inner
                    .prognostic_solve(dt, thickness, accumulation, velocity, thickness_inflow)
            }
        }

        struct AfterCounter {
            after_calls: Rc<Cell<usize>>,
        }

        impl SimOp for AfterCounter {
            fn name(&self) -> &str {
                "AfterCounter"
            }
            fn after_sim(&mut self, _sim: &mut Simulation) {
                self.after_calls.set(self.after_calls.get() + 1);
            }
        }

        let mut config = ExperimentConfig::default();
        config.nx = 20;
        let fields = InitialFields::new(&config).unwrap();
        let after_calls = Rc::new(Cell::new(0));
        let mut sim = Simulation::new(SimProps {
            name: "failing_run",
            fields,
            dt: config.dt(),
            floor: ThicknessFloor::Unconstrained,
            ops: vec![SimOpHandle::new(Box::new(AfterCounter {
                after_calls: Rc::clone(&after_calls),
            }))],
            solver: Box::new(FailsOnThirdStep {
                inner: IceStreamSolver::new(
                    IntervalMesh::new(config.nx, config.lx).unwrap(),
                    config.solver.clone(),
                ),
                prognostic_calls: 0,
            }),
        })
        .unwrap();

        let err = sim.run(5).unwrap_err();

        assert_eq!(err.step(), Some(3));
        assert_eq!(sim.current_step(), 2);
        assert_eq!(after_calls.get(), 1);
        assert_eq!(sim.op_timings[0].update_call_count, 2);
    }
}
