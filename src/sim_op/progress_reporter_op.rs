use crate::sim::Simulation;
use crate::sim_op::{SimOp, SimOpHandle};
use crate::solver::is_grounded;

/// Progress Reporter Operator
///
/// Logs the margin state every `report_interval` steps: thickness range,
/// outflow thickness and speed, and how many nodes are still grounded.
#[derive(Debug, Clone)]
pub struct ProgressReporterOp {
    pub name: String,
    pub report_interval: usize,
    pub reports_written: usize,
}

impl ProgressReporterOp {
    pub fn new(report_interval: usize) -> Self {
        Self {
            name: "ProgressReporterOp".to_string(),
            report_interval: report_interval.max(1),
            reports_written: 0,
        }
    }

    pub fn handle(report_interval: usize) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(report_interval)))
    }

    fn grounded_nodes(sim: &Simulation) -> usize {
        sim.state
            .thickness
            .iter()
            .zip(sim.bed.iter())
            .filter(|(h, b)| is_grounded(**h, **b))
            .count()
    }

    fn report(&mut self, sim: &Simulation) {
        let state = &sim.state;
        log::info!(
            "{} step {:>5} ({:>7.1} yr): h {:>7.1}..{:>7.1} m, outflow h {:>7.1} m, u {:>8.1} m/yr, grounded {}/{}",
            sim.name,
            sim.current_step(),
            sim.time_years,
            state.thickness.min(),
            state.thickness.max(),
            state.thickness.last(),
            state.velocity.last(),
            Self::grounded_nodes(sim),
            sim.mesh.node_count()
        );
        self.reports_written += 1;
    }
}

impl SimOp for ProgressReporterOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_sim(&mut self, sim: &mut Simulation) {
        self.report(sim);
    }

    fn update_sim(&mut self, sim: &mut Simulation) {
        if sim.current_step() % self.report_interval == 0 {
            self.report(sim);
        }
    }
}
