use crate::sim::Simulation;
use crate::sim_op::{SimOp, SimOpHandle};

/// Floor Monitor Operator
///
/// Tracks runs of consecutive steps on which the thickness floor raised at
/// least one node. Occasional activation is expected when forcing drives the
/// margin thin; a long streak means the floor is reshaping the physics, so it
/// is reported as a warning once per streak. Activation totals live on
/// `Simulation::floor_stats`.
#[derive(Debug, Clone)]
pub struct FloorMonitorOp {
    pub name: String,
    pub warn_after: usize,
    pub current_streak: usize,
    pub longest_streak: usize,
    pub warnings: usize,
}

impl FloorMonitorOp {
    pub fn new(warn_after: usize) -> Self {
        Self {
            name: "FloorMonitorOp".to_string(),
            warn_after: warn_after.max(1),
            current_streak: 0,
            longest_streak: 0,
            warnings: 0,
        }
    }

    pub fn handle(warn_after: usize) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(warn_after)))
    }

    /// Record one step's activation count.
    pub fn record(&mut self, step: usize, activations: usize) {
        if activations == 0 {
            self.current_streak = 0;
            return;
        }

        self.current_streak += 1;
        self.longest_streak = self.longest_streak.max(self.current_streak);

        if self.current_streak == self.warn_after {
            self.warnings += 1;
            log::warn!(
                "thickness floor active for {} consecutive steps (through step {}); results near the margin depend on the floor",
                self.current_streak,
                step
            );
        }
    }
}

impl SimOp for FloorMonitorOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_sim(&mut self, sim: &mut Simulation) {
        if let Some(report) = &sim.last_report {
            self.record(report.step, report.floor_activations);
        }
    }

    fn after_sim(&mut self, sim: &mut Simulation) {
        let stats = &sim.floor_stats;
        if !sim.floor.is_enforced() && stats.steps_with_activation == 0 {
            return;
        }
        log::info!(
            "{}: floor raised {} nodes over {} steps (longest streak {})",
            sim.name,
            stats.node_activations,
            stats.steps_with_activation,
            self.longest_streak
        );
    }
}
