// Operators run by the simulation loop after each completed driver step
pub mod csv_writer_op;
pub mod floor_monitor_op;
pub mod progress_reporter_op;

pub use csv_writer_op::CsvWriterOp;
pub use floor_monitor_op::FloorMonitorOp;
pub use progress_reporter_op::ProgressReporterOp;

use crate::sim::Simulation;

pub trait SimOp {
    /// The name of this operator (for identification and lookup)
    fn name(&self) -> &str;

    /// Called once at the beginning of each run
    fn init_sim(&mut self, _sim: &mut Simulation) {
        // Default implementation does nothing
    }

    /// Called after every completed step
    fn update_sim(&mut self, _sim: &mut Simulation) {
        // Default implementation does nothing
    }

    /// Called once at the end of each run
    fn after_sim(&mut self, _sim: &mut Simulation) {
        // Default implementation does nothing
    }
}

pub struct SimOpHandle {
    pub op: Box<dyn SimOp>,
}

impl SimOpHandle {
    /// Create a new SimOpHandle with the given operation
    pub fn new(op: Box<dyn SimOp>) -> Self {
        SimOpHandle { op }
    }
}
