pub mod simulation;
pub mod state;

pub use simulation::{FloorStats, OpTiming, SimProps, Simulation};
pub use state::{GlacierState, StepReport, ThicknessFloor};
