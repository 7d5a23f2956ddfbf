use crate::sim::Simulation;
use crate::sim_op::{SimOp, SimOpHandle};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

/// CSV Writer Operator
///
/// Appends the full flowline profile every `interval` steps, one row per
/// node, for external plotting:
///
/// `step,time_years,x,bed,surface,thickness,base,velocity`
pub struct CsvWriterOp {
    pub file_path: String,
    pub interval: usize,
    header_written: bool,
    pub rows_written: usize,
}

impl CsvWriterOp {
    pub fn new(file_path: String, interval: usize) -> Self {
        Self {
            file_path,
            interval: interval.max(1),
            header_written: false,
            rows_written: 0,
        }
    }

    pub fn handle(file_path: String, interval: usize) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(file_path, interval)))
    }

    fn write_header(&mut self) -> Result<(), std::io::Error> {
        if self.header_written {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.file_path)?;

        writeln!(file, "step,time_years,x,bed,surface,thickness,base,velocity")?;
        self.header_written = true;
        Ok(())
    }

    fn write_profile(&mut self, sim: &Simulation) -> Result<(), std::io::Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        let mut out = BufWriter::new(file);

        let state = &sim.state;
        for i in 0..sim.mesh.node_count() {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                sim.current_step(),
                sim.time_years,
                sim.mesh.x(i),
                sim.bed[i],
                state.surface[i],
                state.thickness[i],
                state.surface[i] - state.thickness[i],
                state.velocity[i]
            )?;
        }
        out.flush()?;
        self.rows_written += sim.mesh.node_count();
        Ok(())
    }
}

impl SimOp for CsvWriterOp {
    fn name(&self) -> &str {
        "CsvWriterOp"
    }

    fn init_sim(&mut self, sim: &mut Simulation) {
        if self.header_written {
            return;
        }
        if let Err(e) = self.write_header() {
            log::warn!("failed to write CSV header to {}: {}", self.file_path, e);
            return;
        }
        if let Err(e) = self.write_profile(sim) {
            log::warn!("failed to write CSV profile to {}: {}", self.file_path, e);
        }
    }

    fn update_sim(&mut self, sim: &mut Simulation) {
        if sim.current_step() % self.interval != 0 {
            return;
        }
        if let Err(e) = self.write_profile(sim) {
            log::warn!("failed to write CSV profile to {}: {}", self.file_path, e);
        }
    }

    fn after_sim(&mut self, _sim: &mut Simulation) {
        log::debug!("{}: {} rows written", self.file_path, self.rows_written);
    }
}
