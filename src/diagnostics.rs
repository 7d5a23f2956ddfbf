//! Profile snapshots and the steady-state vs perturbed comparison.

use crate::error::MisiResult;
use crate::sim::Simulation;
use crate::solver::is_grounded;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Immutable copy of the flowline profile at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub label: String,
    pub step: usize,
    pub time_years: f64,
    pub x: Vec<f64>,
    pub bed: Vec<f64>,
    pub surface: Vec<f64>,
    pub thickness: Vec<f64>,
    /// Base-of-ice elevation, `surface - thickness`.
    pub base: Vec<f64>,
    pub velocity: Vec<f64>,
}

impl Snapshot {
    pub fn capture(label: &str, sim: &Simulation) -> Snapshot {
        Snapshot {
            label: label.to_string(),
            step: sim.current_step(),
            time_years: sim.time_years,
            x: sim.mesh.nodes(),
            bed: sim.bed.as_slice().to_vec(),
            surface: sim.state.surface.as_slice().to_vec(),
            thickness: sim.state.thickness.as_slice().to_vec(),
            base: sim.state.base().into_values(),
            velocity: sim.state.velocity.as_slice().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn grounded_mask(&self) -> Vec<bool> {
        self.thickness
            .iter()
            .zip(self.bed.iter())
            .map(|(h, b)| is_grounded(*h, *b))
            .collect()
    }

    /// Index of the first floating node, if any.
    pub fn first_floating_index(&self) -> Option<usize> {
        self.grounded_mask().iter().position(|grounded| !grounded)
    }

    /// Position of the grounding line, taken as the first floating node.
    pub fn grounding_line_position(&self) -> Option<f64> {
        self.first_floating_index().map(|i| self.x[i])
    }

    pub fn ice_volume_per_width(&self) -> f64 {
        if self.x.len() < 2 {
            return 0.0;
        }
        self.x
            .windows(2)
            .zip(self.thickness.windows(2))
            .map(|(x, h)| 0.5 * (h[0] + h[1]) * (x[1] - x[0]))
            .sum()
    }
}

/// Outcome of the two-phase experiment.
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    pub initial: Snapshot,
    pub steady_state: Snapshot,
    pub perturbed: Snapshot,
    pub floor_node_activations: usize,
    pub floor_steps: usize,
}

impl ExperimentResult {
    /// Thinning of the steady state relative to the initial geometry.
    pub fn steady_thinning_at(&self, index: usize) -> f64 {
        self.initial.thickness[index] - self.steady_state.thickness[index]
    }

    /// Thinning of the perturbed state relative to the initial geometry.
    pub fn perturbed_thinning_at(&self, index: usize) -> f64 {
        self.initial.thickness[index] - self.perturbed.thickness[index]
    }

    /// Extra thinning the perturbation caused on top of the spin-up.
    pub fn perturbation_thinning_at(&self, index: usize) -> f64 {
        self.steady_state.thickness[index] - self.perturbed.thickness[index]
    }

    pub fn outflow_index(&self) -> usize {
        self.steady_state.len().saturating_sub(1)
    }

    pub fn log_summary(&self) {
        let out = self.outflow_index();
        for snapshot in [&self.initial, &self.steady_state, &self.perturbed] {
            log::info!(
                "{:<13} t={:>7.1} yr  outflow h {:>7.1} m  volume {:.4e} m²  grounding line {}",
                snapshot.label,
                snapshot.time_years,
                snapshot.thickness[out],
                snapshot.ice_volume_per_width(),
                snapshot
                    .grounding_line_position()
                    .map(|x| format!("{:.1} km", x / 1000.0))
                    .unwrap_or_else(|| "none".to_string())
            );
        }
        if self.floor_steps > 0 {
            log::info!(
                "thickness floor raised {} nodes over {} steps",
                self.floor_node_activations,
                self.floor_steps
            );
        }
    }

    /// One row per node: bed plus surface and base elevation of both states.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> MisiResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(
            out,
            "x,bed,steady_surface,steady_base,perturbed_surface,perturbed_base"
        )?;
        for i in 0..self.steady_state.len() {
            writeln!(
                out,
                "{},{},{},{},{},{}",
                self.steady_state.x[i],
                self.steady_state.bed[i],
                self.steady_state.surface[i],
                self.steady_state.base[i],
                self.perturbed.surface[i],
                self.perturbed.base[i]
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::compute_surface_at;
    use approx::assert_abs_diff_eq;

    fn snapshot(label: &str, thickness: Vec<f64>) -> Snapshot {
        let x = vec![0.0, 1000.0, 2000.0];
        let bed = vec![200.0, -100.0, -400.0];
        let surface: Vec<f64> = thickness
            .iter()
            .zip(bed.iter())
            .map(|(h, b)| compute_surface_at(*h, *b))
            .collect();
        let base = surface.iter().zip(thickness.iter()).map(|(s, h)| s - h).collect();
        Snapshot {
            label: label.to_string(),
            step: 0,
            time_years: 0.0,
            x,
            bed,
            surface,
            thickness,
            base,
            velocity: vec![20.0, 100.0, 300.0],
        }
    }

    #[test]
    fn grounding_line_is_first_floating_node() {
        let s = snapshot("steady", vec![650.0, 300.0, 100.0]);
        assert_eq!(s.grounded_mask(), vec![true, true, false]);
        assert_eq!(s.grounding_line_position(), Some(2000.0));

        let all_grounded = snapshot("thick", vec![650.0, 600.0, 500.0]);
        assert_eq!(all_grounded.first_floating_index(), None);
    }

    #[test]
    fn base_follows_bed_where_grounded() {
        let s = snapshot("steady", vec![650.0, 300.0, 100.0]);
        assert_abs_diff_eq!(s.base[0], s.bed[0], epsilon = 1e-9);
        assert_abs_diff_eq!(s.base[1], s.bed[1], epsilon = 1e-9);
        assert!(s.base[2] > s.bed[2]);
    }

    #[test]
    fn volume_is_trapezoidal() {
        let s = snapshot("steady", vec![100.0, 200.0, 300.0]);
        assert_abs_diff_eq!(s.ice_volume_per_width(), 400_000.0);
    }

    #[test]
    fn thinning_metrics_and_csv() {
        let result = ExperimentResult {
            initial: snapshot("initial", vec![650.0, 500.0, 450.0]),
            steady_state: snapshot("steady state", vec![650.0, 400.0, 120.0]),
            perturbed: snapshot("perturbed", vec![650.0, 350.0, 100.0]),
            floor_node_activations: 0,
            floor_steps: 0,
        };
        assert_eq!(result.outflow_index(), 2);
        assert_abs_diff_eq!(result.steady_thinning_at(2), 330.0);
        assert_abs_diff_eq!(result.perturbed_thinning_at(2), 350.0);
        assert_abs_diff_eq!(result.perturbation_thinning_at(1), 50.0);

        let path = std::env::temp_dir().join("misi_diagnostics_test.csv");
        result.write_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
        assert!(contents.starts_with("x,bed,steady_surface"));
        let _ = std::fs::remove_file(&path);
    }
}
