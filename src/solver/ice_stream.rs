//! Finite-difference shallow-stream solver on the interval mesh.
//!
//! Diagnostic: the depth-integrated membrane stress balance
//!
//! ```text
//! ∂x(2·B·h·|∂x u|^(1/n - 1)·∂x u) - C·ϕ·|u|^(1/m - 1)·u - ρ_I·g·h·∂x s = 0
//! ```
//!
//! with velocity on the nodes and membrane flux on the cells. Each Picard
//! iteration freezes the viscosity and the sliding coefficient at the previous
//! iterate and solves the resulting symmetric tridiagonal system. The inflow
//! node is Dirichlet. The outflow node is an ice front: its half-cell control
//! volume is closed by the calving-front stress instead of a membrane flux.
//!
//! Prognostic: implicit first-order upwind finite volumes. The matrix is an
//! M-matrix for any `dt`, so thickness stays bounded without a step limit.

use crate::config::SolverConfig;
use crate::constants::{GLEN_FLOW_LAW, GRAVITY, ICE_DENSITY};
use crate::error::{MisiError, MisiResult};
use crate::friction::FrictionInputs;
use crate::math_utils::{max_abs, max_abs_diff, TridiagonalWorkspace};
use crate::mesh::{Field, IntervalMesh};
use crate::rheology::hardness;
use crate::solver::{terminus_stress, FlowSolver};

/// Counters accumulated across calls. They never feed back into results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStats {
    pub diagnostic_solves: usize,
    pub prognostic_solves: usize,
    pub total_iterations: usize,
    pub last_iterations: usize,
    pub max_iterations_seen: usize,
}

#[derive(Debug, Clone, Default)]
struct Workspace {
    lower: Vec<f64>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    rhs: Vec<f64>,
    surface_slope: Vec<f64>,
    membrane: Vec<f64>,
    iterate: Vec<f64>,
    next: Vec<f64>,
    tridiagonal: TridiagonalWorkspace,
}

impl Workspace {
    fn reset(&mut self, n: usize) {
        for buffer in [&mut self.lower, &mut self.diag, &mut self.upper, &mut self.rhs] {
            buffer.clear();
            buffer.resize(n, 0.0);
        }
    }
}

pub struct IceStreamSolver {
    mesh: IntervalMesh,
    config: SolverConfig,
    workspace: Workspace,
    stats: SolverStats,
}

impl IceStreamSolver {
    pub fn new(mesh: IntervalMesh, config: SolverConfig) -> IceStreamSolver {
        IceStreamSolver {
            mesh,
            config,
            workspace: Workspace::default(),
            stats: SolverStats::default(),
        }
    }

    pub fn mesh(&self) -> &IntervalMesh {
        &self.mesh
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    fn check_sizes(&self, fields: &[(&'static str, &Field)]) -> MisiResult<()> {
        let n = self.mesh.node_count();
        for (name, field) in fields {
            field.ensure_len(name, n)?;
        }
        Ok(())
    }

    /// Centred surface slope inside, one-sided at both ends.
    fn fill_surface_slope(&mut self, surface: &[f64]) {
        let n = surface.len();
        let dx = self.mesh.dx();
        let slope = &mut self.workspace.surface_slope;
        slope.clear();
        slope.extend((0..n).map(|i| {
            if i == 0 {
                (surface[1] - surface[0]) / dx
            } else if i == n - 1 {
                (surface[n - 1] - surface[n - 2]) / dx
            } else {
                (surface[i + 1] - surface[i - 1]) / (2.0 * dx)
            }
        }));
    }

    /// Cell-centred `2·B·h·ε_e^(1/n - 1)` for the current iterate.
    fn fill_membrane_coefficients(&mut self, thickness: &[f64], fluidity: &[f64]) {
        let dx = self.mesh.dx();
        let eps_reg = self.config.strain_rate_regularization;
        let exponent = (1.0 / GLEN_FLOW_LAW - 1.0) / 2.0;
        let u = &self.workspace.iterate;
        let membrane = &mut self.workspace.membrane;
        membrane.clear();
        membrane.extend((0..u.len() - 1).map(|c| {
            let strain_rate = (u[c + 1] - u[c]) / dx;
            let h = 0.5 * (thickness[c] + thickness[c + 1]);
            let b = hardness(0.5 * (fluidity[c] + fluidity[c + 1]));
            2.0 * b * h * (strain_rate * strain_rate + eps_reg * eps_reg).powf(exponent)
        }));
    }

    fn assemble_stress_balance(&mut self, thickness: &[f64], surface: &[f64], friction: &[f64]) {
        let n = thickness.len();
        let dx = self.mesh.dx();
        let u_reg = self.config.velocity_regularization;
        let ws = &mut self.workspace;
        ws.reset(n);

        ws.diag[0] = 1.0;
        ws.rhs[0] = ws.iterate[0];

        for i in 1..n {
            let width = self.mesh.control_width(i);
            let beta = FrictionInputs {
                velocity: ws.iterate[i],
                thickness: thickness[i],
                surface: surface[i],
                friction: friction[i],
            }
            .sliding_coefficient(u_reg);
            let left = ws.membrane[i - 1] / dx;
            let right = if i < n - 1 { ws.membrane[i] / dx } else { 0.0 };

            ws.lower[i] = left;
            ws.upper[i] = right;
            ws.diag[i] = -(left + right) - width * beta;
            ws.rhs[i] = width * ICE_DENSITY * GRAVITY * thickness[i] * ws.surface_slope[i];
        }

        // front stress is the membrane flux leaving the last control volume
        ws.rhs[n - 1] -= terminus_stress(thickness[n - 1], surface[n - 1]);
    }
}

impl FlowSolver for IceStreamSolver {
    fn name(&self) -> &str {
        "IceStreamSolver"
    }

    fn diagnostic_solve(
        &mut self,
        velocity: &Field,
        thickness: &Field,
        surface: &Field,
        fluidity: &Field,
        friction: &Field,
    ) -> MisiResult<Field> {
        self.check_sizes(&[
            ("velocity", velocity),
            ("thickness", thickness),
            ("surface", surface),
            ("fluidity", fluidity),
            ("friction", friction),
        ])?;
        let h = thickness.as_slice();
        let s = surface.as_slice();

        self.fill_surface_slope(s);
        self.workspace.iterate.clear();
        self.workspace.iterate.extend_from_slice(velocity.as_slice());

        let mut residual = f64::INFINITY;
        for iteration in 1..=self.config.max_iterations {
            self.fill_membrane_coefficients(h, fluidity.as_slice());
            self.assemble_stress_balance(h, s, friction.as_slice());

            let ws = &mut self.workspace;
            ws.tridiagonal
                .solve(&ws.lower, &ws.diag, &ws.upper, &ws.rhs, &mut ws.next)
                .ok_or(MisiError::NumericalInstability {
                    step: 0,
                    field: "velocity",
                    index: 0,
                })?;
            if let Some(index) = ws.next.iter().position(|v| !v.is_finite()) {
                return Err(MisiError::NumericalInstability {
                    step: 0,
                    field: "velocity",
                    index,
                });
            }

            let change = max_abs_diff(&ws.next, &ws.iterate);
            let scale = max_abs(&ws.next);
            residual = if scale > 0.0 { change / scale } else { change };
            std::mem::swap(&mut ws.iterate, &mut ws.next);
            log::trace!("picard iteration {}: relative update {:.3e}", iteration, residual);

            if residual <= self.config.tolerance {
                self.stats.diagnostic_solves += 1;
                self.stats.total_iterations += iteration;
                self.stats.last_iterations = iteration;
                self.stats.max_iterations_seen = self.stats.max_iterations_seen.max(iteration);
                return Ok(Field::from_values(ws.iterate.clone()));
            }
        }

        Err(MisiError::SolverNonConvergence {
            step: 0,
            iterations: self.config.max_iterations,
            residual,
        })
    }

    fn prognostic_solve(
        &mut self,
        dt: f64,
        thickness: &Field,
        accumulation: &Field,
        velocity: &Field,
        thickness_inflow: &Field,
    ) -> MisiResult<Field> {
        self.check_sizes(&[
            ("thickness", thickness),
            ("accumulation", accumulation),
            ("velocity", velocity),
            ("thickness_inflow", thickness_inflow),
        ])?;
        let n = thickness.len();
        let u = velocity.as_slice();
        let ws = &mut self.workspace;
        ws.reset(n);

        ws.diag[0] = 1.0;
        ws.rhs[0] = thickness_inflow[0];

        for i in 1..n {
            let width = self.mesh.control_width(i);
            let u_left = 0.5 * (u[i - 1] + u[i]);
            let u_right = if i < n - 1 { 0.5 * (u[i] + u[i + 1]) } else { u[i] };

            // upwind face fluxes: u⁺·h_upstream + u⁻·h_downstream
            ws.diag[i] = width / dt + u_right.max(0.0) - u_left.min(0.0);
            if i < n - 1 {
                ws.upper[i] = u_right.min(0.0);
            } else {
                ws.diag[i] += u_right.min(0.0);
            }
            ws.lower[i] = -u_left.max(0.0);
            ws.rhs[i] = width * (thickness[i] / dt + accumulation[i]);
        }

        ws.tridiagonal
            .solve(&ws.lower, &ws.diag, &ws.upper, &ws.rhs, &mut ws.next)
            .ok_or(MisiError::NumericalInstability {
                step: 0,
                field: "thickness",
                index: 0,
            })?;
        self.stats.prognostic_solves += 1;

        Ok(Field::from_values(ws.next.clone()))
    }
}
