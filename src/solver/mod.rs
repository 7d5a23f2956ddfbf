//! Coupled physics solver seam.
//!
//! The driver only talks to [`FlowSolver`]. Implementations may keep caches
//! across calls (work buffers, assembled structure) but repeated calls with
//! equal inputs must return equal outputs.

pub mod ice_stream;

pub use ice_stream::{IceStreamSolver, SolverStats};

use crate::constants::{GRAVITY, ICE_DENSITY, WATER_DENSITY};
use crate::error::MisiResult;
use crate::mesh::Field;

pub trait FlowSolver {
    /// Identifier used in timing and log output.
    fn name(&self) -> &str;

    /// Velocity consistent with the current geometry. The value of
    /// `velocity` at the inflow node is the Dirichlet condition; the whole
    /// field is the initial guess of the nonlinear iteration.
    fn diagnostic_solve(
        &mut self,
        velocity: &Field,
        thickness: &Field,
        surface: &Field,
        fluidity: &Field,
        friction: &Field,
    ) -> MisiResult<Field>;

    /// Thickness after one mass-continuity step of length `dt` years, with
    /// `thickness_inflow` supplying the inflow boundary value.
    fn prognostic_solve(
        &mut self,
        dt: f64,
        thickness: &Field,
        accumulation: &Field,
        velocity: &Field,
        thickness_inflow: &Field,
    ) -> MisiResult<Field>;

    fn compute_surface(&self, thickness: &Field, bed: &Field) -> MisiResult<Field> {
        compute_surface(thickness, bed)
    }
}

/// Grounded surface `b + h`, or the hydrostatic flotation surface where the
/// column would float.
pub fn compute_surface_at(thickness: f64, bed: f64) -> f64 {
    (bed + thickness).max((1.0 - ICE_DENSITY / WATER_DENSITY) * thickness)
}

pub fn compute_surface(thickness: &Field, bed: &Field) -> MisiResult<Field> {
    thickness.ensure_len("thickness", bed.len())?;
    Ok(thickness.zip_map(bed, compute_surface_at))
}

/// Depth-integrated calving-front stress (MPa·m): ice overburden pushing
/// outward, less the ocean pressure on the submerged part of the front.
pub fn terminus_stress(thickness: f64, surface: f64) -> f64 {
    let draft = (surface - thickness).min(0.0);
    0.5 * ICE_DENSITY * GRAVITY * thickness * thickness - 0.5 * WATER_DENSITY * GRAVITY * draft * draft
}

/// Whether the column at a node rests on the bed.
pub fn is_grounded(thickness: f64, bed: f64) -> bool {
    bed + thickness >= (1.0 - ICE_DENSITY / WATER_DENSITY) * thickness
}
