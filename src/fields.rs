//! Closed-form initial fields for the flowline experiment.

use crate::config::ExperimentConfig;
use crate::constants::{GRAVITY, ICE_DENSITY, WEERTMAN_SLIDING_LAW};
use crate::error::{MisiError, MisiResult};
use crate::math_utils::lerp;
use crate::mesh::{Field, IntervalMesh};
use crate::rheology::rate_factor;

/// Bed: linear ramp from `b_in` to `b_out` plus a gaussian bump of height
/// `delta_b` centred at `lambda·Lx`.
pub fn bed_elevation(config: &ExperimentConfig, x: f64) -> f64 {
    let r = x / config.lx;
    lerp(config.b_in, config.b_out, r) + config.delta_b * (-config.alpha * (r - config.lambda).powi(2)).exp()
}

pub fn initial_surface(config: &ExperimentConfig, x: f64) -> f64 {
    lerp(config.s_in, config.s_out, x / config.lx)
}

/// Quadratic ramp between the inflow and outflow speeds.
pub fn initial_velocity(config: &ExperimentConfig, x: f64) -> f64 {
    let r = x / config.lx;
    config.u_in + (config.u_out - config.u_in) * r * r
}

pub fn accumulation_rate(a_0: f64, delta_a: f64, lx: f64, x: f64) -> f64 {
    a_0 - delta_a * x / lx
}

/// Driving stress at the inflow boundary (MPa), from the mean surface slope.
pub fn inflow_driving_stress(config: &ExperimentConfig) -> f64 {
    let slope = (config.s_out - config.s_in) / config.lx;
    -ICE_DENSITY * GRAVITY * config.inflow_thickness() * slope
}

/// Nominal friction coefficient: balances the inflow driving stress at the
/// inflow speed, scaled by a ratio falling linearly from `c_0` to `c_0 - delta_c`.
pub fn friction_coefficient(config: &ExperimentConfig, x: f64) -> f64 {
    let tau_d = inflow_driving_stress(config);
    (config.c_0 - config.delta_c * x / config.lx) * tau_d
        / config.u_in.powf(1.0 / WEERTMAN_SLIDING_LAW)
}

/// Everything the driver needs at `n = 0`, before the first diagnostic solve.
#[derive(Debug, Clone)]
pub struct InitialFields {
    pub mesh: IntervalMesh,
    pub bed: Field,
    pub surface: Field,
    pub thickness: Field,
    pub velocity: Field,
    pub accumulation: Field,
    pub fluidity: Field,
    pub friction: Field,
}

impl InitialFields {
    pub fn new(config: &ExperimentConfig) -> MisiResult<InitialFields> {
        config.validate()?;
        let mesh = IntervalMesh::new(config.nx, config.lx)?;

        let bed = Field::interpolate(&mesh, |x| bed_elevation(config, x));
        let surface = Field::interpolate(&mesh, |x| initial_surface(config, x));
        let thickness = surface.zip_map(&bed, |s, b| s - b);
        if let Some(index) = thickness.iter().position(|h| *h <= 0.0) {
            return Err(MisiError::configuration(
                "s_in",
                format!(
                    "initial surface lies on or below the bed at x = {} m (thickness {})",
                    mesh.x(index),
                    thickness[index]
                ),
            ));
        }

        let velocity = Field::interpolate(&mesh, |x| initial_velocity(config, x));
        let accumulation = Field::interpolate(&mesh, |x| {
            accumulation_rate(config.a_0, config.delta_a, config.lx, x)
        });
        let friction = Field::interpolate(&mesh, |x| friction_coefficient(config, x));
        let fluidity = Field::constant(&mesh, rate_factor(config.temperature));

        Ok(InitialFields {
            mesh,
            bed,
            surface,
            thickness,
            velocity,
            accumulation,
            fluidity,
            friction,
        })
    }

    /// Accumulation profile with a new intercept and the given slope.
    pub fn accumulation_with_intercept(&self, a_0: f64, delta_a: f64) -> Field {
        let lx = self.mesh.lx;
        Field::interpolate(&self.mesh, |x| accumulation_rate(a_0, delta_a, lx, x))
    }
}
