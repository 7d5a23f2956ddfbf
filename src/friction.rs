//! Weertman sliding with a friction ramp toward flotation.
//!
//! The nominal friction coefficient is scaled by the effective-pressure ratio
//! `ϕ = 1 - p_W / p_I`. As a column approaches flotation the water pressure
//! approaches the overburden and `ϕ → 0`, so the margin slides freely without
//! an explicit grounding-line switch.

use crate::constants::{GRAVITY, ICE_DENSITY, WATER_DENSITY, WEERTMAN_SLIDING_LAW};

/// Pointwise inputs to the sliding law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionInputs {
    pub velocity: f64,
    pub thickness: f64,
    pub surface: f64,
    pub friction: f64,
}

/// Subglacial water pressure (MPa); `thickness - surface` is the depth of the
/// ice base below sea level.
pub fn water_pressure(thickness: f64, surface: f64) -> f64 {
    WATER_DENSITY * GRAVITY * (thickness - surface).max(0.0)
}

pub fn ice_overburden_pressure(thickness: f64) -> f64 {
    ICE_DENSITY * GRAVITY * thickness
}

/// `1 - p_W / p_I`, clamped to `[0, 1]`.
///
/// Thickness must be positive; a column with no ice gets no friction.
pub fn effective_pressure_ratio(thickness: f64, surface: f64) -> f64 {
    if thickness <= 0.0 {
        return 0.0;
    }
    let ratio = 1.0 - water_pressure(thickness, surface) / ice_overburden_pressure(thickness);
    ratio.clamp(0.0, 1.0)
}

/// Sliding-law input `C·ϕ` handed to the stress-balance solve.
pub fn friction_stress(inputs: &FrictionInputs) -> f64 {
    inputs.friction * effective_pressure_ratio(inputs.thickness, inputs.surface)
}

/// Linearized sliding coefficient `β`, with basal drag `τ_b = β·u`:
/// `C_eff·(u² + u_reg²)^((1/m - 1)/2)`.
///
/// `velocity_regularization` keeps `β` finite where the ice is at rest.
pub fn sliding_coefficient(velocity: f64, effective_friction: f64, velocity_regularization: f64) -> f64 {
    let exponent = (1.0 / WEERTMAN_SLIDING_LAW - 1.0) / 2.0;
    effective_friction * (velocity * velocity + velocity_regularization * velocity_regularization).powf(exponent)
}

impl FrictionInputs {
    /// Sliding coefficient at this node's velocity, with the friction ramp applied.
    pub fn sliding_coefficient(&self, velocity_regularization: f64) -> f64 {
        sliding_coefficient(self.velocity, friction_stress(self), velocity_regularization)
    }

    /// Basal shear stress `β·u` (MPa).
    pub fn basal_shear_stress(&self, velocity_regularization: f64) -> f64 {
        self.sliding_coefficient(velocity_regularization) * self.velocity
    }
}
