// Unit system: metres, years, megapascals. Densities carry the yr² / MPa
// scaling so that ρ·g·h comes out directly in MPa.

pub const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

pub const GRAVITY_M_S2: f64 = 9.81;
pub const ICE_DENSITY_KGM3: f64 = 917.0;
pub const WATER_DENSITY_KGM3: f64 = 1024.0;

/// Gravity in m/yr².
pub const GRAVITY: f64 = GRAVITY_M_S2 * SECONDS_PER_YEAR * SECONDS_PER_YEAR;
/// Ice density in MPa·yr²/m².
pub const ICE_DENSITY: f64 = ICE_DENSITY_KGM3 / (SECONDS_PER_YEAR * SECONDS_PER_YEAR) * 1.0e-6;
/// Sea water density in MPa·yr²/m².
pub const WATER_DENSITY: f64 = WATER_DENSITY_KGM3 / (SECONDS_PER_YEAR * SECONDS_PER_YEAR) * 1.0e-6;

pub const GLEN_FLOW_LAW: f64 = 3.0;
pub const WEERTMAN_SLIDING_LAW: f64 = 3.0;

// Rate factor (Cuffey & Paterson), cold and warm branches
pub const IDEAL_GAS_KJ_PER_MOL_K: f64 = 8.3144621e-3;
pub const TRANSITION_TEMPERATURE_K: f64 = 263.15;
pub const A0_COLD_PA3_S: f64 = 3.985e-13;
pub const A0_WARM_PA3_S: f64 = 1.916e3;
pub const Q_COLD_KJ_PER_MOL: f64 = 60.0;
pub const Q_WARM_KJ_PER_MOL: f64 = 139.0;
pub const PA3_TO_MPA3: f64 = 1.0e18;

// Reference experiment: 50 km flowline on a retrograde bed with a bump
pub const DEFAULT_LX_M: f64 = 50.0e3;
pub const DEFAULT_NX: usize = 50;
pub const DEFAULT_B_IN_M: f64 = 200.0;
pub const DEFAULT_B_OUT_M: f64 = -400.0;
pub const DEFAULT_DELTA_B_M: f64 = 150.0;
pub const DEFAULT_LAMBDA: f64 = 0.85;
pub const DEFAULT_ALPHA: f64 = 100.0;
pub const DEFAULT_S_IN_M: f64 = 850.0;
pub const DEFAULT_S_OUT_M: f64 = 50.0;
pub const DEFAULT_U_IN_M_PER_YR: f64 = 20.0;
pub const DEFAULT_U_OUT_M_PER_YR: f64 = 2400.0;
pub const DEFAULT_TEMPERATURE_K: f64 = 255.0;
pub const DEFAULT_C_0: f64 = 0.95;
pub const DEFAULT_DELTA_C: f64 = 0.05;
pub const DEFAULT_A_0_M_PER_YR: f64 = 1.2;
pub const DEFAULT_A_0_PERTURBED_M_PER_YR: f64 = 1.05;
pub const DEFAULT_DELTA_A_M_PER_YR: f64 = 2.7;
pub const DEFAULT_H_MIN_M: f64 = 1.0;
pub const DEFAULT_NUM_YEARS: usize = 250;
pub const DEFAULT_TIMESTEPS_PER_YEAR: usize = 2;

// Picard iteration defaults for the reference stress-balance solve
pub const DEFAULT_SOLVER_TOLERANCE: f64 = 1.0e-8;
pub const DEFAULT_SOLVER_MAX_ITERATIONS: usize = 500;
pub const DEFAULT_STRAIN_RATE_REGULARIZATION: f64 = 1.0e-5; // 1/yr
pub const DEFAULT_VELOCITY_REGULARIZATION: f64 = 1.0e-3; // m/yr

/// Consecutive floor-activated steps before the floor monitor warns.
pub const DEFAULT_FLOOR_WARN_STREAK: usize = 20;
