//! Temperature dependence of the Glen flow law.

use crate::constants::{
    A0_COLD_PA3_S, A0_WARM_PA3_S, GLEN_FLOW_LAW, IDEAL_GAS_KJ_PER_MOL_K, PA3_TO_MPA3,
    Q_COLD_KJ_PER_MOL, Q_WARM_KJ_PER_MOL, SECONDS_PER_YEAR, TRANSITION_TEMPERATURE_K,
};

/// Rate factor `A(T)` in MPa⁻³·yr⁻¹ from an Arrhenius relation.
///
/// Below 263.15 K the cold activation energy applies, above it the warm one.
pub fn rate_factor(temperature_k: f64) -> f64 {
    let (a0, q) = if temperature_k < TRANSITION_TEMPERATURE_K {
        (A0_COLD_PA3_S, Q_COLD_KJ_PER_MOL)
    } else {
        (A0_WARM_PA3_S, Q_WARM_KJ_PER_MOL)
    };
    let a0_mpa_yr = a0 * SECONDS_PER_YEAR * PA3_TO_MPA3;

    a0_mpa_yr * (-q / (IDEAL_GAS_KJ_PER_MOL_K * temperature_k)).exp()
}

/// Ice hardness `B = A^(-1/n)` in MPa·yr^(1/n).
pub fn hardness(fluidity: f64) -> f64 {
    fluidity.powf(-1.0 / GLEN_FLOW_LAW)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_deviation;
    use approx::assert_relative_eq;
    use more_asserts::assert_gt;

    #[test]
    fn cold_ice_rate_factor() {
        // MPa⁻³·yr⁻¹
        assert_deviation!(rate_factor(255.0), 6.4457, 0.1);
    }

    #[test]
    fn warmer_ice_flows_faster() {
        assert_gt!(rate_factor(260.0), rate_factor(255.0));
        assert_gt!(rate_factor(270.0), rate_factor(265.0));
    }

    #[test]
    fn hardness_inverts_fluidity() {
        let b = hardness(8.0);
        assert_relative_eq!(b, 0.5, max_relative = 1e-12);
        assert_deviation!(hardness(rate_factor(255.0)), 0.53733, 0.1, "hardness at 255 K");
    }
}
