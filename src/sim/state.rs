use crate::error::{MisiError, MisiResult};
use crate::mesh::Field;

/// The mutable triple the driver threads from step to step.
#[derive(Debug, Clone, PartialEq)]
pub struct GlacierState {
    pub thickness: Field,
    pub surface: Field,
    pub velocity: Field,
}

impl GlacierState {
    /// Base-of-ice elevation `s - h`.
    pub fn base(&self) -> Field {
        self.surface.zip_map(&self.thickness, |s, h| s - h)
    }
}

/// Thickness clamp applied after each prognostic solve.
///
/// The floor is a numerical safety valve, not a physical law: it keeps the
/// friction ratio and the stress balance defined near a retreating margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThicknessFloor {
    Unconstrained,
    Enforced { h_min: f64 },
}

impl ThicknessFloor {
    /// `max(h_min, h)` pointwise, plus the number of nodes that were raised.
    ///
    /// NaN is never clamped; it is passed through for the caller to reject.
    pub fn apply(&self, thickness: Field) -> (Field, usize) {
        match *self {
            ThicknessFloor::Unconstrained => (thickness, 0),
            ThicknessFloor::Enforced { h_min } => {
                let mut values = thickness.into_values();
                let mut raised = 0;
                for h in values.iter_mut() {
                    if *h < h_min {
                        *h = h_min;
                        raised += 1;
                    }
                }
                (Field::from_values(values), raised)
            }
        }
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, ThicknessFloor::Enforced { .. })
    }
}

/// What happened on one completed driver step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: usize,
    pub time_years: f64,
    pub floor_activations: usize,
    pub min_thickness: f64,
    pub max_velocity: f64,
}

pub(crate) fn ensure_finite(field: &Field, name: &'static str, step: usize) -> MisiResult<()> {
    match field.first_non_finite() {
        Some(index) => Err(MisiError::NumericalInstability {
            step,
            field: name,
            index,
        }),
        None => Ok(()),
    }
}

pub(crate) fn ensure_positive_thickness(thickness: &Field, step: usize) -> MisiResult<()> {
    match thickness.iter().position(|h| *h <= 0.0) {
        Some(index) => Err(MisiError::NonPositiveThickness {
            step,
            index,
            value: thickness[index],
        }),
        None => Ok(()),
    }
}
