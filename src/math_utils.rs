//! Numerical helpers shared by the field initializer and the reference solver.

/// Assert that the percentage deviation between two values is below a threshold.
///
/// Calculates the deviation of `actual` from `expected` as a percentage of
/// `expected` and panics if it is not smaller than `max_deviation`.
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, actual_val, expected_val
                );
            }
        }
    };
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%: {}\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
                );
            }
        }
    };
}

/// Linear interpolation between two values
///
/// # Examples
/// ```
/// use misi_rust::math_utils::lerp;
///
/// // surface elevation halfway down a 850 m -> 50 m flowline
/// assert_eq!(lerp(850.0, 50.0, 0.5), 450.0);
/// ```
pub fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a + (b - a) * ratio
}

/// Calculate the percentage deviation of `actual` from `expected`.
///
/// ```
/// use misi_rust::math_utils::deviation;
///
/// assert_eq!(deviation(105.0, 100.0), 5.0);
/// assert_eq!(deviation(95.0, 100.0), 5.0);
/// ```
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected.abs() < f64::EPSILON {
        if actual.abs() < f64::EPSILON {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        ((actual - expected).abs() / expected.abs()) * 100.0
    }
}

/// Largest absolute value in a slice (0 for an empty slice).
pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}

/// Largest absolute pointwise difference between two equal-length slices.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc: f64, (x, y)| acc.max((x - y).abs()))
}

/// Scratch storage for the Thomas algorithm.
///
/// Kept alive between solves so repeated systems of the same size do not
/// reallocate.
#[derive(Debug, Clone, Default)]
pub struct TridiagonalWorkspace {
    c_prime: Vec<f64>,
    d_prime: Vec<f64>,
}

impl TridiagonalWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve `lower[i]·x[i-1] + diag[i]·x[i] + upper[i]·x[i+1] = rhs[i]`.
    ///
    /// `lower[0]` and `upper[n-1]` are ignored. No pivoting is done, so the
    /// system must be diagonally dominant (or an M-matrix); a zero pivot
    /// yields `None`.
    pub fn solve(
        &mut self,
        lower: &[f64],
        diag: &[f64],
        upper: &[f64],
        rhs: &[f64],
        out: &mut Vec<f64>,
    ) -> Option<()> {
        let n = diag.len();
        if n == 0 || lower.len() != n || upper.len() != n || rhs.len() != n {
            return None;
        }

        self.c_prime.clear();
        self.c_prime.resize(n, 0.0);
        self.d_prime.clear();
        self.d_prime.resize(n, 0.0);

        if diag[0] == 0.0 {
            return None;
        }
        self.c_prime[0] = if n > 1 { upper[0] / diag[0] } else { 0.0 };
        self.d_prime[0] = rhs[0] / diag[0];

        for i in 1..n {
            let denom = diag[i] - lower[i] * self.c_prime[i - 1];
            if denom == 0.0 {
                return None;
            }
            self.c_prime[i] = if i < n - 1 { upper[i] / denom } else { 0.0 };
            self.d_prime[i] = (rhs[i] - lower[i] * self.d_prime[i - 1]) / denom;
        }

        out.clear();
        out.resize(n, 0.0);
        out[n - 1] = self.d_prime[n - 1];
        for i in (0..n - 1).rev() {
            out[i] = self.d_prime[i] - self.c_prime[i] * out[i + 1];
        }
        Some(())
    }
}
