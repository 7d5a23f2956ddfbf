//! 1D interval mesh and nodal fields.
//!
//! Fields are sampled at the `nx + 1` mesh vertices; node 0 is the inflow
//! boundary and node `nx` the outflow boundary.

use crate::error::{MisiError, MisiResult};
use std::ops::Index;

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalMesh {
    pub lx: f64,
    pub nx: usize,
}

impl IntervalMesh {
    pub fn new(nx: usize, lx: f64) -> MisiResult<IntervalMesh> {
        if nx < 1 {
            return Err(MisiError::configuration("nx", "must be at least 1"));
        }
        if !(lx > 0.0) || !lx.is_finite() {
            return Err(MisiError::configuration("lx", format!("must be positive, got {}", lx)));
        }
        Ok(IntervalMesh { lx, nx })
    }

    pub fn node_count(&self) -> usize {
        self.nx + 1
    }

    pub fn dx(&self) -> f64 {
        self.lx / self.nx as f64
    }

    pub fn x(&self, index: usize) -> f64 {
        self.lx * index as f64 / self.nx as f64
    }

    pub fn nodes(&self) -> Vec<f64> {
        (0..self.node_count()).map(|i| self.x(i)).collect()
    }

    /// Width of the control volume around a node: half cells at both ends.
    pub fn control_width(&self, index: usize) -> f64 {
        if index == 0 || index == self.nx {
            0.5 * self.dx()
        } else {
            self.dx()
        }
    }

    pub fn outflow_index(&self) -> usize {
        self.nx
    }
}

/// Scalar field sampled at mesh vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    values: Vec<f64>,
}

impl Field {
    pub fn from_values(values: Vec<f64>) -> Field {
        Field { values }
    }

    pub fn constant(mesh: &IntervalMesh, value: f64) -> Field {
        Field {
            values: vec![value; mesh.node_count()],
        }
    }

    /// Sample a closed-form profile of position at every node.
    pub fn interpolate<F>(mesh: &IntervalMesh, profile: F) -> Field
    where
        F: Fn(f64) -> f64,
    {
        Field {
            values: mesh.nodes().into_iter().map(profile).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }

    pub fn first(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }

    pub fn last(&self) -> f64 {
        self.values.last().copied().unwrap_or(f64::NAN)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn map<F>(&self, f: F) -> Field
    where
        F: Fn(f64) -> f64,
    {
        Field {
            values: self.values.iter().map(|v| f(*v)).collect(),
        }
    }

    pub fn zip_map<F>(&self, other: &Field, f: F) -> Field
    where
        F: Fn(f64, f64) -> f64,
    {
        Field {
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| f(*a, *b))
                .collect(),
        }
    }

    /// Index of the first NaN or infinite value.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.values.iter().position(|v| !v.is_finite())
    }

    pub fn ensure_len(&self, field: &'static str, expected: usize) -> MisiResult<()> {
        if self.values.len() != expected {
            return Err(MisiError::FieldSizeMismatch {
                field,
                expected,
                found: self.values.len(),
            });
        }
        Ok(())
    }
}

impl Index<usize> for Field {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mesh_spacing() {
        let mesh = IntervalMesh::new(50, 50.0e3).unwrap();
        assert_eq!(mesh.node_count(), 51);
        assert_abs_diff_eq!(mesh.dx(), 1000.0);
        assert_abs_diff_eq!(mesh.x(50), 50.0e3);
        assert_abs_diff_eq!(mesh.control_width(0), 500.0);
        assert_abs_diff_eq!(mesh.control_width(25), 1000.0);
        assert_abs_diff_eq!(mesh.control_width(50), 500.0);

        let total: f64 = (0..mesh.node_count()).map(|i| mesh.control_width(i)).sum();
        assert_abs_diff_eq!(total, mesh.lx, epsilon = 1e-9);
    }

    #[test]
    fn mesh_rejects_degenerate_domains() {
        assert!(matches!(
            IntervalMesh::new(0, 10.0),
            Err(MisiError::Configuration { parameter: "nx", .. })
        ));
        assert!(matches!(
            IntervalMesh::new(10, 0.0),
            Err(MisiError::Configuration { parameter: "lx", .. })
        ));
        assert!(IntervalMesh::new(10, f64::NAN).is_err());
    }

    #[test]
    fn interpolate_and_combine() {
        let mesh = IntervalMesh::new(4, 4.0).unwrap();
        let x = Field::interpolate(&mesh, |x| x);
        let two = Field::constant(&mesh, 2.0);

        assert_eq!(x.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(x.zip_map(&two, |a, b| a * b).as_slice(), &[0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(x.map(|v| -v).min(), -4.0);
        assert_eq!(x.max(), 4.0);
        assert_eq!(x.first(), 0.0);
        assert_eq!(x.last(), 4.0);
    }

    #[test]
    fn finds_non_finite_values() {
        let field = Field::from_values(vec![1.0, f64::NAN, f64::INFINITY]);
        assert_eq!(field.first_non_finite(), Some(1));
        assert_eq!(Field::from_values(vec![1.0]).first_non_finite(), None);
    }

    #[test]
    fn size_check() {
        let field = Field::from_values(vec![1.0, 2.0]);
        assert!(field.ensure_len("thickness", 2).is_ok());
        assert!(matches!(
            field.ensure_len("thickness", 3),
            Err(MisiError::FieldSizeMismatch { expected: 3, found: 2, .. })
        ));
    }
}
