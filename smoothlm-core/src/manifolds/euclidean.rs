use nalgebra::{allocator::Allocator, DVector, DefaultAllocator, Dim, OVector};

use super::space::Manifold;

/// A scalar is the one-dimensional Euclidean space.
impl Manifold for f64 {
    fn dof(&self) -> usize {
        1
    }

    fn retract(&mut self, tangent: &[f64]) {
        debug_assert_eq!(tangent.len(), 1);
        *self += tangent[0];
    }

    fn local(&self, other: &f64) -> DVector<f64> {
        DVector::from_element(1, other - self)
    }
}

/// R^n as a column vector, either statically (`SVector`) or dynamically
/// (`DVector`) sized.
impl<D: Dim> Manifold for OVector<f64, D>
where
    DefaultAllocator: Allocator<D>,
{
    fn dof(&self) -> usize {
        self.len()
    }

    fn retract(&mut self, tangent: &[f64]) {
        debug_assert_eq!(tangent.len(), self.len());
        for (xi, ai) in self.iter_mut().zip(tangent) {
            *xi += ai;
        }
    }

    fn local(&self, other: &Self) -> DVector<f64> {
        assert_eq!(self.len(), other.len(), "vectors of different lengths");
        DVector::from_iterator(
            self.len(),
            self.iter().zip(other.iter()).map(|(xi, yi)| yi - xi),
        )
    }
}
