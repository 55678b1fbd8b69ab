//! Capability contract for manifold-valued optimization variables.

use nalgebra::DVector;

/// A value on a smooth manifold.
///
/// The interface is intentionally small. Solvers only ever:
/// - ask for the number of tangent coordinates (`dof`)
/// - move a value along a tangent vector (`retract`)
/// - measure the tangent difference between two values (`local`)
///
/// Tangent vectors are plain `&[f64]` slices of length `dof()`, expressed in
/// the local frame of the value they are applied to.
pub trait Manifold: Clone {
    /// Number of tangent coordinates.
    fn dof(&self) -> usize;

    /// In-place update: self <- Retr_self(tangent).
    ///
    /// `tangent.len() == self.dof()`. A zero tangent must leave the value
    /// unchanged.
    fn retract(&mut self, tangent: &[f64]);

    /// Tangent `a` such that `Retr_self(a) == other`.
    ///
    /// `other` must have the same structure as `self` (same runtime
    /// dimensions, same member count for products).
    fn local(&self, other: &Self) -> DVector<f64>;

    /// Append the tangent sizes of the variables this value is composed of.
    ///
    /// Plain values are a single variable. Products report one entry per
    /// member so that the sum of the layout equals `dof()`.
    fn tangent_layout(&self, out: &mut Vec<usize>) {
        out.push(self.dof());
    }

    // --- convenience wrappers (allocate) ---
    fn retracted(&self, tangent: &[f64]) -> Self {
        let mut out = self.clone();
        out.retract(tangent);
        out
    }

    fn distance(&self, other: &Self) -> f64 {
        self.local(other).norm()
    }
}
