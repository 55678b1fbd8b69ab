use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OMatrix, OVector};

use crate::numerics::linalg::{column_norms, scaled_gradient_norm};

/// Linearization at the current estimate plus the persistent column scaling.
pub(super) struct LmWorkspace<M: Dim, N: Dim>
where
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N>,
{
    pub(super) r: OVector<f64, M>,
    pub(super) jac: OMatrix<f64, M, N>,
    pub(super) fnorm: f64,
    pub(super) gnorm: f64,
    pub(super) diag: OVector<f64, N>,
}

impl<M: Dim, N: Dim> LmWorkspace<M, N>
where
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N>,
{
    /// Scaling starts at the column norms, with zero columns mapped to 1.
    pub(super) fn new(r: OVector<f64, M>, jac: OMatrix<f64, M, N>) -> Self {
        let norms = column_norms(&jac);
        let gnorm = scaled_gradient_norm(&jac, &r, &norms);
        let diag = norms.map(|c| if c == 0.0 { 1.0 } else { c });
        Self {
            fnorm: r.norm(),
            gnorm,
            r,
            jac,
            diag,
        }
    }

    /// Install a new linearization. The scaling never decreases.
    pub(super) fn relinearize(&mut self, r: OVector<f64, M>, jac: OMatrix<f64, M, N>) {
        let norms = column_norms(&jac);
        self.gnorm = scaled_gradient_norm(&jac, &r, &norms);
        for (d, c) in self.diag.iter_mut().zip(norms.iter()) {
            *d = d.max(*c);
        }
        self.fnorm = r.norm();
        self.r = r;
        self.jac = jac;
    }

    pub(super) fn cost(&self) -> f64 {
        0.5 * self.fnorm * self.fnorm
    }
}
