use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, Dyn, OMatrix, OVector};

use crate::error::MinimizeError;
use crate::manifolds::space::Manifold;

/// Residual and its central-difference Jacobian with respect to the tangent
/// space of `x`.
///
/// Column `k` is `(f(x ⊕ h e_k) - f(x ⊕ -h e_k)) / 2h`, so the columns follow
/// the same ordering as `Manifold::retract`.
pub fn central_jacobian<P, M, F>(
    f: &mut F,
    x: &P,
) -> Result<(OVector<f64, M>, OMatrix<f64, M, Dyn>), MinimizeError>
where
    P: Manifold,
    M: Dim,
    F: FnMut(&P) -> OVector<f64, M>,
    DefaultAllocator: Allocator<M> + Allocator<M, Dyn>,
{
    let h = f64::EPSILON.cbrt();
    let n = x.dof();

    let r = f(x);
    let (rows, _) = r.shape_generic();
    let m = r.len();
    let mut jac = OMatrix::<f64, M, Dyn>::zeros_generic(rows, Dyn(n));

    let mut tangent = vec![0.0; n];
    for k in 0..n {
        tangent[k] = h;
        let plus = f(&x.retracted(&tangent));
        tangent[k] = -h;
        let minus = f(&x.retracted(&tangent));
        tangent[k] = 0.0;

        for len in [plus.len(), minus.len()] {
            if len != m {
                return Err(MinimizeError::RaggedResidual {
                    expected: m,
                    got: len,
                });
            }
        }
        for i in 0..m {
            jac[(i, k)] = (plus[i] - minus[i]) / (2.0 * h);
        }
    }

    Ok((r, jac))
}
