use nalgebra::{allocator::Allocator, DVector, DefaultAllocator, Dim, OMatrix, OVector};

/// Euclidean norm of every column of `j`.
pub fn column_norms<M, N>(j: &OMatrix<f64, M, N>) -> OVector<f64, N>
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<N>,
{
    let (_, n) = j.shape_generic();
    OVector::from_fn_generic(n, nalgebra::Const::<1>, |c, _| j.column(c).norm())
}

/// `‖D x‖` for the diagonal scaling `d`.
pub fn scaled_norm<N>(d: &OVector<f64, N>, x: &OVector<f64, N>) -> f64
where
    N: Dim,
    DefaultAllocator: Allocator<N>,
{
    d.iter()
        .zip(x.iter())
        .map(|(di, xi)| (di * xi) * (di * xi))
        .sum::<f64>()
        .sqrt()
}

/// `‖D v‖` for a tangent vector returned by `Manifold::local`.
pub fn scaled_tangent_norm<N>(d: &OVector<f64, N>, v: &DVector<f64>) -> f64
where
    N: Dim,
    DefaultAllocator: Allocator<N>,
{
    debug_assert_eq!(d.len(), v.len());
    d.iter()
        .zip(v.iter())
        .map(|(di, vi)| (di * vi) * (di * vi))
        .sum::<f64>()
        .sqrt()
}

/// `‖J x‖`.
pub fn product_norm<M, N>(j: &OMatrix<f64, M, N>, x: &OVector<f64, N>) -> f64
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<N>,
{
    let mut sum = 0.0;
    for i in 0..j.nrows() {
        let mut row = 0.0;
        for (k, xk) in x.iter().enumerate() {
            row += j[(i, k)] * xk;
        }
        sum += row * row;
    }
    sum.sqrt()
}

/// Cosine-type gradient measure `max_j |(Jᵀ r)_j| / (‖J_j‖ ‖r‖)`.
///
/// Columns with zero norm are skipped. Returns 0 for a zero residual.
pub fn scaled_gradient_norm<M, N>(
    j: &OMatrix<f64, M, N>,
    r: &OVector<f64, M>,
    col_norms: &OVector<f64, N>,
) -> f64
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N>,
{
    let fnorm = r.norm();
    if fnorm == 0.0 {
        return 0.0;
    }
    let mut gnorm: f64 = 0.0;
    for (c, &cn) in col_norms.iter().enumerate() {
        if cn == 0.0 {
            continue;
        }
        let dot = j.column(c).dot(r);
        gnorm = gnorm.max((dot / fnorm).abs() / cn);
    }
    gnorm
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2x3, Vector2, Vector3};

    #[test]
    fn column_norms_of_small_matrix() {
        let j = Matrix2x3::new(3.0, 0.0, 1.0, 4.0, 0.0, 1.0);
        let n = column_norms(&j);
        assert_eq!(n, Vector3::new(5.0, 0.0, 2.0_f64.sqrt()));
    }

    #[test]
    fn scaled_gradient_skips_zero_columns() {
        let j = Matrix2x3::new(1.0, 0.0, 0.0, 0.0, 0.0, 2.0);
        let r = Vector2::new(1.0, 1.0);
        let n = column_norms(&j);
        let g = scaled_gradient_norm(&j, &r, &n);
        assert!((g - 1.0 / 2.0_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn norms_of_products() {
        let j = Matrix2x3::new(1.0, 2.0, 0.0, 0.0, 1.0, 1.0);
        let x = Vector3::new(1.0, 1.0, 1.0);
        assert!((product_norm(&j, &x) - 13.0_f64.sqrt()).abs() < 1e-15);

        let d = Vector3::new(2.0, 0.0, 1.0);
        assert!((scaled_norm(&d, &x) - 5.0_f64.sqrt()).abs() < 1e-15);

        let v = DVector::from_vec(vec![1.0, 7.0, -2.0]);
        assert!((scaled_tangent_norm(&d, &v) - 8.0_f64.sqrt()).abs() < 1e-15);
    }
}
