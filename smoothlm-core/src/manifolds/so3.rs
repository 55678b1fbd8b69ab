//! The rotation group SO(3).
//!
//! Rotations are stored as unit quaternions. The tangent space is the Lie
//! algebra so(3) in body coordinates, so the retraction is
//! `g <- g * exp(a)` and the local difference is `log(g^{-1} * h)`.

use std::ops::Mul;

use nalgebra::{DVector, Matrix3, Quaternion, UnitQuaternion, Vector3};

use super::space::Manifold;

/// Below this angle the closed-form Jacobian coefficients are replaced by
/// their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-5;

/// A 3D rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct So3 {
    quat: UnitQuaternion<f64>,
}

impl Default for So3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl So3 {
    pub fn identity() -> Self {
        Self {
            quat: UnitQuaternion::identity(),
        }
    }

    pub fn from_quaternion(quat: UnitQuaternion<f64>) -> Self {
        Self { quat }
    }

    /// Uniformly distributed rotation from three independent draws in `[0, 1)`
    /// (Shoemake's subgroup algorithm).
    pub fn from_uniform(u1: f64, u2: f64, u3: f64) -> Self {
        let tau = std::f64::consts::TAU;
        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        let q = Quaternion::new(
            b * (tau * u3).cos(),
            a * (tau * u2).sin(),
            a * (tau * u2).cos(),
            b * (tau * u3).sin(),
        );
        Self {
            quat: UnitQuaternion::new_normalize(q),
        }
    }

    pub fn quaternion(&self) -> &UnitQuaternion<f64> {
        &self.quat
    }

    /// Exponential map so(3) -> SO(3).
    pub fn exp(a: &Vector3<f64>) -> Self {
        Self {
            quat: UnitQuaternion::from_scaled_axis(*a),
        }
    }

    /// Logarithm SO(3) -> so(3), rotation angle in `[0, pi]`.
    pub fn log(&self) -> Vector3<f64> {
        self.quat.scaled_axis()
    }

    pub fn inverse(&self) -> Self {
        Self {
            quat: self.quat.inverse(),
        }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        self.quat.to_rotation_matrix().into_inner()
    }

    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.quat * v
    }
}

impl Mul for So3 {
    type Output = So3;

    fn mul(self, rhs: So3) -> So3 {
        So3 {
            quat: self.quat * rhs.quat,
        }
    }
}

impl Manifold for So3 {
    fn dof(&self) -> usize {
        3
    }

    fn retract(&mut self, tangent: &[f64]) {
        debug_assert_eq!(tangent.len(), 3);
        let a = Vector3::new(tangent[0], tangent[1], tangent[2]);
        // renormalize to keep round-off from accumulating over many updates
        let updated = self.quat * UnitQuaternion::from_scaled_axis(a);
        self.quat = UnitQuaternion::new_normalize(updated.into_inner());
    }

    fn local(&self, other: &Self) -> DVector<f64> {
        let a = (self.inverse() * *other).log();
        DVector::from_column_slice(a.as_slice())
    }
}

/// Skew-symmetric matrix `[a]_x` with `[a]_x v = a x v`.
pub fn hat(a: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -a.z, a.y, a.z, 0.0, -a.x, -a.y, a.x, 0.0)
}

/// Right Jacobian of the exponential map.
///
/// `exp(a + da) ≈ exp(a) * exp(dr_exp(a) * da)`
pub fn dr_exp(a: &Vector3<f64>) -> Matrix3<f64> {
    let theta2 = a.norm_squared();
    let w = hat(a);
    let (c1, c2) = if theta2 < SMALL_ANGLE * SMALL_ANGLE {
        (0.5 - theta2 / 24.0, 1.0 / 6.0 - theta2 / 120.0)
    } else {
        let theta = theta2.sqrt();
        (
            (1.0 - theta.cos()) / theta2,
            (theta - theta.sin()) / (theta2 * theta),
        )
    };
    Matrix3::identity() - w * c1 + w * w * c2
}

/// Inverse of [`dr_exp`].
///
/// `log(exp(a) * exp(da)) ≈ a + dr_expinv(a) * da`
pub fn dr_expinv(a: &Vector3<f64>) -> Matrix3<f64> {
    let theta2 = a.norm_squared();
    let w = hat(a);
    let c = if theta2 < SMALL_ANGLE * SMALL_ANGLE {
        1.0 / 12.0 + theta2 / 720.0
    } else {
        let theta = theta2.sqrt();
        1.0 / theta2 - (1.0 + theta.cos()) / (2.0 * theta * theta.sin())
    };
    Matrix3::identity() + w * 0.5 + w * w * c
}

/// Left-perturbation counterpart of [`dr_expinv`]: `dl_expinv(a) = dr_expinv(-a)`.
pub fn dl_expinv(a: &Vector3<f64>) -> Matrix3<f64> {
    dr_expinv(&-a)
}
