use nalgebra::{DVector, Matrix1, Vector1};
use smoothlm::{nls, Manifold};

/// A point on the circle, stored as an angle in `[-pi, pi)`.
#[derive(Clone, Copy, Debug)]
struct Angle(f64);

fn wrap_angle(theta: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    (theta + std::f64::consts::PI).rem_euclid(two_pi) - std::f64::consts::PI
}

impl Manifold for Angle {
    fn dof(&self) -> usize {
        1
    }

    fn retract(&mut self, tangent: &[f64]) {
        self.0 = wrap_angle(self.0 + tangent[0]);
    }

    fn local(&self, other: &Self) -> DVector<f64> {
        DVector::from_element(1, wrap_angle(other.0 - self.0))
    }
}

fn main() {
    let target = Angle(2.8);
    let mut theta = Angle(wrap_angle(3.0 * std::f64::consts::PI));

    let result = nls::minimize(
        |x: &Angle| (Vector1::new(target.local(x)[0]), Matrix1::new(1.0)),
        &mut theta,
    );

    match result {
        Ok(report) => println!(
            "status={:?} theta={:.6} residual_norm={:.3e}",
            report.status, theta.0, report.r_norm
        ),
        Err(err) => eprintln!("minimization failed: {err}"),
    }
}
