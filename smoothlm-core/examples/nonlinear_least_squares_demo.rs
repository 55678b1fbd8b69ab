use nalgebra::{DMatrix, DVector, Vector3};
use smoothlm::{manifolds::so3::hat, LevenbergMarquardt, Manifold, So3};

/// Recover a rotation and a scale from point correspondences `dst_i = s * R * src_i`.
fn main() {
    let truth = So3::exp(&Vector3::new(0.3, -0.5, 0.9));
    let scale = 1.7;
    let src = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(1.0, 1.0, -1.0),
    ];
    let dst: Vec<Vector3<f64>> = src.iter().map(|p| truth.rotate(p) * scale).collect();

    let solver = LevenbergMarquardt {
        verbose: true,
        ..Default::default()
    };

    let mut vars = (So3::identity(), 1.0_f64);
    let result = solver.minimize(
        |(rot, s): &(So3, f64)| {
            let m = 3 * src.len();
            let mut r = DVector::zeros(m);
            let mut j = DMatrix::zeros(m, 4);
            for (i, (p, q)) in src.iter().zip(&dst).enumerate() {
                let rp = rot.rotate(p);
                r.fixed_rows_mut::<3>(3 * i).copy_from(&(rp * *s - q));
                // d(R exp(w) p)/dw = -R [p]_x
                let d_rot = -rot.matrix() * hat(p) * *s;
                j.fixed_view_mut::<3, 3>(3 * i, 0).copy_from(&d_rot);
                j.fixed_view_mut::<3, 1>(3 * i, 3).copy_from(&rp);
            }
            (r, j)
        },
        &mut vars,
    );

    match result {
        Ok(report) => {
            let err = vars.0.local(&truth).norm();
            println!(
                "status={:?} iterations={} rotation_error={:.3e} scale={:.6} cost={:.3e}",
                report.status, report.iterations, err, vars.1, report.cost
            );
        }
        Err(err) => eprintln!("minimization failed: {err}"),
    }
}
