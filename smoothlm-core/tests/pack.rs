use nalgebra::{DVector, Vector2, Vector3};
use smoothlm::{Manifold, MinimizeError, So3, VariablePack};

#[test]
fn layout_and_split_follow_tuple_order() {
    let mut vars = (So3::identity(), DVector::from_element(2, 1.0), 4.0_f64);
    let pack = VariablePack::new(&mut vars);
    assert_eq!(pack.dof(), 6);
    assert_eq!(pack.layout(), &[3, 2, 1]);

    let tangent = [0.1, 0.2, 0.3, 1.0, 2.0, -5.0];
    let parts = pack.split(&tangent).expect("tangent has the pack's length");
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], &[0.1, 0.2, 0.3]);
    assert_eq!(parts[1], &[1.0, 2.0]);
    assert_eq!(parts[2], &[-5.0]);
}

#[test]
fn zero_tangent_proposal_is_identity() {
    let mut vars = (
        So3::exp(&Vector3::new(0.4, -0.2, 1.0)),
        Vector2::new(3.0, -1.0),
    );
    let before = vars;
    let mut pack = VariablePack::new(&mut vars);

    let proposal = pack.propose(&[0.0; 5]).expect("tangent has the pack's length");
    assert!(pack.distance(&proposal) < 1e-14);
    pack.commit(proposal);

    assert!(before.0.local(&vars.0).norm() < 1e-14);
    assert_eq!(before.1, vars.1);
}

#[test]
fn proposal_leaves_variables_untouched_until_commit() {
    let mut vars = Vector3::new(1.0, 2.0, 3.0);
    let mut pack = VariablePack::new(&mut vars);

    let proposal = pack.propose(&[1.0, 0.0, -1.0]).expect("tangent has the pack's length");
    assert_eq!(*pack.values(), Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(*proposal.value(), Vector3::new(2.0, 2.0, 2.0));
    assert!((pack.distance(&proposal) - 2.0_f64.sqrt()).abs() < 1e-15);

    pack.commit(proposal);
    assert_eq!(vars, Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn mismatched_tangent_is_rejected() {
    let mut vars = (So3::identity(), 0.0_f64);
    let mut pack = VariablePack::new(&mut vars);

    let err = pack.propose(&[0.0; 3]).unwrap_err();
    assert_eq!(err, MinimizeError::TangentLength { expected: 4, got: 3 });

    let err = pack.split(&[0.0; 5]).unwrap_err();
    assert_eq!(err, MinimizeError::TangentLength { expected: 4, got: 5 });

    let err = pack.retract_all(&[0.0; 2]).unwrap_err();
    assert_eq!(err, MinimizeError::TangentLength { expected: 4, got: 2 });

    let err = pack.check_jacobian(6).unwrap_err();
    assert_eq!(err, MinimizeError::JacobianColumns { expected: 4, got: 6 });
    assert!(pack.check_jacobian(4).is_ok());
}

#[test]
fn vec_of_manifolds_packs_each_member() {
    let mut vars = vec![So3::identity(), So3::identity()];
    let mut pack = VariablePack::new(&mut vars);
    assert_eq!(pack.layout(), &[3, 3]);

    pack.retract_all(&[0.0, 0.0, 0.5, 0.0, -0.5, 0.0])
        .expect("tangent has the pack's length");
    assert!((vars[0].log() - Vector3::new(0.0, 0.0, 0.5)).norm() < 1e-12);
    assert!((vars[1].log() - Vector3::new(0.0, -0.5, 0.0)).norm() < 1e-12);
}
