//! Product manifolds.
//!
//! A tuple `(A, B, ...)` or a `Vec<M>` of manifolds is itself a manifold
//! whose tangent space is the concatenation of the members' tangent spaces,
//! in member order:
//!
//! ```text
//! [ tangent(A) | tangent(B) | ... ]
//! ```
//!
//! `retract` splits an incoming tangent with the same offsets that
//! `tangent_layout` reports, so a Jacobian built against the layout and the
//! step applied by the solver always agree on which column belongs to which
//! member.

use nalgebra::DVector;

use super::space::Manifold;

macro_rules! impl_tuple_manifold {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Manifold),+> Manifold for ($($name,)+) {
            fn dof(&self) -> usize {
                0 $(+ self.$idx.dof())+
            }

            #[allow(unused_assignments)]
            fn retract(&mut self, tangent: &[f64]) {
                debug_assert_eq!(tangent.len(), self.dof());
                let mut offset = 0;
                $(
                    let n = self.$idx.dof();
                    self.$idx.retract(&tangent[offset..offset + n]);
                    offset += n;
                )+
            }

            #[allow(unused_assignments)]
            fn local(&self, other: &Self) -> DVector<f64> {
                let mut out = DVector::zeros(self.dof());
                let mut offset = 0;
                $(
                    let segment = self.$idx.local(&other.$idx);
                    out.rows_mut(offset, segment.len()).copy_from(&segment);
                    offset += segment.len();
                )+
                out
            }

            fn tangent_layout(&self, out: &mut Vec<usize>) {
                $( out.push(self.$idx.dof()); )+
            }
        }
    };
}

impl_tuple_manifold!(A: 0);
impl_tuple_manifold!(A: 0, B: 1);
impl_tuple_manifold!(A: 0, B: 1, C: 2);
impl_tuple_manifold!(A: 0, B: 1, C: 2, D: 3);
impl_tuple_manifold!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple_manifold!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple_manifold!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple_manifold!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// A runtime-length sequence of manifold values.
///
/// Members may have different runtime dimensions (e.g. a `Vec<DVector<f64>>`
/// with vectors of lengths 3, 4 and 2 has 9 degrees of freedom).
impl<M: Manifold> Manifold for Vec<M> {
    fn dof(&self) -> usize {
        self.iter().map(Manifold::dof).sum()
    }

    fn retract(&mut self, tangent: &[f64]) {
        debug_assert_eq!(tangent.len(), self.dof());
        let mut offset = 0;
        for member in self.iter_mut() {
            let n = member.dof();
            member.retract(&tangent[offset..offset + n]);
            offset += n;
        }
    }

    /// # Panics
    /// If `other` has a different number of members.
    fn local(&self, other: &Self) -> DVector<f64> {
        assert_eq!(
            self.len(),
            other.len(),
            "manifold vectors of different lengths have no tangent difference"
        );
        let mut out = DVector::zeros(self.dof());
        let mut offset = 0;
        for (a, b) in self.iter().zip(other) {
            let segment = a.local(b);
            out.rows_mut(offset, segment.len()).copy_from(&segment);
            offset += segment.len();
        }
        out
    }

    fn tangent_layout(&self, out: &mut Vec<usize>) {
        out.extend(self.iter().map(Manifold::dof));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifolds::So3;
    use nalgebra::{DVector, Vector2, Vector3};

    #[test]
    fn tuple_layout_follows_member_order() {
        let x = (So3::identity(), DVector::from_element(4, 0.0), 1.0_f64);
        assert_eq!(x.dof(), 8);

        let mut layout = Vec::new();
        x.tangent_layout(&mut layout);
        assert_eq!(layout, vec![3, 4, 1]);
    }

    #[test]
    fn tuple_retract_routes_segments_to_members() {
        let mut x = (Vector2::new(1.0, 2.0), 10.0_f64, Vector3::<f64>::zeros());
        x.retract(&[0.5, -0.5, 3.0, 1.0, 2.0, 3.0]);

        assert_eq!(x.0, Vector2::new(1.5, 1.5));
        assert_eq!(x.1, 13.0);
        assert_eq!(x.2, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn vec_of_vectors_has_ragged_layout() {
        let m1 = vec![
            DVector::from_element(3, 0.0),
            DVector::from_element(4, 0.0),
            DVector::from_element(2, 0.0),
        ];
        let mut m2 = m1.clone();
        let tangent: Vec<f64> = (0..9).map(|i| i as f64).collect();
        m2.retract(&tangent);

        let mut layout = Vec::new();
        m1.tangent_layout(&mut layout);
        assert_eq!(layout, vec![3, 4, 2]);

        let diff = m1.local(&m2);
        assert_eq!(diff.len(), 9);
        assert_eq!(diff.as_slice(), tangent.as_slice());
    }

    #[test]
    #[should_panic(expected = "different lengths")]
    fn vec_local_rejects_length_mismatch() {
        let short = vec![So3::identity()];
        let long = vec![So3::identity(), So3::identity()];
        let _ = short.local(&long);
    }

    #[test]
    fn vec_of_rotations_round_trip() {
        let m1 = vec![
            So3::exp(&Vector3::new(0.1, 0.2, 0.3)),
            So3::exp(&Vector3::new(-0.5, 0.0, 0.4)),
            So3::exp(&Vector3::new(0.7, -0.1, 0.0)),
        ];
        let m2 = vec![
            So3::exp(&Vector3::new(0.2, 0.2, 0.1)),
            So3::exp(&Vector3::new(-0.4, 0.1, 0.4)),
            So3::exp(&Vector3::new(0.6, -0.2, 0.1)),
        ];

        let diff = m1.local(&m2);
        assert_eq!(diff.len(), 9);

        let reached = m1.retracted(diff.as_slice());
        assert!(reached.local(&m2).norm() < 1e-12);
    }
}
