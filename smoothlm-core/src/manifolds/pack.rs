use crate::error::MinimizeError;

use super::space::Manifold;

/// Mutable view of the caller's variables during one minimization.
///
/// The tangent layout is fixed when the pack is created. Every split and
/// every retraction uses it, so the Jacobian columns and the applied step
/// share one ordering.
pub struct VariablePack<'a, P: Manifold> {
    vars: &'a mut P,
    layout: Vec<usize>,
    dof: usize,
}

/// A candidate value, retracted on a copy of the variables.
///
/// Only [`VariablePack::commit`] writes it back.
#[derive(Clone, Debug)]
pub struct Proposal<P> {
    value: P,
}

impl<P> Proposal<P> {
    pub fn value(&self) -> &P {
        &self.value
    }

    pub fn into_inner(self) -> P {
        self.value
    }
}

impl<'a, P: Manifold> VariablePack<'a, P> {
    pub fn new(vars: &'a mut P) -> Self {
        let mut layout = Vec::new();
        vars.tangent_layout(&mut layout);
        let dof = vars.dof();
        debug_assert_eq!(layout.iter().sum::<usize>(), dof);
        Self { vars, layout, dof }
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    /// Tangent segment size of each variable, in column order.
    pub fn layout(&self) -> &[usize] {
        &self.layout
    }

    pub fn values(&self) -> &P {
        &*self.vars
    }

    /// Split a full tangent vector into one slice per variable.
    pub fn split<'t>(&self, tangent: &'t [f64]) -> Result<Vec<&'t [f64]>, MinimizeError> {
        self.check_tangent(tangent)?;
        let mut out = Vec::with_capacity(self.layout.len());
        let mut offset = 0;
        for &n in &self.layout {
            out.push(&tangent[offset..offset + n]);
            offset += n;
        }
        Ok(out)
    }

    pub fn check_jacobian(&self, cols: usize) -> Result<(), MinimizeError> {
        if cols != self.dof {
            return Err(MinimizeError::JacobianColumns {
                expected: self.dof,
                got: cols,
            });
        }
        Ok(())
    }

    /// Retract a copy of the current values. The variables are unchanged.
    pub fn propose(&self, tangent: &[f64]) -> Result<Proposal<P>, MinimizeError> {
        self.check_tangent(tangent)?;
        Ok(Proposal {
            value: self.vars.retracted(tangent),
        })
    }

    pub fn commit(&mut self, proposal: Proposal<P>) {
        *self.vars = proposal.value;
    }

    /// Tangent distance from the current values to a proposal.
    pub fn distance(&self, proposal: &Proposal<P>) -> f64 {
        self.vars.distance(&proposal.value)
    }

    /// Retract the variables in place.
    pub fn retract_all(&mut self, tangent: &[f64]) -> Result<(), MinimizeError> {
        self.check_tangent(tangent)?;
        self.vars.retract(tangent);
        Ok(())
    }

    fn check_tangent(&self, tangent: &[f64]) -> Result<(), MinimizeError> {
        if tangent.len() != self.dof {
            return Err(MinimizeError::TangentLength {
                expected: self.dof,
                got: tangent.len(),
            });
        }
        Ok(())
    }
}
