use std::time::Duration;

use crate::solvers::SolverTraceRecord;

/// Why the trust-region loop stopped.
///
/// None of these is an error: the best estimate found is always left in the
/// caller's variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Scaled step `‖D x‖` fell below `step_tolerance`.
    StepTolerance,
    /// An accepted step was small relative to the distance travelled from the
    /// initial estimate, both measured as `‖D a‖` on tangent vectors.
    ParameterTolerance,
    /// Scaled gradient fell below `gradient_tolerance`, or an accepted step
    /// reached an exactly zero residual.
    GradientTolerance,
    /// Actual and predicted relative cost reductions fell below `cost_tolerance`.
    CostTolerance,
    /// `max_iterations` proposals were made.
    IterationLimit,
    /// `max_time` elapsed.
    TimeLimit,
    /// The residual is exactly zero at the initial estimate.
    ZeroResidual,
}

impl Status {
    /// `true` for the tolerance-based stops.
    pub fn is_converged(self) -> bool {
        !matches!(self, Status::IterationLimit | Status::TimeLimit)
    }
}

/// Trust-region acceptance and radius update constants.
///
/// Defaults are the MINPACK values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrustRegionPolicy {
    /// Accept a step when gain ratio >= this.
    pub accept_ratio: f64,
    /// Shrink the radius when gain ratio <= this.
    pub shrink_ratio: f64,
    /// Expand the radius when gain ratio >= this.
    pub expand_ratio: f64,
    /// Upper clamp of the interpolated shrink factor.
    pub shrink_factor: f64,
    /// Lower clamp of the interpolated shrink factor.
    pub min_shrink_factor: f64,
    /// `Δ <- expand_factor * ‖D x‖` on expansion.
    pub expand_factor: f64,
}

impl Default for TrustRegionPolicy {
    fn default() -> Self {
        Self {
            accept_ratio: 1e-4,
            shrink_ratio: 0.25,
            expand_ratio: 0.75,
            shrink_factor: 0.5,
            min_shrink_factor: 0.1,
            expand_factor: 2.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LevenbergMarquardtResult {
    pub status: Status,
    /// Number of proposed steps.
    pub iterations: usize,
    /// Number of residual/Jacobian evaluations.
    pub evaluations: usize,
    pub cost: f64, // 0.5 * ||r||^2
    pub r_norm: f64,
    pub grad_norm: f64,
    /// `‖D x‖` of the last proposed step.
    pub step_norm: f64,
    /// Final trust-region radius.
    pub radius: f64,
    /// Final damping parameter.
    pub lambda: f64,
    pub trace: Option<Vec<SolverTraceRecord>>,
}

impl LevenbergMarquardtResult {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

#[derive(Clone, Debug)]
pub struct LevenbergMarquardt {
    pub step_tolerance: f64,      // stop if ||D dx|| <= tol
    pub parameter_tolerance: f64, // stop if ||D dx|| <= tol * (||D (x - x0)|| + tol), on accept
    pub gradient_tolerance: f64,  // stop if scaled gradient <= tol
    pub cost_tolerance: f64,      // stop if relative reductions <= tol
    pub max_iterations: usize,
    pub max_time: Option<Duration>,
    /// Initial bound on `‖D x‖`. The first proposed step also bounds it from above.
    pub initial_trust_region_radius: f64,
    pub trust_region: TrustRegionPolicy,
    pub verbose: bool,
    pub collect_trace: bool,
}

impl LevenbergMarquardt {
    /// Build a solver with default tolerances.
    pub fn new() -> Self {
        Self {
            step_tolerance: 1e-10,
            parameter_tolerance: 1e-10,
            gradient_tolerance: 1e-10,
            cost_tolerance: 1e-14,
            max_iterations: 100,
            max_time: None,
            initial_trust_region_radius: 100.0,
            trust_region: TrustRegionPolicy::default(),
            verbose: false,
            collect_trace: false,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.collect_trace = true;
        self
    }
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}
