use std::cell::RefCell;
use std::fmt::Write;

/// One row of solver diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverTraceRecord {
    pub solver: &'static str,
    pub iter: usize,
    pub cost: Option<f64>,
    pub r_norm: Option<f64>,
    pub grad_norm: Option<f64>,
    /// Scaled step norm `‖D x‖`.
    pub step_norm: Option<f64>,
    pub radius: Option<f64>,
    pub lambda: Option<f64>,
    /// Gain ratio (actual / predicted reduction).
    pub ratio: Option<f64>,
    pub note: Option<&'static str>,
}

impl SolverTraceRecord {
    pub fn format_line(&self) -> String {
        let mut line = format!("[{}] iter {:>6}", self.solver, self.iter);
        if let Some(v) = self.cost {
            let _ = write!(line, " | cost {:>13.6e}", v);
        }
        if let Some(v) = self.r_norm {
            let _ = write!(line, " | r {:>13.6e}", v);
        }
        if let Some(v) = self.grad_norm {
            let _ = write!(line, " | grad {:>9.3e}", v);
        }
        if let Some(v) = self.step_norm {
            let _ = write!(line, " | dx {:>13.6e}", v);
        }
        if let Some(v) = self.radius {
            let _ = write!(line, " | delta {:>9.3e}", v);
        }
        if let Some(v) = self.lambda {
            let _ = write!(line, " | lambda {:>9.3e}", v);
        }
        if let Some(v) = self.ratio {
            let _ = write!(line, " | rho {:>+9.3e}", v);
        }
        if let Some(note) = self.note {
            let _ = write!(line, " | note {note}");
        }
        line
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TraceRow {
    iter: usize,
    cost: Option<f64>,
    r_norm: Option<f64>,
    grad_norm: Option<f64>,
    step_norm: Option<f64>,
    radius: Option<f64>,
    lambda: Option<f64>,
    ratio: Option<f64>,
    note: Option<&'static str>,
}

impl TraceRow {
    pub(crate) fn iter(iter: usize) -> Self {
        Self {
            iter,
            cost: None,
            r_norm: None,
            grad_norm: None,
            step_norm: None,
            radius: None,
            lambda: None,
            ratio: None,
            note: None,
        }
    }

    pub(crate) fn cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub(crate) fn r_norm(mut self, r_norm: f64) -> Self {
        self.r_norm = Some(r_norm);
        self
    }

    pub(crate) fn grad_norm(mut self, grad_norm: f64) -> Self {
        self.grad_norm = Some(grad_norm);
        self
    }

    pub(crate) fn step_norm(mut self, step_norm: f64) -> Self {
        self.step_norm = Some(step_norm);
        self
    }

    pub(crate) fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub(crate) fn lambda(mut self, lambda: f64) -> Self {
        self.lambda = Some(lambda);
        self
    }

    pub(crate) fn ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub(crate) fn note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }
}

/// Routes trace rows to the `log` facade and, optionally, into a history.
///
/// Rows go out at `info` level when `verbose` is set and at `trace` level
/// otherwise.
#[derive(Clone, Debug)]
pub(crate) struct SolverTracer {
    verbose: bool,
    solver: &'static str,
    history: Option<RefCell<Vec<SolverTraceRecord>>>,
}

impl SolverTracer {
    pub(crate) fn lm(verbose: bool) -> Self {
        Self {
            verbose,
            solver: "lm",
            history: None,
        }
    }

    pub(crate) fn lm_with_history(verbose: bool) -> Self {
        Self {
            verbose,
            solver: "lm",
            history: Some(RefCell::new(Vec::new())),
        }
    }

    pub(crate) fn emit(&self, row: TraceRow) {
        let record = SolverTraceRecord {
            solver: self.solver,
            iter: row.iter,
            cost: row.cost,
            r_norm: row.r_norm,
            grad_norm: row.grad_norm,
            step_norm: row.step_norm,
            radius: row.radius,
            lambda: row.lambda,
            ratio: row.ratio,
            note: row.note,
        };

        if self.verbose {
            log::info!("{}", record.format_line());
        } else {
            log::trace!("{}", record.format_line());
        }

        if let Some(history) = &self.history {
            history.borrow_mut().push(record);
        }
    }

    pub(crate) fn into_history(self) -> Option<Vec<SolverTraceRecord>> {
        self.history.map(RefCell::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_rows_in_order() {
        let tracer = SolverTracer::lm_with_history(false);
        tracer.emit(TraceRow::iter(0).cost(2.0).note("initial"));
        tracer.emit(TraceRow::iter(1).cost(1.0).lambda(0.0).note("accepted"));

        let history = tracer.into_history().expect("history enabled");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].note, Some("initial"));
        assert_eq!(history[1].lambda, Some(0.0));
        assert_eq!(history[1].radius, None);
    }

    #[test]
    fn history_is_absent_unless_requested() {
        let tracer = SolverTracer::lm(false);
        tracer.emit(TraceRow::iter(0).cost(1.0));
        assert!(tracer.into_history().is_none());
    }

    #[test]
    fn line_lists_only_present_fields() {
        let tracer = SolverTracer::lm_with_history(false);
        tracer.emit(TraceRow::iter(3).r_norm(0.5).note("rejected"));
        let history = tracer.into_history().expect("history enabled");
        let line = history[0].format_line();
        assert!(line.starts_with("[lm] iter      3"));
        assert!(line.contains("| r "));
        assert!(line.ends_with("| note rejected"));
        assert!(!line.contains("cost"));
    }
}
