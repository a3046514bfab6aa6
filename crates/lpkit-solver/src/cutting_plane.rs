use std::fmt::Write as _;

use crate::problem::{Problem, Relation, VarKind};
use crate::simplex::TableauSimplex;
use crate::solution::SolveResult;
use crate::{SolveError, Solver};

/// Cutting-plane solver for integer and binary variables.
///
/// Repeatedly solves the LP relaxation with the tableau simplex and, while
/// some integer-restricted variable is fractional, appends the simplified
/// bound cut `x_k <= floor(value)` and re-solves; the cut is a plain
/// variable bound, not a tableau-derived Gomory cut. Binary variables
/// contribute an initial
/// `x <= 1` row. The caller's problem is never mutated; every cut lands on
/// a fresh clone.
pub struct CuttingPlane {
    max_cuts: usize,
    tolerance: f64,
}

impl Default for CuttingPlane {
    fn default() -> Self {
        Self {
            max_cuts: 100,
            tolerance: 1e-6,
        }
    }
}

impl CuttingPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_cuts(mut self, max: usize) -> Self {
        self.max_cuts = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    fn is_restricted(problem: &Problem, j: usize) -> bool {
        matches!(
            problem.variables[j].kind,
            VarKind::Integer | VarKind::Binary
        )
    }
}

impl Solver for CuttingPlane {
    fn solve(&self, problem: &Problem) -> Result<SolveResult, SolveError> {
        let n = problem.num_variables();
        let mut log = String::new();
        let _ = writeln!(log, "=== Cutting Plane Algorithm Started ===");

        // Continuous relaxation; binary variables are boxed into [0, 1].
        let mut current = problem.clone();
        for j in 0..n {
            if problem.variables[j].kind == VarKind::Binary {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                current = current
                    .with_constraint(row, Relation::Le, 1.0)
                    .expect("bound row matches problem width");
                let _ = writeln!(log, "Binary bound added: x{} <= 1", j + 1);
            }
        }

        let lp = TableauSimplex::new();
        for cut in 0..self.max_cuts {
            let _ = writeln!(log, "\n--- Node {} ---", cut + 1);
            let mut relaxation = lp.solve(&current)?;
            log.push_str(&relaxation.log);

            if !relaxation.is_optimal {
                let _ = writeln!(log, "Relaxed LP is not optimal. Stopping.");
                relaxation.log = log;
                return Ok(relaxation);
            }

            // First integer/binary variable that is fractional, index order.
            let fractional = (0..n)
                .filter(|&j| Self::is_restricted(problem, j))
                .find(|&j| {
                    let v = relaxation.solution[j];
                    (v - v.round()).abs() > self.tolerance
                });

            let Some(k) = fractional else {
                for j in 0..n {
                    if Self::is_restricted(problem, j) {
                        relaxation.solution[j] = relaxation.solution[j].round();
                    }
                }
                relaxation.objective = problem.objective_value(&relaxation.solution);
                let _ = writeln!(log, "\n=== Optimal Integer Solution Found ===");
                relaxation.log = log;
                return Ok(relaxation);
            };

            let value = relaxation.solution[k];
            let bound = value.floor();
            let _ = writeln!(log, "\n--- Adding Cut on Variable x{} ---", k + 1);
            let _ = writeln!(log, "Cut Added: x{} <= {bound}", k + 1);

            let mut row = vec![0.0; n];
            row[k] = 1.0;
            current = current
                .with_constraint(row, Relation::Le, bound)
                .expect("cut row matches problem width");
        }

        let _ = writeln!(log, "\n=== Cut limit reached. Returning last relaxation. ===");
        let mut last = lp.solve(&current)?;
        let mut full_log = log;
        full_log.push_str(&last.log);
        last.log = full_log;
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Sense, VarSign, Variable};

    fn integer_var() -> Variable {
        Variable {
            kind: VarKind::Integer,
            sign: VarSign::NonNegative,
        }
    }

    #[test]
    fn test_cuts_until_integral() {
        // max x, 2x <= 7 relaxes to x = 3.5; the cut x <= 3 settles it.
        let mut p = Problem::new(vec![1.0], Sense::Maximize)
            .with_constraint(vec![2.0], Relation::Le, 7.0)
            .unwrap();
        p.variables[0] = integer_var();

        let r = CuttingPlane::new().solve(&p).unwrap();
        assert!(r.is_optimal);
        assert!((r.solution[0] - 3.0).abs() < 1e-6);
        assert!((r.objective - 3.0).abs() < 1e-6);
        assert!(r.log.contains("Cut Added: x1 <= 3"));
        assert!(r.log.contains("Optimal Integer Solution Found"));
    }

    #[test]
    fn test_continuous_variables_left_alone() {
        // Only x1 is integer; x2 may stay fractional.
        let mut p = Problem::new(vec![1.0, 1.0], Sense::Maximize)
            .with_constraint(vec![2.0, 0.0], Relation::Le, 7.0)
            .unwrap()
            .with_constraint(vec![0.0, 2.0], Relation::Le, 7.0)
            .unwrap();
        p.variables[0] = integer_var();

        let r = CuttingPlane::new().solve(&p).unwrap();
        assert!(r.is_optimal);
        assert!((r.solution[0] - 3.0).abs() < 1e-6);
        assert!((r.solution[1] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_binary_bound_rows() {
        // max x + y with y binary: y is capped at 1 even though the
        // structural constraint would allow more.
        let mut p = Problem::new(vec![1.0, 1.0], Sense::Maximize)
            .with_constraint(vec![1.0, 1.0], Relation::Le, 5.0)
            .unwrap();
        p.variables[1] = Variable {
            kind: VarKind::Binary,
            sign: VarSign::NonNegative,
        };
        let r = CuttingPlane::new().solve(&p).unwrap();
        assert!(r.is_optimal);
        assert!(r.solution[1] <= 1.0 + 1e-6);
        assert!((r.objective - 5.0).abs() < 1e-6);
        assert!(r.log.contains("Binary bound added: x2 <= 1"));
    }

    #[test]
    fn test_cut_cap_terminates() {
        let mut p = Problem::new(vec![1.0], Sense::Maximize)
            .with_constraint(vec![2.0], Relation::Le, 7.0)
            .unwrap();
        p.variables[0] = integer_var();
        // Zero cuts allowed: the loop never runs and the last relaxation
        // (still fractional) comes back rather than spinning forever.
        let r = CuttingPlane::new().with_max_cuts(0).solve(&p).unwrap();
        assert!(r.log.contains("Cut limit reached"));
        assert!((r.solution[0] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_caller_problem_unchanged() {
        let mut p = Problem::new(vec![1.0], Sense::Maximize)
            .with_constraint(vec![2.0], Relation::Le, 7.0)
            .unwrap();
        p.variables[0] = integer_var();
        let before = p.clone();
        let _ = CuttingPlane::new().solve(&p).unwrap();
        assert_eq!(p, before);
    }
}
