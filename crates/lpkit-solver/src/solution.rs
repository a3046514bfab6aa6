use std::fmt::Write as _;

use crate::linalg::Matrix;
use crate::problem::Problem;

/// The outcome of one solve call.
///
/// Expected conditions (unbounded, infeasible, iteration/node caps) are
/// reported through the flags, never as errors; only unrecoverable numeric
/// failures surface as a `SolveError`. A result is created fresh per solve
/// and not mutated afterwards.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Values of the original decision variables (length n).
    pub solution: Vec<f64>,
    /// Objective value in the problem's own sense.
    pub objective: f64,
    pub is_optimal: bool,
    pub is_unbounded: bool,
    /// Set by re-substituting the solution into the original constraints.
    pub is_feasible: bool,
    /// Reduced costs over the original and slack columns (length n+m),
    /// in the internal maximization convention (`c_j - z_j`).
    pub reduced_costs: Vec<f64>,
    /// Final tableau, m x (n+m+1): original columns, slack columns, RHS.
    /// Populated only by the tableau solver.
    pub final_tableau: Option<Matrix>,
    /// Variable index occupying each tableau row. Populated with the tableau.
    pub final_basis: Option<Vec<usize>>,
    /// Iteration-by-iteration solve log.
    pub log: String,
}

impl SolveResult {
    pub fn new(num_variables: usize) -> Self {
        Self {
            solution: vec![0.0; num_variables],
            objective: 0.0,
            is_optimal: false,
            is_unbounded: false,
            is_feasible: false,
            reduced_costs: Vec::new(),
            final_tableau: None,
            final_basis: None,
            log: String::new(),
        }
    }

    /// Re-substitutes the solution into the original constraints, logging
    /// each check and setting the feasibility flag. This runs after every
    /// successful solve, independently of the algebra that produced the
    /// solution.
    pub fn verify_feasibility(&mut self, problem: &Problem, tol: f64) {
        let _ = writeln!(self.log, "\n--- Feasibility Check ---");
        let mut all_ok = true;
        for (i, con) in problem.constraints.iter().enumerate() {
            let lhs = con.lhs(&self.solution);
            if con.is_satisfied(&self.solution, tol) {
                let _ = writeln!(
                    self.log,
                    "Constraint {} is satisfied: {} {} {}",
                    i + 1,
                    lhs,
                    con.relation,
                    con.rhs
                );
            } else {
                let _ = writeln!(
                    self.log,
                    "Constraint {} is VIOLATED: {} {} {}",
                    i + 1,
                    lhs,
                    con.relation,
                    con.rhs
                );
                all_ok = false;
            }
        }
        if all_ok {
            let _ = writeln!(self.log, "All constraints are satisfied.");
        } else {
            let _ = writeln!(self.log, "WARNING: Solution is not feasible.");
        }
        self.is_feasible = all_ok;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Relation, Sense};

    #[test]
    fn test_verify_feasibility_flags_violations() {
        let problem = Problem::new(vec![1.0, 1.0], Sense::Maximize)
            .with_constraint(vec![1.0, 0.0], Relation::Le, 3.0)
            .unwrap()
            .with_constraint(vec![0.0, 1.0], Relation::Ge, 2.0)
            .unwrap();

        let mut ok = SolveResult::new(2);
        ok.solution = vec![3.0, 2.0];
        ok.verify_feasibility(&problem, 1e-9);
        assert!(ok.is_feasible);
        assert!(ok.log.contains("All constraints are satisfied."));

        let mut bad = SolveResult::new(2);
        bad.solution = vec![4.0, 0.0];
        bad.verify_feasibility(&problem, 1e-9);
        assert!(!bad.is_feasible);
        assert!(bad.log.contains("Constraint 1 is VIOLATED"));
        assert!(bad.log.contains("Constraint 2 is VIOLATED"));
    }
}
