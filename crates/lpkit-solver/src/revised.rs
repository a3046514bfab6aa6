use std::fmt::Write as _;

use crate::linalg::Matrix;
use crate::problem::Problem;
use crate::solution::SolveResult;
use crate::{SolveError, Solver};

/// Revised primal simplex solver.
///
/// Keeps only the basis index set and recomputes the basis inverse from
/// scratch through the kernel each iteration, so no full tableau is stored.
/// That is O(m^3) per step, acceptable at the problem sizes in scope.
/// Entering/leaving selection matches [`crate::TableauSimplex`], but the
/// result carries no final tableau or basis, so sensitivity analysis is not
/// available on its output.
pub struct RevisedSimplex {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for RevisedSimplex {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-9,
        }
    }
}

impl RevisedSimplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }
}

impl Solver for RevisedSimplex {
    fn solve(&self, problem: &Problem) -> Result<SolveResult, SolveError> {
        let n = problem.num_variables();
        let m = problem.num_constraints();
        let tol = self.tolerance;

        let mut result = SolveResult::new(n);
        let _ = writeln!(result.log, "=== Revised Primal Simplex Solution ===");

        // Augmented system [A | I] with slack costs of zero; minimization is
        // handled by negating the objective internally.
        let mut aug = Matrix::zeros(m, n + m);
        for (i, con) in problem.constraints.iter().enumerate() {
            for (j, &a) in con.coefficients.iter().enumerate() {
                aug[(i, j)] = a;
            }
            aug[(i, n + i)] = 1.0;
        }
        let b: Vec<f64> = problem.constraints.iter().map(|c| c.rhs).collect();
        let mut costs = vec![0.0; n + m];
        for (j, &c) in problem.objective.iter().enumerate() {
            costs[j] = if problem.is_maximize() { c } else { -c };
        }

        let mut basis: Vec<usize> = (n..n + m).collect();

        for iter in 1..=self.max_iterations {
            let _ = writeln!(result.log, "--- Revised Simplex Iteration {iter} ---");

            let basis_matrix = aug.columns(&basis);
            let basis_inverse = basis_matrix.invert()?;
            let basic_costs: Vec<f64> = basis.iter().map(|&j| costs[j]).collect();

            // Price-out vector pi = c_B^T B^-1, then r_j = c_j - pi . a_j.
            let pi = basis_inverse.mul_transposed(&basic_costs);
            let _ = writeln!(result.log, "Price-out (pi = c_B^T * B^-1): {pi:?}");

            let mut reduced = vec![0.0; n + m];
            for j in 0..n + m {
                if basis.contains(&j) {
                    continue;
                }
                let mut pi_aj = 0.0;
                for i in 0..m {
                    pi_aj += pi[i] * aug[(i, j)];
                }
                reduced[j] = costs[j] - pi_aj;
            }
            let _ = writeln!(result.log, "Reduced costs (c_j - pi*a_j): {reduced:?}");
            result.reduced_costs = reduced.clone();

            let mut entering = None;
            let mut best = tol;
            for (j, &r) in reduced.iter().enumerate() {
                if r > best {
                    best = r;
                    entering = Some(j);
                }
            }

            let Some(entering) = entering else {
                let basic_values = basis_inverse.mul_vector(&b);
                for (i, &var) in basis.iter().enumerate() {
                    if var < n {
                        result.solution[var] = basic_values[i];
                    }
                }
                result.objective = problem.objective_value(&result.solution);
                result.is_optimal = true;

                let _ = writeln!(result.log, "Optimal solution found.");
                let _ = writeln!(result.log, "Objective = {}", result.objective);
                for (j, v) in result.solution.iter().enumerate() {
                    let _ = writeln!(result.log, "x{} = {}", j + 1, v);
                }
                result.verify_feasibility(problem, tol);
                return Ok(result);
            };

            // Direction d = B^-1 a_enter; ratio test against current basics.
            let entering_column = aug.column(entering);
            let direction = basis_inverse.mul_vector(&entering_column);
            let basic_values = basis_inverse.mul_vector(&b);

            let mut min_ratio = f64::INFINITY;
            let mut leaving = None;
            for i in 0..m {
                if direction[i] > tol {
                    let ratio = basic_values[i] / direction[i];
                    if ratio < min_ratio {
                        min_ratio = ratio;
                        leaving = Some(i);
                    }
                }
            }
            let Some(leaving) = leaving else {
                result.is_unbounded = true;
                let _ = writeln!(
                    result.log,
                    "Problem is unbounded (no positive entries in direction)."
                );
                return Ok(result);
            };

            let _ = writeln!(
                result.log,
                "Entering: {}, leaving basis row {} (step length {min_ratio})",
                var_name(entering, n),
                leaving
            );
            basis[leaving] = entering;
        }

        let _ = writeln!(result.log, "--- ITERATION LIMIT REACHED ---");
        result.is_optimal = false;
        let basis_inverse = aug.columns(&basis).invert()?;
        let basic_values = basis_inverse.mul_vector(&b);
        for (i, &var) in basis.iter().enumerate() {
            if var < n {
                result.solution[var] = basic_values[i];
            }
        }
        result.objective = problem.objective_value(&result.solution);
        result.verify_feasibility(problem, tol);
        Ok(result)
    }
}

fn var_name(j: usize, n: usize) -> String {
    if j < n {
        format!("x{}", j + 1)
    } else {
        format!("s{}", j - n + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Relation, Sense};
    use crate::simplex::TableauSimplex;

    fn sample_problem() -> Problem {
        Problem::new(vec![60.0, 30.0, 20.0], Sense::Maximize)
            .with_constraint(vec![8.0, 6.0, 1.0], Relation::Le, 48.0)
            .unwrap()
            .with_constraint(vec![4.0, 2.0, 1.5], Relation::Le, 20.0)
            .unwrap()
    }

    #[test]
    fn test_textbook_maximization() {
        let r = RevisedSimplex::new().solve(&sample_problem()).unwrap();
        assert!(r.is_optimal);
        assert!(r.is_feasible);
        assert!((r.objective - 300.0).abs() < 1e-6);
        assert!((r.solution[0] - 5.0).abs() < 1e-6);
        // No tableau artifacts from the revised path.
        assert!(r.final_tableau.is_none());
        assert!(r.final_basis.is_none());
    }

    #[test]
    fn test_agrees_with_tableau_solver() {
        let problems = vec![
            sample_problem(),
            Problem::new(vec![3.0, 2.0], Sense::Maximize)
                .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
                .unwrap()
                .with_constraint(vec![1.0, 0.0], Relation::Le, 3.0)
                .unwrap(),
            Problem::new(vec![5.0, 4.0, 3.0], Sense::Maximize)
                .with_constraint(vec![2.0, 3.0, 1.0], Relation::Le, 5.0)
                .unwrap()
                .with_constraint(vec![4.0, 1.0, 2.0], Relation::Le, 11.0)
                .unwrap()
                .with_constraint(vec![3.0, 4.0, 2.0], Relation::Le, 8.0)
                .unwrap(),
        ];
        for p in problems {
            let a = TableauSimplex::new().solve(&p).unwrap();
            let b = RevisedSimplex::new().solve(&p).unwrap();
            assert!(a.is_optimal && b.is_optimal);
            assert!(
                (a.objective - b.objective).abs() < 1e-6,
                "tableau {} vs revised {}",
                a.objective,
                b.objective
            );
        }
    }

    #[test]
    fn test_unbounded() {
        let p = Problem::new(vec![1.0, 1.0], Sense::Maximize)
            .with_constraint(vec![1.0, -1.0], Relation::Le, 1.0)
            .unwrap();
        let r = RevisedSimplex::new().solve(&p).unwrap();
        assert!(r.is_unbounded);
        assert!(!r.is_optimal);
    }

    #[test]
    fn test_minimization_sign() {
        // min -3x with x <= 4 -> x = 4, obj = -12 in the original sense.
        let p = Problem::new(vec![-3.0], Sense::Minimize)
            .with_constraint(vec![1.0], Relation::Le, 4.0)
            .unwrap();
        let r = RevisedSimplex::new().solve(&p).unwrap();
        assert!(r.is_optimal);
        assert!((r.solution[0] - 4.0).abs() < 1e-6);
        assert!((r.objective + 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_iteration_cap() {
        let r = RevisedSimplex::new()
            .with_max_iterations(1)
            .solve(&sample_problem())
            .unwrap();
        assert!(!r.is_optimal);
        assert!(r.log.contains("ITERATION LIMIT REACHED"));
    }
}
