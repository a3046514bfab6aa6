use std::fmt;
use std::fmt::Write as _;

use crate::linalg::{dot, Matrix};
use crate::problem::Problem;
use crate::solution::SolveResult;
use crate::{SolveError, Solver};

/// Depth-first branch-and-bound over LP relaxations.
///
/// Every decision variable is restricted to integer values (pure-integer
/// search). Each node's relaxation is solved by a bounded revised simplex
/// after shifting variables so the node's lower bounds become the origin;
/// finite upper bounds are appended as extra `<=` rows. Nodes are pruned
/// when infeasible, unbounded, or when their relaxation bound cannot
/// strictly improve the incumbent.
pub struct BranchAndBound {
    tolerance: f64,
    max_nodes: usize,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            max_nodes: 10_000,
        }
    }
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }
}

/// One entry of the search frontier: per-variable bounds and depth. Nodes
/// are owned exclusively by the stack; branching allocates fresh children.
struct Node {
    lower: Vec<f64>,
    upper: Vec<f64>,
    depth: usize,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |v: &f64| {
            if v.is_infinite() {
                if *v > 0.0 { "+inf".to_string() } else { "-inf".to_string() }
            } else {
                v.to_string()
            }
        };
        let lb: Vec<String> = self.lower.iter().map(fmt_bound).collect();
        let ub: Vec<String> = self.upper.iter().map(fmt_bound).collect();
        write!(
            f,
            "Depth={} | L=[{}] | U=[{}]",
            self.depth,
            lb.join(", "),
            ub.join(", ")
        )
    }
}

enum Relaxation {
    Optimal { objective: f64, x: Vec<f64> },
    Infeasible,
    Unbounded,
}

impl Solver for BranchAndBound {
    fn solve(&self, problem: &Problem) -> Result<SolveResult, SolveError> {
        let n = problem.num_variables();
        let tol = self.tolerance;

        let mut result = SolveResult::new(n);
        let _ = writeln!(result.log, "=== Branch & Bound (Simplex-based) ===");

        // Internal maximization form.
        let mut costs = problem.objective.clone();
        if !problem.is_maximize() {
            for c in costs.iter_mut() {
                *c = -*c;
            }
        }
        let rows: Vec<Vec<f64>> = problem
            .constraints
            .iter()
            .map(|c| c.coefficients.clone())
            .collect();
        let rhs: Vec<f64> = problem.constraints.iter().map(|c| c.rhs).collect();

        let mut best_objective = f64::NEG_INFINITY;
        let mut best_x: Option<Vec<f64>> = None;

        let mut stack = vec![Node {
            lower: vec![0.0; n],
            upper: vec![f64::INFINITY; n],
            depth: 0,
        }];

        let mut explored = 0;
        while let Some(node) = stack.pop() {
            if explored >= self.max_nodes {
                let _ = writeln!(result.log, "--- NODE LIMIT REACHED ---");
                break;
            }
            explored += 1;
            let _ = writeln!(result.log, "-- Node {explored} :: {node}");

            let relaxation =
                self.solve_relaxation(&costs, &rows, &rhs, &node.lower, &node.upper)?;
            let (objective, x) = match relaxation {
                Relaxation::Infeasible => {
                    let _ = writeln!(result.log, "  -> Infeasible. Prune.");
                    continue;
                }
                Relaxation::Unbounded => {
                    let _ = writeln!(result.log, "  -> Unbounded relaxation. Prune.");
                    continue;
                }
                Relaxation::Optimal { objective, x } => (objective, x),
            };
            let _ = writeln!(result.log, "  LP value = {objective} | x = {x:?}");

            // Bounding rule: a relaxation that cannot strictly improve the
            // incumbent closes the whole subtree.
            if objective <= best_objective + tol {
                let _ = writeln!(result.log, "  -> Bound not improving incumbent. Prune.");
                continue;
            }

            // Branch variable: largest fractional part.
            let mut branch_var = None;
            let mut max_fraction = 0.0;
            for (j, &v) in x.iter().enumerate() {
                let fraction = (v - v.round()).abs();
                if fraction > tol && fraction > max_fraction {
                    max_fraction = fraction;
                    branch_var = Some(j);
                }
            }

            let Some(j) = branch_var else {
                best_objective = objective;
                best_x = Some(x);
                let _ = writeln!(result.log, "  -> Integer feasible. Update incumbent.");
                continue;
            };

            let value = x[j];
            let floor = value.floor();
            let ceil = value.ceil();
            let _ = writeln!(
                result.log,
                "  Branch on x{0} = {value} => x{0} <= {floor}  OR  x{0} >= {ceil}",
                j + 1
            );

            // Down branch: tighten the upper bound to the floor.
            if floor >= 0.0 {
                let mut upper = node.upper.clone();
                upper[j] = upper[j].min(floor);
                stack.push(Node {
                    lower: node.lower.clone(),
                    upper,
                    depth: node.depth + 1,
                });
            }
            // Up branch: tighten the lower bound to the ceiling. Pushed last
            // so LIFO order explores the round-up branch first.
            let mut lower = node.lower.clone();
            lower[j] = lower[j].max(ceil);
            stack.push(Node {
                lower,
                upper: node.upper.clone(),
                depth: node.depth + 1,
            });
        }

        let _ = writeln!(result.log);
        match best_x {
            None => {
                let _ = writeln!(
                    result.log,
                    "*** No integer-feasible solution found (within node/search limits). ***"
                );
            }
            Some(x) => {
                result.objective = problem.objective_value(&x);
                result.solution = x;
                result.is_optimal = true;
                let _ = writeln!(result.log, "*** Best integer solution ***");
                let _ = writeln!(result.log, "Objective = {}", result.objective);
                for (j, v) in result.solution.iter().enumerate() {
                    let _ = writeln!(result.log, "x{} = {}", j + 1, v);
                }
                // The incumbent is re-verified against the original rows;
                // violations are logged but do not change the reported
                // solution.
                result.verify_feasibility(problem, tol);
            }
        }
        let _ = writeln!(result.log, "Nodes explored: {explored}");
        Ok(result)
    }
}

impl BranchAndBound {
    /// Solves the node relaxation after the shift `y = x - L` (so `y >= 0`),
    /// appending rows `y_j <= U_j - L_j` for each finite upper bound.
    fn solve_relaxation(
        &self,
        costs: &[f64],
        rows: &[Vec<f64>],
        rhs: &[f64],
        lower: &[f64],
        upper: &[f64],
    ) -> Result<Relaxation, SolveError> {
        let n = costs.len();
        let m = rows.len();

        // A x <= b becomes A y <= b - A L.
        let mut shifted_rhs = Vec::with_capacity(m);
        for i in 0..m {
            let shifted = rhs[i] - dot(&rows[i], lower);
            if shifted < -1e-10 {
                return Ok(Relaxation::Infeasible);
            }
            shifted_rhs.push(shifted);
        }

        let mut all_rows: Vec<Vec<f64>> = rows.to_vec();
        for j in 0..n {
            if upper[j].is_infinite() {
                continue;
            }
            let bound = upper[j] - lower[j];
            if bound < -1e-12 {
                return Ok(Relaxation::Infeasible);
            }
            let mut row = vec![0.0; n];
            row[j] = 1.0;
            all_rows.push(row);
            shifted_rhs.push(bound);
        }

        match self.bounded_max(&all_rows, &shifted_rhs, costs)? {
            Relaxation::Optimal { objective, x } => {
                let x: Vec<f64> = x.iter().zip(lower).map(|(y, l)| y + l).collect();
                Ok(Relaxation::Optimal {
                    objective: objective + dot(costs, lower),
                    x,
                })
            }
            other => Ok(other),
        }
    }

    /// Revised simplex for `max c^T y, A y <= b, y >= 0`, returning only the
    /// numeric solution. The iteration cap prunes the node like an unbounded
    /// relaxation would.
    fn bounded_max(
        &self,
        rows: &[Vec<f64>],
        rhs: &[f64],
        costs: &[f64],
    ) -> Result<Relaxation, SolveError> {
        let tol = self.tolerance;
        let m = rows.len();
        let n = costs.len();

        for &b in rhs {
            if b < -1e-12 {
                return Ok(Relaxation::Infeasible);
            }
        }

        let total = n + m;
        let mut aug = Matrix::zeros(m, total);
        for (i, row) in rows.iter().enumerate() {
            for (j, &a) in row.iter().enumerate() {
                aug[(i, j)] = a;
            }
            aug[(i, n + i)] = 1.0;
        }
        let mut full_costs = vec![0.0; total];
        full_costs[..n].copy_from_slice(costs);

        let mut basis: Vec<usize> = (n..total).collect();
        let max_iterations = 2000;

        for _ in 0..max_iterations {
            let basis_inverse = aug.columns(&basis).invert()?;
            let basic_costs: Vec<f64> = basis.iter().map(|&j| full_costs[j]).collect();
            let pi = basis_inverse.mul_transposed(&basic_costs);

            let mut entering = None;
            let mut best = tol;
            for j in 0..total {
                if basis.contains(&j) {
                    continue;
                }
                let mut pi_aj = 0.0;
                for i in 0..m {
                    pi_aj += pi[i] * aug[(i, j)];
                }
                let reduced = full_costs[j] - pi_aj;
                if reduced > best {
                    best = reduced;
                    entering = Some(j);
                }
            }

            let basic_values = basis_inverse.mul_vector(rhs);
            let Some(entering) = entering else {
                for &v in &basic_values {
                    if v < -1e-9 {
                        return Ok(Relaxation::Infeasible);
                    }
                }
                let mut x = vec![0.0; n];
                for (i, &var) in basis.iter().enumerate() {
                    if var < n {
                        x[var] = basic_values[i];
                    }
                }
                return Ok(Relaxation::Optimal {
                    objective: dot(costs, &x),
                    x,
                });
            };

            let direction = basis_inverse.mul_vector(&aug.column(entering));
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
            match leaving {
                Some(i) => basis[i] = entering,
                None => return Ok(Relaxation::Unbounded),
            }
        }
        Ok(Relaxation::Unbounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Relation, Sense};
    use crate::simplex::TableauSimplex;

    fn fractional_problem() -> Problem {
        // LP optimum at x = (3, 1.5), objective 21; integers do worse.
        Problem::new(vec![5.0, 4.0], Sense::Maximize)
            .with_constraint(vec![6.0, 4.0], Relation::Le, 24.0)
            .unwrap()
            .with_constraint(vec![1.0, 2.0], Relation::Le, 6.0)
            .unwrap()
    }

    #[test]
    fn test_integer_optimum() {
        let r = BranchAndBound::new().solve(&fractional_problem()).unwrap();
        assert!(r.is_optimal);
        assert!(r.is_feasible);
        for v in &r.solution {
            assert!((v - v.round()).abs() < 1e-6, "non-integer value {v}");
        }
        // Known integer optimum: x = (4, 0), objective 20.
        assert!((r.objective - 20.0).abs() < 1e-6, "obj = {}", r.objective);
    }

    #[test]
    fn test_incumbent_never_beats_root_relaxation() {
        let p = fractional_problem();
        let relaxed = TableauSimplex::new().solve(&p).unwrap();
        let integer = BranchAndBound::new().solve(&p).unwrap();
        assert!(integer.objective <= relaxed.objective + 1e-6);
    }

    #[test]
    fn test_minimization_sign_restored() {
        // Minimizing the negated objective mirrors the maximize case: the
        // incumbent is x = (4, 0) and the reported objective is -20.
        let p = Problem::new(vec![-5.0, -4.0], Sense::Minimize)
            .with_constraint(vec![6.0, 4.0], Relation::Le, 24.0)
            .unwrap()
            .with_constraint(vec![1.0, 2.0], Relation::Le, 6.0)
            .unwrap();
        let r = BranchAndBound::new().solve(&p).unwrap();
        assert!(r.is_optimal);
        assert!((r.objective + 20.0).abs() < 1e-6, "obj = {}", r.objective);
    }

    #[test]
    fn test_infeasible_bounds_prune_everything() {
        // 2x <= 1 with x integer and x >= 1 forced through the constraint
        // x >= 0.6 (as -x <= -0.6): only x = 0 fails it, x >= 1 fails 2x <= 1.
        let p = Problem::new(vec![1.0], Sense::Maximize)
            .with_constraint(vec![2.0], Relation::Le, 1.0)
            .unwrap()
            .with_constraint(vec![-1.0], Relation::Le, -0.6)
            .unwrap();
        let r = BranchAndBound::new().solve(&p).unwrap();
        assert!(!r.is_optimal);
        assert!(r.log.contains("No integer-feasible solution"));
    }

    #[test]
    fn test_node_cap_returns_partial_result() {
        let r = BranchAndBound::new()
            .with_max_nodes(1)
            .solve(&fractional_problem())
            .unwrap();
        // One node is only enough to branch, not to find an incumbent.
        assert!(!r.is_optimal);
        assert!(r.log.contains("NODE LIMIT REACHED"));
    }
}
