use std::fmt::Write as _;

use crate::problem::{Problem, Relation};
use crate::solution::SolveResult;
use crate::{SolveError, Solver};

const CELL_WIDTH: usize = 10;

/// Full-tableau primal simplex solver.
///
/// Columns `[0, n)` hold the original variables, `[n, n+m)` one slack or
/// surplus column per constraint row, artificial columns follow when a row
/// needs one, and the last column is the right-hand side. A two-phase pass
/// drives artificial variables out before the real objective is optimized
/// with Dantzig's rule.
pub struct TableauSimplex {
    /// Iteration budget shared by both phases; hitting it is a hard stop,
    /// not an error.
    max_iterations: usize,
    /// Tolerance for floating point comparisons.
    tolerance: f64,
}

impl Default for TableauSimplex {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-9,
        }
    }
}

impl TableauSimplex {
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

    fn run(&self, problem: &Problem) -> SolveResult {
        let n = problem.num_variables();
        let mut result = SolveResult::new(n);
        let _ = writeln!(result.log, "=== Primal Simplex Solution ===");

        let mut tableau = Tableau::build(problem);
        let mut budget = self.max_iterations;

        if tableau.n_artificial > 0 {
            let _ = writeln!(
                result.log,
                "--- Phase 1: driving {} artificial variable(s) out ---",
                tableau.n_artificial
            );
            match self.phase1(&mut tableau, &mut result.log, &mut budget) {
                PhaseOutcome::Done => {
                    let _ = writeln!(result.log, "--- Phase 1 Complete ---\n");
                }
                PhaseOutcome::Infeasible => {
                    let _ = writeln!(result.log, "--- INFEASIBLE PROBLEM ---");
                    let _ = writeln!(
                        result.log,
                        "Artificial variables remain positive; no feasible point exists."
                    );
                    result.is_feasible = false;
                    return result;
                }
                PhaseOutcome::CapReached => {
                    self.finish_cap_reached(&tableau, problem, &mut result);
                    return result;
                }
                PhaseOutcome::Unbounded => unreachable!("phase 1 objective is bounded below"),
            }
        }

        match self.phase2(&mut tableau, &mut result.log, &mut budget) {
            PhaseOutcome::Done => self.finish_optimal(&tableau, problem, &mut result),
            PhaseOutcome::Unbounded => {
                result.is_unbounded = true;
                let _ = writeln!(result.log, "--- UNBOUNDED PROBLEM ---");
                let _ = writeln!(
                    result.log,
                    "The entering column has no positive entries; the objective is unbounded."
                );
            }
            PhaseOutcome::CapReached => self.finish_cap_reached(&tableau, problem, &mut result),
            PhaseOutcome::Infeasible => unreachable!("phase 2 does not test feasibility"),
        }
        result
    }

    /// Auxiliary objective: maximize minus the sum of artificial variables.
    fn phase1(&self, t: &mut Tableau, log: &mut String, budget: &mut usize) -> PhaseOutcome {
        let obj_row = t.m;
        let n_cols = t.num_cols();
        let art_start = t.n + t.m;

        let saved_objective = t.data[obj_row].clone();
        for cell in t.data[obj_row].iter_mut() {
            *cell = 0.0;
        }
        for j in art_start..art_start + t.n_artificial {
            t.data[obj_row][j] = -1.0;
        }
        // Cancel the -1 entries of artificials that start basic.
        for i in 0..t.m {
            if t.basis[i] >= art_start {
                for j in 0..n_cols {
                    t.data[obj_row][j] = t.data[obj_row][j] + t.data[i][j];
                }
            }
        }

        let mut iter = 0;
        loop {
            if *budget == 0 {
                return PhaseOutcome::CapReached;
            }
            let Some(entering) = t.entering_column(n_cols - 1, self.tolerance) else {
                break;
            };
            let Some(leaving) = t.ratio_test(entering, self.tolerance) else {
                // A positive phase-1 reduced cost with no blocking row can
                // only happen when no feasible point exists.
                return PhaseOutcome::Infeasible;
            };
            iter += 1;
            *budget -= 1;
            let _ = writeln!(log, "--- Phase 1: Iteration {iter} ---");
            let _ = writeln!(
                log,
                "Entering Variable: {}, Leaving Variable: {}\n",
                t.var_name(entering),
                t.var_name(t.basis[leaving])
            );
            t.pivot(leaving, entering);
        }

        // All artificials must sit at zero.
        let rhs_col = n_cols - 1;
        for i in 0..t.m {
            if t.basis[i] >= art_start && t.data[i][rhs_col].abs() > self.tolerance {
                return PhaseOutcome::Infeasible;
            }
        }

        // Pivot zero-level artificials out of the basis where a structural
        // column is available, so the final basis indexes real variables.
        for i in 0..t.m {
            if t.basis[i] < art_start {
                continue;
            }
            if let Some(j) = (0..art_start).find(|&j| t.data[i][j].abs() > self.tolerance) {
                t.pivot(i, j);
            }
        }

        // Restore the real objective and price out the basic columns.
        t.data[obj_row] = saved_objective;
        for i in 0..t.m {
            let factor = t.data[obj_row][t.basis[i]];
            if factor.abs() > self.tolerance {
                for j in 0..n_cols {
                    t.data[obj_row][j] -= factor * t.data[i][j];
                }
            }
        }
        PhaseOutcome::Done
    }

    fn phase2(&self, t: &mut Tableau, log: &mut String, budget: &mut usize) -> PhaseOutcome {
        // Artificial columns never re-enter.
        let eligible = t.n + t.m;
        let mut iter = 0;
        loop {
            if *budget == 0 {
                return PhaseOutcome::CapReached;
            }
            iter += 1;
            let _ = writeln!(log, "--- Iteration {iter} ---");
            log.push_str(&t.render());

            let Some(entering) = t.entering_column(eligible, self.tolerance) else {
                return PhaseOutcome::Done;
            };
            let Some(leaving) = t.ratio_test(entering, self.tolerance) else {
                return PhaseOutcome::Unbounded;
            };
            *budget -= 1;
            let _ = writeln!(
                log,
                "Entering Variable: {}\nLeaving Variable: {}\n",
                t.var_name(entering),
                t.var_name(t.basis[leaving])
            );
            t.pivot(leaving, entering);
        }
    }

    fn finish_optimal(&self, t: &Tableau, problem: &Problem, result: &mut SolveResult) {
        result.solution = t.solution();
        result.objective = problem.objective_value(&result.solution);
        result.reduced_costs = t.reduced_costs();
        result.final_tableau = Some(t.export());
        result.final_basis = Some(t.basis.clone());
        result.is_optimal = true;

        let _ = writeln!(result.log, "\n=== Optimal Solution Found ===");
        let _ = writeln!(result.log, "Objective Value = {}", result.objective);
        for (j, v) in result.solution.iter().enumerate() {
            let _ = writeln!(result.log, "x{} = {}", j + 1, v);
        }
        result.verify_feasibility(problem, self.tolerance);
    }

    fn finish_cap_reached(&self, t: &Tableau, problem: &Problem, result: &mut SolveResult) {
        let _ = writeln!(result.log, "--- ITERATION LIMIT REACHED ---");
        let _ = writeln!(
            result.log,
            "Returning the state after {} iterations; the solution is not proven optimal.",
            self.max_iterations
        );
        result.solution = t.solution();
        result.objective = problem.objective_value(&result.solution);
        result.reduced_costs = t.reduced_costs();
        result.is_optimal = false;
        result.verify_feasibility(problem, self.tolerance);
    }
}

impl Solver for TableauSimplex {
    fn solve(&self, problem: &Problem) -> Result<SolveResult, SolveError> {
        Ok(self.run(problem))
    }
}

enum PhaseOutcome {
    Done,
    Infeasible,
    Unbounded,
    CapReached,
}

/// The working tableau: m constraint rows plus the objective row, with the
/// current reduced costs (`Cj-Zj`) held in the objective row.
struct Tableau {
    data: Vec<Vec<f64>>,
    /// Variable index occupying each constraint row.
    basis: Vec<usize>,
    n: usize,
    m: usize,
    n_artificial: usize,
}

impl Tableau {
    fn build(problem: &Problem) -> Self {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        // Normalize rows to a non-negative RHS, flipping the relation when
        // a row is negated, then count the artificials that are needed.
        let mut rows: Vec<(Vec<f64>, Relation, f64)> = problem
            .constraints
            .iter()
            .map(|c| (c.coefficients.clone(), c.relation, c.rhs))
            .collect();
        for (coeffs, relation, rhs) in rows.iter_mut() {
            if *rhs < 0.0 {
                for a in coeffs.iter_mut() {
                    *a = -*a;
                }
                *rhs = -*rhs;
                *relation = match *relation {
                    Relation::Le => Relation::Ge,
                    Relation::Ge => Relation::Le,
                    Relation::Eq => Relation::Eq,
                };
            }
        }
        let n_artificial = rows
            .iter()
            .filter(|(_, rel, _)| *rel != Relation::Le)
            .count();

        let total_cols = n + m + n_artificial + 1;
        let mut data = vec![vec![0.0; total_cols]; m + 1];
        let mut basis = vec![0usize; m];

        let mut next_artificial = n + m;
        for (i, (coeffs, relation, rhs)) in rows.iter().enumerate() {
            data[i][..n].copy_from_slice(coeffs);
            data[i][total_cols - 1] = *rhs;
            match relation {
                Relation::Le => {
                    data[i][n + i] = 1.0;
                    basis[i] = n + i;
                }
                Relation::Ge => {
                    data[i][n + i] = -1.0; // surplus
                    data[i][next_artificial] = 1.0;
                    basis[i] = next_artificial;
                    next_artificial += 1;
                }
                Relation::Eq => {
                    // The slack column n+i stays zero for an equality row.
                    data[i][next_artificial] = 1.0;
                    basis[i] = next_artificial;
                    next_artificial += 1;
                }
            }
        }

        // Objective row: internally always maximize.
        for (j, &c) in problem.objective.iter().enumerate() {
            data[m][j] = if problem.is_maximize() { c } else { -c };
        }

        Self {
            data,
            basis,
            n,
            m,
            n_artificial,
        }
    }

    fn num_cols(&self) -> usize {
        self.data[0].len()
    }

    fn rhs_col(&self) -> usize {
        self.num_cols() - 1
    }

    /// Dantzig's rule: the most positive reduced cost among the first
    /// `eligible` columns, first index on ties. `None` means optimal.
    fn entering_column(&self, eligible: usize, tol: f64) -> Option<usize> {
        let obj = &self.data[self.m];
        let mut best = tol;
        let mut col = None;
        for j in 0..eligible {
            if obj[j] > best {
                best = obj[j];
                col = Some(j);
            }
        }
        col
    }

    /// Minimum-ratio test over positive pivot-column entries, first row on
    /// ties. `None` means the column is unbounded.
    fn ratio_test(&self, col: usize, tol: f64) -> Option<usize> {
        let rhs_col = self.rhs_col();
        let mut min_ratio = f64::INFINITY;
        let mut row = None;
        for i in 0..self.m {
            let v = self.data[i][col];
            if v > tol {
                let ratio = self.data[i][rhs_col] / v;
                if ratio < min_ratio {
                    min_ratio = ratio;
                    row = Some(i);
                }
            }
        }
        row
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_cols = self.num_cols();
        self.basis[row] = col;

        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }
        for i in 0..self.data.len() {
            if i == row {
                continue;
            }
            let factor = self.data[i][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n_cols {
                self.data[i][j] -= factor * self.data[row][j];
            }
        }
    }

    fn var_name(&self, j: usize) -> String {
        if j < self.n {
            format!("x{}", j + 1)
        } else if j < self.n + self.m {
            format!("s{}", j - self.n + 1)
        } else {
            format!("a{}", j - self.n - self.m + 1)
        }
    }

    /// Values of the original variables in the current basic solution.
    fn solution(&self) -> Vec<f64> {
        let rhs_col = self.rhs_col();
        let mut x = vec![0.0; self.n];
        for i in 0..self.m {
            if self.basis[i] < self.n {
                x[self.basis[i]] = self.data[i][rhs_col];
            }
        }
        x
    }

    /// Current reduced costs over the original and slack columns.
    fn reduced_costs(&self) -> Vec<f64> {
        self.data[self.m][..self.n + self.m].to_vec()
    }

    /// Final tableau for downstream sensitivity analysis: the constraint
    /// rows over original + slack columns plus the RHS, artificials dropped.
    fn export(&self) -> crate::linalg::Matrix {
        let rhs_col = self.rhs_col();
        let width = self.n + self.m + 1;
        let mut out = crate::linalg::Matrix::zeros(self.m, width);
        for i in 0..self.m {
            for j in 0..self.n + self.m {
                out[(i, j)] = self.data[i][j];
            }
            out[(i, width - 1)] = self.data[i][rhs_col];
        }
        out
    }

    /// ASCII rendering of the current tableau, Cj-Zj row included.
    fn render(&self) -> String {
        let n_cols = self.num_cols();
        let hline = {
            let mut s = String::from("+");
            for _ in 0..n_cols + 1 {
                s.push_str(&"-".repeat(CELL_WIDTH));
                s.push('+');
            }
            s.push('\n');
            s
        };
        let cell = |text: String| format!("{text:<CELL_WIDTH$}");
        let num = |v: f64| cell(format!("{:.3}", v));

        let mut out = hline.clone();
        out.push('|');
        out.push_str(&cell("Basis".to_string()));
        for j in 0..n_cols - 1 {
            out.push('|');
            out.push_str(&cell(self.var_name(j)));
        }
        out.push('|');
        out.push_str(&cell("RHS".to_string()));
        out.push_str("|\n");
        out.push_str(&hline);

        for i in 0..self.m {
            out.push('|');
            out.push_str(&cell(self.var_name(self.basis[i])));
            for j in 0..n_cols {
                out.push('|');
                out.push_str(&num(self.data[i][j]));
            }
            out.push_str("|\n");
        }
        out.push_str(&hline);
        out.push('|');
        out.push_str(&cell("Cj-Zj".to_string()));
        for j in 0..n_cols {
            out.push('|');
            out.push_str(&num(self.data[self.m][j]));
        }
        out.push_str("|\n");
        out.push_str(&hline);
        out
    }
}
