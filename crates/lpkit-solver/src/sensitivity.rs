use std::fmt;
use thiserror::Error;

use crate::linalg::Matrix;
use crate::problem::{Problem, Relation, Sense};
use crate::simplex::TableauSimplex;
use crate::solution::SolveResult;
use crate::{SolveError, Solver};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("cannot perform analysis: no optimal solution found")]
    NotOptimal,
    #[error("result carries no final tableau/basis; solve with the tableau simplex")]
    MissingTableau,
    #[error("index {0} is out of bounds for this problem")]
    IndexOutOfRange(usize),
    #[error("index {0} points to a constraint coefficient; ranging for a_ij values is not supported")]
    CoefficientIndex(usize),
    #[error("dual construction requires a maximize/<= or minimize/>= problem")]
    UnsupportedDual,
    #[error("solving the dual failed: {0}")]
    DualSolve(#[from] SolveError),
}

/// An allowable-increase/decrease interval around a current value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct RangeReport {
    pub label: String,
    pub current: f64,
    pub allowable_increase: f64,
    pub allowable_decrease: f64,
}

impl RangeReport {
    pub fn lower_bound(&self) -> f64 {
        self.current - self.allowable_decrease
    }

    pub fn upper_bound(&self) -> f64 {
        self.current + self.allowable_increase
    }
}

fn fmt_amount(v: f64) -> String {
    if v.is_infinite() {
        if v > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else {
        format!("{v:.3}")
    }
}

impl fmt::Display for RangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Sensitivity Analysis for {} ===", self.label)?;
        writeln!(f, "Current Value: {:.3}", self.current)?;
        writeln!(f, "Allowable Increase: {}", fmt_amount(self.allowable_increase))?;
        writeln!(f, "Allowable Decrease: {}", fmt_amount(self.allowable_decrease))?;
        write!(
            f,
            "Resulting Range: [{}, {}]",
            fmt_amount(self.lower_bound()),
            fmt_amount(self.upper_bound())
        )
    }
}

/// Marginal objective change per unit of RHS relaxation, one per constraint.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ShadowPrice {
    /// Constraint index, 0-based.
    pub constraint: usize,
    pub value: f64,
}

impl fmt::Display for ShadowPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Constraint {}'s shadow price is {:.3}",
            self.constraint + 1,
            self.value
        )
    }
}

/// The constructed dual, its independent solve, and the strong-duality check.
pub struct DualReport {
    pub primal: Problem,
    pub dual: Problem,
    pub dual_result: SolveResult,
    pub primal_objective: f64,
    pub strong_duality: bool,
}

impl fmt::Display for DualReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Duality Analysis ===")?;
        writeln!(f, "--- Primal Problem (P) ---")?;
        writeln!(f, "{}", self.primal)?;
        writeln!(f, "--- Dual Problem (D) ---")?;
        writeln!(f, "{}", self.dual)?;
        writeln!(f, "--- Dual Solution ---")?;
        writeln!(f, "Objective = {}", self.dual_result.objective)?;
        for (j, v) in self.dual_result.solution.iter().enumerate() {
            writeln!(f, "y{} = {}", j + 1, v)?;
        }
        writeln!(f, "--- Duality Check ---")?;
        if self.strong_duality {
            write!(
                f,
                "Primal ({}) = Dual ({}). Strong duality holds.",
                self.primal_objective, self.dual_result.objective
            )
        } else {
            write!(
                f,
                "WARNING: primal ({}) and dual ({}) objectives differ.",
                self.primal_objective, self.dual_result.objective
            )
        }
    }
}

/// Constructs the dual program. A maximize/all-`<=` primal yields a
/// minimize/all-`>=` dual (objective and RHS swapped, constraint matrix
/// transposed); the symmetric rule maps a minimize/all-`>=` primal back, so
/// taking the dual twice reproduces the primal.
pub fn dual_problem(primal: &Problem) -> Result<Problem, AnalysisError> {
    let (required, dual_sense, dual_relation) = match primal.sense {
        Sense::Maximize => (Relation::Le, Sense::Minimize, Relation::Ge),
        Sense::Minimize => (Relation::Ge, Sense::Maximize, Relation::Le),
    };
    if primal.constraints.iter().any(|c| c.relation != required) {
        return Err(AnalysisError::UnsupportedDual);
    }

    let rhs: Vec<f64> = primal.constraints.iter().map(|c| c.rhs).collect();
    let mut dual = Problem::new(rhs, dual_sense);
    for (j, &c) in primal.objective.iter().enumerate() {
        let column: Vec<f64> = primal
            .constraints
            .iter()
            .map(|con| con.coefficients[j])
            .collect();
        dual = dual
            .with_constraint(column, dual_relation, c)
            .expect("transposed row matches dual width");
    }
    Ok(dual)
}

/// Post-solution sensitivity analyzer.
///
/// Borrows a solved (problem, result) pair supplied by the caller; the
/// result must be optimal and carry the final tableau and basis, which only
/// the tableau simplex produces. Objective-coefficient ranges are derived
/// from the final reduced costs and tableau rows, RHS ranges from the slack
/// columns of the final tableau.
pub struct Analyzer<'a> {
    problem: &'a Problem,
    result: &'a SolveResult,
    tableau: &'a Matrix,
    basis: &'a [usize],
    tolerance: f64,
}

impl<'a> Analyzer<'a> {
    pub fn new(problem: &'a Problem, result: &'a SolveResult) -> Result<Self, AnalysisError> {
        if !result.is_optimal {
            return Err(AnalysisError::NotOptimal);
        }
        let (Some(tableau), Some(basis)) = (&result.final_tableau, &result.final_basis) else {
            return Err(AnalysisError::MissingTableau);
        };
        Ok(Self {
            problem,
            result,
            tableau,
            basis,
            tolerance: 1e-9,
        })
    }

    /// Objective-coefficient range for variable `j` (0-based), dispatching
    /// on whether the variable is basic in the final tableau.
    pub fn variable_range(&self, j: usize) -> Result<RangeReport, AnalysisError> {
        if j >= self.problem.num_variables() {
            return Err(AnalysisError::IndexOutOfRange(j + 1));
        }
        match self.basis.iter().position(|&b| b == j) {
            Some(row) => Ok(self.basic_range(j, row)),
            None => Ok(self.nonbasic_range(j)),
        }
    }

    /// A non-basic coefficient can rise by the magnitude of its reduced
    /// cost before the variable would enter the basis; it can fall forever.
    fn nonbasic_range(&self, j: usize) -> RangeReport {
        let increase = -self.result.reduced_costs[j];
        let (allowable_increase, allowable_decrease) =
            self.oriented(increase, f64::INFINITY);
        RangeReport {
            label: format!("Objective Coefficient of Non-Basic Variable x{}", j + 1),
            current: self.problem.objective[j],
            allowable_increase,
            allowable_decrease,
        }
    }

    /// For a basic variable in tableau row `r`, each non-basic column k
    /// keeps its reduced cost non-positive only while the coefficient moves
    /// less than |r_k / t_rk|: negative tableau entries bound the increase,
    /// positive entries the decrease.
    fn basic_range(&self, j: usize, row: usize) -> RangeReport {
        let columns = self.problem.num_variables() + self.problem.num_constraints();
        let mut increase = f64::INFINITY;
        let mut decrease = f64::INFINITY;
        for k in 0..columns {
            if self.basis.contains(&k) {
                continue;
            }
            let entry = self.tableau[(row, k)];
            if entry.abs() < self.tolerance {
                continue;
            }
            let reduced = self.result.reduced_costs[k];
            let ratio = reduced / entry;
            if entry < 0.0 {
                increase = increase.min(ratio);
            } else {
                decrease = decrease.min(-ratio);
            }
        }
        let (allowable_increase, allowable_decrease) = self.oriented(increase, decrease);
        RangeReport {
            label: format!("Objective Coefficient of Basic Variable x{}", j + 1),
            current: self.problem.objective[j],
            allowable_increase,
            allowable_decrease,
        }
    }

    /// Reduced costs live in the internal maximization form; for a
    /// minimization problem a bound on the internal coefficient mirrors to
    /// the opposite direction of the true coefficient.
    fn oriented(&self, increase: f64, decrease: f64) -> (f64, f64) {
        match self.problem.sense {
            Sense::Maximize => (increase, decrease),
            Sense::Minimize => (decrease, increase),
        }
    }

    /// Range over which constraint `i`'s RHS can move while every basic
    /// variable stays non-negative: a ratio test of the current basic
    /// values against the slack column of the final tableau.
    pub fn rhs_range(&self, i: usize) -> Result<RangeReport, AnalysisError> {
        let n = self.problem.num_variables();
        let m = self.problem.num_constraints();
        if i >= m {
            return Err(AnalysisError::IndexOutOfRange(i + 1));
        }
        let slack_col = n + i;
        let rhs_col = self.tableau.cols() - 1;

        let mut increase = f64::INFINITY;
        let mut decrease = f64::INFINITY;
        for r in 0..m {
            let entry = self.tableau[(r, slack_col)];
            if entry.abs() < self.tolerance {
                continue;
            }
            let basic_value = self.tableau[(r, rhs_col)];
            // Moving b_i by delta moves this basic value by delta * entry.
            if entry > 0.0 {
                decrease = decrease.min(basic_value / entry);
            } else {
                increase = increase.min(-basic_value / entry);
            }
        }
        Ok(RangeReport {
            label: format!("RHS of Constraint {}", i + 1),
            current: self.problem.constraints[i].rhs,
            allowable_increase: increase,
            allowable_decrease: decrease,
        })
    }

    /// Shadow price of each constraint: the negated reduced cost of its
    /// slack variable, sign-corrected back to the problem's own sense.
    /// Surplus columns enter the tableau negated, so `>=` rows flip once
    /// more; equality rows carry a zero column and report 0.
    pub fn shadow_prices(&self) -> Vec<ShadowPrice> {
        let n = self.problem.num_variables();
        let sense_sign = match self.problem.sense {
            Sense::Maximize => 1.0,
            Sense::Minimize => -1.0,
        };
        (0..self.problem.num_constraints())
            .map(|i| {
                let row_sign = match self.problem.constraints[i].relation {
                    Relation::Ge => -1.0,
                    Relation::Le | Relation::Eq => 1.0,
                };
                let value = sense_sign * row_sign * -self.result.reduced_costs[n + i];
                ShadowPrice { constraint: i, value }
            })
            .collect()
    }

    /// Unified entry point: one 1-based index spanning the objective
    /// coefficients, then per constraint its coefficients followed by its
    /// RHS.
    pub fn unified_range(&self, global_index: usize) -> Result<RangeReport, AnalysisError> {
        let n = self.problem.num_variables();
        let m = self.problem.num_constraints();
        if global_index == 0 {
            return Err(AnalysisError::IndexOutOfRange(global_index));
        }
        if global_index <= n {
            return self.variable_range(global_index - 1);
        }
        let mut cursor = n;
        for i in 0..m {
            if global_index <= cursor + n {
                return Err(AnalysisError::CoefficientIndex(global_index));
            }
            if global_index == cursor + n + 1 {
                return self.rhs_range(i);
            }
            cursor += n + 1;
        }
        Err(AnalysisError::IndexOutOfRange(global_index))
    }

    /// Constructs the dual, solves it independently with the tableau
    /// simplex, and verifies strong duality within 1e-6.
    pub fn dual(&self) -> Result<DualReport, AnalysisError> {
        let dual = dual_problem(self.problem)?;
        let dual_result = TableauSimplex::new().solve(&dual)?;
        let primal_objective = self.result.objective;
        let strong_duality = dual_result.is_optimal
            && (primal_objective - dual_result.objective).abs() <= 1e-6;
        Ok(DualReport {
            primal: self.problem.clone(),
            dual,
            dual_result,
            primal_objective,
            strong_duality,
        })
    }
}
