mod branch_bound;
mod cutting_plane;
mod knapsack;
pub mod linalg;
mod problem;
mod revised;
mod sensitivity;
mod simplex;
mod solution;

use thiserror::Error;

pub use branch_bound::BranchAndBound;
pub use cutting_plane::CuttingPlane;
pub use knapsack::Knapsack;
pub use linalg::{LinalgError, Matrix};
pub use problem::{Constraint, Problem, ProblemError, Relation, Sense, VarKind, VarSign, Variable};
pub use revised::RevisedSimplex;
pub use sensitivity::{AnalysisError, Analyzer, DualReport, RangeReport, ShadowPrice, dual_problem};
pub use simplex::TableauSimplex;
pub use solution::SolveResult;

/// Fatal solver failures. Unbounded or infeasible programs are reported
/// through [`SolveResult`] flags, not through this error.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("basis matrix is singular: {0}")]
    SingularBasis(#[from] LinalgError),
    #[error("knapsack solver expects exactly one capacity constraint, got {0}")]
    KnapsackShape(usize),
}

/// Common entry point shared by every algorithm in the crate.
pub trait Solver {
    fn solve(&self, problem: &Problem) -> Result<SolveResult, SolveError>;
}
