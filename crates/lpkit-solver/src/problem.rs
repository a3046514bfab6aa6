use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("constraint has {got} coefficients, expected {expected}")]
    RowLength { expected: usize, got: usize },
    #[error("activity column has {got} entries, expected {expected} (one per constraint)")]
    ColumnLength { expected: usize, got: usize },
}

/// Optimization sense of the objective function.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

/// Comparison relation of a constraint.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Less than or equal (<=)
    Le,
    /// Equal (=)
    Eq,
    /// Greater than or equal (>=)
    Ge,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Le => write!(f, "<="),
            Relation::Eq => write!(f, "="),
            Relation::Ge => write!(f, ">="),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarKind {
    #[default]
    Continuous,
    Integer,
    Binary,
}

/// Sign restriction of a variable. Carried through the model and the text
/// format, but the solving engines assume non-negative variables; an
/// unrestricted or non-positive variable must be substituted away by the
/// producer before solving.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarSign {
    #[default]
    NonNegative,
    NonPositive,
    Unrestricted,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Variable {
    pub kind: VarKind,
    pub sign: VarSign,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// One coefficient per decision variable.
    pub coefficients: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    /// Left-hand-side value of the constraint at the point `x`.
    pub fn lhs(&self, x: &[f64]) -> f64 {
        self.coefficients.iter().zip(x).map(|(a, v)| a * v).sum()
    }

    /// Whether the point `x` satisfies this constraint within `tol`.
    pub fn is_satisfied(&self, x: &[f64], tol: f64) -> bool {
        let lhs = self.lhs(x);
        match self.relation {
            Relation::Le => lhs <= self.rhs + tol,
            Relation::Eq => (lhs - self.rhs).abs() <= tol,
            Relation::Ge => lhs >= self.rhs - tol,
        }
    }
}

/// A linear (or mixed-integer) program.
///
/// Invariant: every constraint row and the variable list have exactly as
/// many entries as the objective has coefficients. The append helpers
/// validate before touching any state, so a half-updated problem is never
/// observable.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub objective: Vec<f64>,
    pub sense: Sense,
    pub constraints: Vec<Constraint>,
    pub variables: Vec<Variable>,
}

impl Problem {
    /// Creates a problem with the given objective and no constraints.
    /// All variables start continuous and non-negative.
    pub fn new(objective: Vec<f64>, sense: Sense) -> Self {
        let n = objective.len();
        Self {
            objective,
            sense,
            constraints: Vec::new(),
            variables: vec![Variable::default(); n],
        }
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_maximize(&self) -> bool {
        self.sense == Sense::Maximize
    }

    /// Returns a new problem with one extra constraint appended.
    pub fn with_constraint(
        &self,
        coefficients: Vec<f64>,
        relation: Relation,
        rhs: f64,
    ) -> Result<Problem, ProblemError> {
        if coefficients.len() != self.num_variables() {
            return Err(ProblemError::RowLength {
                expected: self.num_variables(),
                got: coefficients.len(),
            });
        }
        let mut next = self.clone();
        next.constraints.push(Constraint {
            coefficients,
            relation,
            rhs,
        });
        Ok(next)
    }

    /// Returns a new problem with one extra decision variable (activity)
    /// appended: an objective coefficient plus one coefficient per existing
    /// constraint row.
    pub fn with_activity(
        &self,
        objective_coefficient: f64,
        column: Vec<f64>,
        kind: VarKind,
        sign: VarSign,
    ) -> Result<Problem, ProblemError> {
        if column.len() != self.num_constraints() {
            return Err(ProblemError::ColumnLength {
                expected: self.num_constraints(),
                got: column.len(),
            });
        }
        let mut next = self.clone();
        next.objective.push(objective_coefficient);
        next.variables.push(Variable { kind, sign });
        for (row, entry) in next.constraints.iter_mut().zip(column) {
            row.coefficients.push(entry);
        }
        Ok(next)
    }

    /// Objective value of the point `x` in the problem's own sense.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }
}

fn write_linear_terms(f: &mut fmt::Formatter<'_>, coefficients: &[f64]) -> fmt::Result {
    for (j, c) in coefficients.iter().enumerate() {
        if j == 0 {
            write!(f, " {c}x{}", j + 1)?;
        } else if *c < 0.0 {
            write!(f, " - {}x{}", -c, j + 1)?;
        } else {
            write!(f, " + {c}x{}", j + 1)?;
        }
    }
    Ok(())
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sense = match self.sense {
            Sense::Maximize => "Maximize",
            Sense::Minimize => "Minimize",
        };
        write!(f, "{sense} Z =")?;
        write_linear_terms(f, &self.objective)?;
        writeln!(f)?;
        writeln!(f, "Subject to:")?;
        for con in &self.constraints {
            write!(f, " ")?;
            write_linear_terms(f, &con.coefficients)?;
            writeln!(f, " {} {}", con.relation, con.rhs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_constraint_preserves_shape() {
        let p = Problem::new(vec![1.0, 2.0], Sense::Maximize);
        let p2 = p.with_constraint(vec![1.0, 1.0], Relation::Le, 4.0).unwrap();
        assert_eq!(p.num_constraints(), 0);
        assert_eq!(p2.num_constraints(), 1);
        assert_eq!(p2.num_variables(), 2);
    }

    #[test]
    fn test_with_constraint_rejects_bad_row() {
        let p = Problem::new(vec![1.0, 2.0], Sense::Maximize);
        let err = p.with_constraint(vec![1.0], Relation::Le, 4.0).unwrap_err();
        assert_eq!(err, ProblemError::RowLength { expected: 2, got: 1 });
        // Original problem untouched.
        assert_eq!(p.num_constraints(), 0);
    }

    #[test]
    fn test_with_activity_extends_rows() {
        let p = Problem::new(vec![3.0], Sense::Maximize)
            .with_constraint(vec![2.0], Relation::Le, 10.0)
            .unwrap();
        let p2 = p
            .with_activity(5.0, vec![1.0], VarKind::Integer, VarSign::NonNegative)
            .unwrap();
        assert_eq!(p2.num_variables(), 2);
        assert_eq!(p2.constraints[0].coefficients, vec![2.0, 1.0]);
        assert_eq!(p2.variables[1].kind, VarKind::Integer);

        let err = p.with_activity(1.0, vec![], VarKind::Continuous, VarSign::NonNegative);
        assert!(err.is_err());
    }

    #[test]
    fn test_constraint_satisfaction() {
        let c = Constraint {
            coefficients: vec![1.0, 2.0],
            relation: Relation::Ge,
            rhs: 5.0,
        };
        assert!(c.is_satisfied(&[1.0, 2.0], 1e-9));
        assert!(!c.is_satisfied(&[1.0, 1.0], 1e-9));
        assert_eq!(c.lhs(&[1.0, 2.0]), 5.0);
    }

    #[test]
    fn test_display() {
        let p = Problem::new(vec![2.0, -3.0], Sense::Maximize)
            .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
            .unwrap();
        let text = p.to_string();
        assert!(text.contains("Maximize Z = 2x1 - 3x2"));
        assert!(text.contains("1x1 + 1x2 <= 4"));
    }
}
