use lpkit_solver::{Constraint, Problem, Relation, Sense, VarKind, VarSign, Variable};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("model is empty: expected an objective line")]
    MissingObjective,
    #[error("line {line}: expected 'max' or 'min', found '{token}'")]
    UnknownSense { line: usize, token: String },
    #[error("line {line}: '{token}' is not a number")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: constraint has no relation ('<=', '=', or '>=')")]
    MissingRelation { line: usize },
    #[error("line {line}: expected {expected} coefficients, found {found}")]
    WidthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: expected a single right-hand side after the relation")]
    MissingRhs { line: usize },
    #[error("line {line}: unknown restriction '{token}' (expected +, -, urs, int, or bin)")]
    UnknownRestriction { line: usize, token: String },
    #[error("model has no constraints")]
    NoConstraints,
}

const RESTRICTIONS: [&str; 5] = ["+", "-", "urs", "int", "bin"];

fn is_restriction_line(tokens: &[&str]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|t| RESTRICTIONS.contains(t))
}

fn parse_number(token: &str, line: usize) -> Result<f64, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_objective(tokens: &[&str], line: usize) -> Result<(Sense, Vec<f64>), ParseError> {
    let (head, rest) = tokens.split_first().ok_or(ParseError::MissingObjective)?;
    let sense = match head.to_ascii_lowercase().as_str() {
        "max" => Sense::Maximize,
        "min" => Sense::Minimize,
        _ => {
            return Err(ParseError::UnknownSense {
                line,
                token: head.to_string(),
            });
        }
    };
    let coefficients = rest
        .iter()
        .map(|t| parse_number(t, line))
        .collect::<Result<Vec<f64>, _>>()?;
    Ok((sense, coefficients))
}

fn parse_constraint(tokens: &[&str], line: usize, width: usize) -> Result<Constraint, ParseError> {
    let pos = tokens
        .iter()
        .position(|t| matches!(*t, "<=" | "=" | ">="))
        .ok_or(ParseError::MissingRelation { line })?;
    let relation = match tokens[pos] {
        "<=" => Relation::Le,
        ">=" => Relation::Ge,
        _ => Relation::Eq,
    };
    if pos != width {
        return Err(ParseError::WidthMismatch {
            line,
            expected: width,
            found: pos,
        });
    }
    let coefficients = tokens[..pos]
        .iter()
        .map(|t| parse_number(t, line))
        .collect::<Result<Vec<f64>, _>>()?;
    let &[rhs_token] = &tokens[pos + 1..] else {
        return Err(ParseError::MissingRhs { line });
    };
    let rhs = parse_number(rhs_token, line)?;
    Ok(Constraint {
        coefficients,
        relation,
        rhs,
    })
}

fn parse_restrictions(
    tokens: &[&str],
    line: usize,
    width: usize,
) -> Result<Vec<Variable>, ParseError> {
    if tokens.len() != width {
        return Err(ParseError::WidthMismatch {
            line,
            expected: width,
            found: tokens.len(),
        });
    }
    tokens
        .iter()
        .map(|t| match *t {
            "+" => Ok(Variable::default()),
            "-" => Ok(Variable {
                sign: VarSign::NonPositive,
                ..Variable::default()
            }),
            "urs" => Ok(Variable {
                sign: VarSign::Unrestricted,
                ..Variable::default()
            }),
            "int" => Ok(Variable {
                kind: VarKind::Integer,
                ..Variable::default()
            }),
            "bin" => Ok(Variable {
                kind: VarKind::Binary,
                ..Variable::default()
            }),
            other => Err(ParseError::UnknownRestriction {
                line,
                token: other.to_string(),
            }),
        })
        .collect()
}

/// Parses the whitespace-separated model format:
///
/// ```text
/// max 60 30 20
/// 8 6 1 <= 48
/// 4 2 1.5 <= 20
/// ```
///
/// The first non-blank line is the objective, each following line one
/// constraint. An optional final line of restriction tokens (`+`, `-`,
/// `urs`, `int`, `bin`, one per variable) sets variable kinds and signs.
/// Blank lines and lines starting with `#` are skipped.
pub fn parse(source: &str) -> Result<Problem, ParseError> {
    let lines: Vec<(usize, Vec<&str>)> = source
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .map(|(i, l)| (i, l.split_whitespace().collect()))
        .collect();

    let ((first_line, first_tokens), rest) =
        lines.split_first().ok_or(ParseError::MissingObjective)?;
    let (sense, objective) = parse_objective(first_tokens, *first_line)?;
    let width = objective.len();

    let mut problem = Problem::new(objective, sense);

    let (restriction, constraint_lines) = match rest.split_last() {
        Some(((line, tokens), body)) if is_restriction_line(tokens) => {
            (Some((*line, tokens.as_slice())), body)
        }
        _ => (None, rest),
    };

    for (line, tokens) in constraint_lines {
        problem
            .constraints
            .push(parse_constraint(tokens, *line, width)?);
    }
    if problem.constraints.is_empty() {
        return Err(ParseError::NoConstraints);
    }

    if let Some((line, tokens)) = restriction {
        problem.variables = parse_restrictions(tokens, line, width)?;
    }
    Ok(problem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_continuous_model() {
        let problem = parse("max 60 30 20\n8 6 1 <= 48\n4 2 1.5 <= 20\n").unwrap();
        assert_eq!(problem.sense, Sense::Maximize);
        assert_eq!(problem.objective, vec![60.0, 30.0, 20.0]);
        assert_eq!(problem.num_constraints(), 2);
        assert_eq!(problem.constraints[1].relation, Relation::Le);
        assert_eq!(problem.constraints[1].rhs, 20.0);
        assert!(problem.variables.iter().all(|v| *v == Variable::default()));
    }

    #[test]
    fn test_parse_signed_coefficients_and_min() {
        let problem = parse("min +2 -3\n1 1 >= 4\n-1 2 = 1\n").unwrap();
        assert_eq!(problem.sense, Sense::Minimize);
        assert_eq!(problem.objective, vec![2.0, -3.0]);
        assert_eq!(problem.constraints[0].relation, Relation::Ge);
        assert_eq!(problem.constraints[1].relation, Relation::Eq);
    }

    #[test]
    fn test_parse_restriction_line() {
        let problem = parse("max 2 3 3 5 2 4\n11 8 6 14 10 10 <= 40\nbin bin bin bin bin bin\n")
            .unwrap();
        assert_eq!(problem.num_constraints(), 1);
        assert!(problem.variables.iter().all(|v| v.kind == VarKind::Binary));

        let mixed = parse("max 1 2 3\n1 1 1 <= 5\nint + urs\n").unwrap();
        assert_eq!(mixed.variables[0].kind, VarKind::Integer);
        assert_eq!(mixed.variables[1], Variable::default());
        assert_eq!(mixed.variables[2].sign, VarSign::Unrestricted);
    }

    #[test]
    fn test_skips_blanks_and_comments() {
        let problem = parse("# objective\nmax 1 1\n\n# rows\n1 0 <= 2\n0 1 <= 3\n").unwrap();
        assert_eq!(problem.num_constraints(), 2);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(parse(""), Err(ParseError::MissingObjective));
        assert_eq!(
            parse("maximize 1 1\n1 1 <= 2\n"),
            Err(ParseError::UnknownSense {
                line: 1,
                token: "maximize".into()
            })
        );
        assert_eq!(
            parse("max 1 1\n1 x <= 2\n"),
            Err(ParseError::InvalidNumber {
                line: 2,
                token: "x".into()
            })
        );
        assert_eq!(
            parse("max 1 1\n1 1 2\n"),
            Err(ParseError::MissingRelation { line: 2 })
        );
        assert_eq!(
            parse("max 1 1\n1 <= 2\n"),
            Err(ParseError::WidthMismatch {
                line: 2,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            parse("max 1 1\n1 1 <= 2 3\n"),
            Err(ParseError::MissingRhs { line: 2 })
        );
        assert_eq!(parse("max 1 1\n"), Err(ParseError::NoConstraints));
    }

    #[test]
    fn test_restriction_width_must_match() {
        assert_eq!(
            parse("max 1 1\n1 1 <= 2\nint\n"),
            Err(ParseError::WidthMismatch {
                line: 3,
                expected: 2,
                found: 1
            })
        );
    }
}
