use lpkit_solver::{Problem, Relation, Sense, VarKind, VarSign, Variable};

fn relation_token(relation: Relation) -> &'static str {
    match relation {
        Relation::Le => "<=",
        Relation::Eq => "=",
        Relation::Ge => ">=",
    }
}

fn restriction_token(variable: &Variable) -> &'static str {
    match (variable.kind, variable.sign) {
        (VarKind::Integer, _) => "int",
        (VarKind::Binary, _) => "bin",
        (VarKind::Continuous, VarSign::NonPositive) => "-",
        (VarKind::Continuous, VarSign::Unrestricted) => "urs",
        (VarKind::Continuous, VarSign::NonNegative) => "+",
    }
}

fn push_numbers(out: &mut String, numbers: &[f64]) {
    for v in numbers {
        out.push(' ');
        out.push_str(&v.to_string());
    }
}

/// Renders a problem back into the text format accepted by
/// [`crate::parse`]. The restriction line is emitted only when some
/// variable deviates from the continuous non-negative default.
pub fn write(problem: &Problem) -> String {
    let mut out = String::new();
    out.push_str(match problem.sense {
        Sense::Maximize => "max",
        Sense::Minimize => "min",
    });
    push_numbers(&mut out, &problem.objective);
    out.push('\n');

    for con in &problem.constraints {
        let mut line = String::new();
        push_numbers(&mut line, &con.coefficients);
        out.push_str(line.trim_start());
        out.push_str(&format!(" {} {}\n", relation_token(con.relation), con.rhs));
    }

    if problem.variables.iter().any(|v| *v != Variable::default()) {
        let tokens: Vec<&str> = problem.variables.iter().map(restriction_token).collect();
        out.push_str(&tokens.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_write_continuous_model() {
        let problem = parse("max 60 30 20\n8 6 1 <= 48\n4 2 1.5 <= 20\n").unwrap();
        let text = write(&problem);
        assert_eq!(text, "max 60 30 20\n8 6 1 <= 48\n4 2 1.5 <= 20\n");
    }

    #[test]
    fn test_write_emits_restrictions_when_present() {
        let problem = parse("min 2 3\n1 1 >= 4\nint urs\n").unwrap();
        let text = write(&problem);
        assert_eq!(text, "min 2 3\n1 1 >= 4\nint urs\n");
    }

    #[test]
    fn test_round_trip() {
        let source = "max 2 3 3 5 2 4\n11 8 6 14 10 10 <= 40\nbin bin bin bin bin bin\n";
        let problem = parse(source).unwrap();
        let again = parse(&write(&problem)).unwrap();
        assert_eq!(problem, again);
    }
}
