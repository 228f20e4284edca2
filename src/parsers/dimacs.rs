use std::fs;

use log::debug;

use crate::basic_types::{Function, Literal, PropositionalVariable};
use crate::engine::PseudoBooleanSolver;
use crate::result::{MarrowError, MarrowResult};

//the convention of the readers: DIMACS variable i is solver variable with index i,
//  which holds because the solver reserves index zero for its constant-true variable

/// Reads a DIMACS CNF file ('p cnf' header) into the solver. Returns the number of variables
/// the header declares.
pub fn parse_cnf_file(file_location: &str, solver: &mut PseudoBooleanSolver) -> MarrowResult<u64> {
    let file_contents = fs::read_to_string(file_location)
        .map_err(|error| MarrowError::FileReadingError(error, file_location.to_owned()))?;

    let mut tokens = tokenize(&file_contents);
    let (num_variables, num_clauses) = parse_header(&mut tokens, "cnf")?;
    let variables = solver.new_variables(num_variables as u32);

    let mut clauses_read: u64 = 0;
    let mut clause: Vec<Literal> = vec![];
    for token in tokens {
        let value = parse_integer(token)?;
        if value == 0 {
            solver.add_clause(std::mem::take(&mut clause))?;
            clauses_read += 1;
        } else {
            clause.push(dimacs_literal(value, &variables, num_variables)?);
        }
    }
    if !clause.is_empty() {
        return Err(MarrowError::ParsingError(
            "The last clause is not terminated by zero.".to_owned(),
        ));
    }
    if clauses_read != num_clauses {
        debug!(
            "The header announces {} clauses but {} were read.",
            num_clauses, clauses_read
        );
    }

    Ok(num_variables)
}

/// Reads a weighted CNF file ('p wcnf' header) into the solver. Clauses with the top weight
/// are hard; soft clauses contribute their weight to the returned objective function, using a
/// fresh relaxation literal for non-unit soft clauses. Also returns the number of variables
/// the header declares, which excludes the relaxation literals.
pub fn parse_wcnf_file(
    file_location: &str,
    solver: &mut PseudoBooleanSolver,
) -> MarrowResult<(Function, u64)> {
    let file_contents = fs::read_to_string(file_location)
        .map_err(|error| MarrowError::FileReadingError(error, file_location.to_owned()))?;

    let mut tokens = tokenize(&file_contents);
    let (num_variables, _num_clauses) = parse_header(&mut tokens, "wcnf")?;
    let top_weight = match tokens.next() {
        Some(token) => parse_weight(token)?,
        None => {
            return Err(MarrowError::ParsingError(
                "The wcnf header misses the top weight.".to_owned(),
            ))
        }
    };
    let variables = solver.new_variables(num_variables as u32);

    let mut objective_function = Function::new();

    let mut expecting_weight = true;
    let mut weight: u64 = 0;
    let mut clause: Vec<Literal> = vec![];
    for token in tokens {
        if expecting_weight {
            weight = parse_weight(token)?;
            expecting_weight = false;
            continue;
        }

        let value = parse_integer(token)?;
        if value != 0 {
            clause.push(dimacs_literal(value, &variables, num_variables)?);
            continue;
        }

        let finished_clause = std::mem::take(&mut clause);
        expecting_weight = true;

        if weight >= top_weight {
            solver.add_clause(finished_clause)?;
        } else if finished_clause.len() == 1 {
            //violating a unit soft clause means making its negation true
            objective_function.add_weighted_literal(!finished_clause[0], weight);
        } else {
            //a relaxation literal pays the weight whenever the soft clause is violated
            let relaxation_literal = Literal::new(solver.new_variable(), true);
            let mut relaxed_clause = finished_clause;
            relaxed_clause.push(relaxation_literal);
            solver.add_clause(relaxed_clause)?;
            objective_function.add_weighted_literal(relaxation_literal, weight);
        }
    }
    if !clause.is_empty() || !expecting_weight {
        return Err(MarrowError::ParsingError(
            "The last clause is not terminated by zero.".to_owned(),
        ));
    }

    Ok((objective_function, num_variables))
}

fn tokenize(file_contents: &str) -> impl Iterator<Item = &str> {
    file_contents
        .lines()
        .filter(|line| !line.starts_with('c'))
        .flat_map(|line| line.split_whitespace())
}

fn parse_header<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    expected_format: &str,
) -> MarrowResult<(u64, u64)> {
    if tokens.next() != Some("p") {
        return Err(MarrowError::ParsingError(
            "Expected the instance to start with a 'p' header line.".to_owned(),
        ));
    }
    let format = tokens.next().unwrap_or_default();
    if format != expected_format {
        return Err(MarrowError::ParsingError(format!(
            "Expected the '{}' format, the header announces '{}'.",
            expected_format, format
        )));
    }
    let num_variables = parse_weight(tokens.next().unwrap_or_default())?;
    let num_clauses = parse_weight(tokens.next().unwrap_or_default())?;
    Ok((num_variables, num_clauses))
}

fn parse_integer(token: &str) -> MarrowResult<i64> {
    token
        .parse::<i64>()
        .map_err(|_error| MarrowError::ParsingError(format!("Invalid integer '{}'.", token)))
}

fn parse_weight(token: &str) -> MarrowResult<u64> {
    token
        .parse::<u64>()
        .map_err(|_error| MarrowError::ParsingError(format!("Invalid weight '{}'.", token)))
}

fn dimacs_literal(
    value: i64,
    variables: &[PropositionalVariable],
    num_variables: u64,
) -> MarrowResult<Literal> {
    let variable_index = value.unsigned_abs();
    if variable_index == 0 || variable_index > num_variables {
        return Err(MarrowError::ParsingError(format!(
            "Literal {} is out of the declared variable range.",
            value
        )));
    }
    Ok(Literal::new(
        variables[(variable_index - 1) as usize],
        value > 0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::SolverExecutionFlag;
    use crate::engine::SolverOptions;

    fn write_temporary_file(name: &str, contents: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(name);
        fs::write(&path, contents).expect("The temporary directory is writable.");
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_parse_cnf_and_solve() {
        let path = write_temporary_file(
            "marrow_parse_cnf_test.cnf",
            "c an example instance\np cnf 2 3\n1 2 0\n1 -2 0\n-1 -2 0\n",
        );
        let mut solver = PseudoBooleanSolver::new(SolverOptions::default());
        parse_cnf_file(&path, &mut solver).expect("Valid instance.");

        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert!(solution[PropositionalVariable::new(1)]);
        assert!(!solution[PropositionalVariable::new(2)]);
    }

    #[test]
    fn test_parse_wcnf_objective() {
        let path = write_temporary_file(
            "marrow_parse_wcnf_test.wcnf",
            "p wcnf 2 4 10\n10 1 2 0\n1 -1 0\n1 -2 0\n1 -1 -2 0\n",
        );
        let mut solver = PseudoBooleanSolver::new(SolverOptions::default());
        let (objective_function, num_variables) =
            parse_wcnf_file(&path, &mut solver).expect("Valid instance.");

        //the two unit soft clauses enter the objective directly, the binary soft clause
        //  contributes a relaxation literal
        assert_eq!(num_variables, 2);
        assert_eq!(objective_function.get_weighted_literals().count(), 3);
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        let path = write_temporary_file("marrow_parse_bad_test.cnf", "p dnf 1 1\n1 0\n");
        let mut solver = PseudoBooleanSolver::new(SolverOptions::default());
        assert!(parse_cnf_file(&path, &mut solver).is_err());
    }

    #[test]
    fn test_unterminated_clause_is_rejected() {
        let path = write_temporary_file("marrow_parse_unterminated_test.cnf", "p cnf 2 1\n1 2\n");
        let mut solver = PseudoBooleanSolver::new(SolverOptions::default());
        assert!(parse_cnf_file(&path, &mut solver).is_err());
    }
}
