use std::fs;

use crate::basic_types::{FileFormat, Literal, PropositionalVariable, Solution};
use crate::result::{MarrowError, MarrowResult};

/// An instance read back independently of the solver, used to verify reported solutions.
/// Hard clauses must all be satisfied; the violated soft weight must match the reported
/// objective value.
#[derive(Default)]
pub struct Instance {
    hard_clauses: Vec<Vec<Literal>>,
    soft_clauses: Vec<(u64, Vec<Literal>)>,
}

impl Instance {
    pub fn read_file(file_location: &str, file_format: FileFormat) -> MarrowResult<Instance> {
        let file_contents = fs::read_to_string(file_location)
            .map_err(|error| MarrowError::FileReadingError(error, file_location.to_owned()))?;

        let mut instance = Instance::default();
        let mut tokens = file_contents
            .lines()
            .filter(|line| !line.starts_with('c'))
            .flat_map(|line| line.split_whitespace());

        let expected_format = match file_format {
            FileFormat::CnfDimacsPLine => "cnf",
            FileFormat::WcnfDimacsPLine => "wcnf",
        };
        if tokens.next() != Some("p") || tokens.next() != Some(expected_format) {
            return Err(MarrowError::ParsingError(
                "Unexpected header while re-reading the instance.".to_owned(),
            ));
        }
        let _num_variables = tokens.next();
        let _num_clauses = tokens.next();
        let top_weight = match file_format {
            FileFormat::CnfDimacsPLine => None,
            FileFormat::WcnfDimacsPLine => Some(
                tokens
                    .next()
                    .unwrap_or_default()
                    .parse::<u64>()
                    .map_err(|_error| {
                        MarrowError::ParsingError("Invalid top weight.".to_owned())
                    })?,
            ),
        };

        let mut expecting_weight = top_weight.is_some();
        let mut weight: u64 = 0;
        let mut clause: Vec<Literal> = vec![];
        for token in tokens {
            if expecting_weight {
                weight = token.parse::<u64>().map_err(|_error| {
                    MarrowError::ParsingError(format!("Invalid weight '{}'.", token))
                })?;
                expecting_weight = false;
                continue;
            }
            let value = token.parse::<i64>().map_err(|_error| {
                MarrowError::ParsingError(format!("Invalid integer '{}'.", token))
            })?;
            if value != 0 {
                clause.push(Literal::new(
                    PropositionalVariable::new(value.unsigned_abs() as u32),
                    value > 0,
                ));
                continue;
            }

            let finished_clause = std::mem::take(&mut clause);
            match top_weight {
                None => instance.hard_clauses.push(finished_clause),
                Some(top) => {
                    if weight >= top {
                        instance.hard_clauses.push(finished_clause);
                    } else {
                        instance.soft_clauses.push((weight, finished_clause));
                    }
                    expecting_weight = true;
                }
            }
        }

        Ok(instance)
    }

    pub fn are_hard_clauses_violated(&self, solution: &Solution) -> bool {
        self.hard_clauses.iter().any(|clause| {
            !clause
                .iter()
                .any(|literal| solution.get_literal_value(*literal))
        })
    }

    pub fn compute_soft_clause_violation(&self, solution: &Solution) -> u64 {
        self.soft_clauses
            .iter()
            .filter(|(_weight, clause)| {
                !clause
                    .iter()
                    .any(|literal| solution.get_literal_value(*literal))
            })
            .map(|(weight, _clause)| *weight)
            .sum()
    }
}
