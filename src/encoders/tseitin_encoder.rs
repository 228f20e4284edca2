use crate::basic_types::{
    ConstraintOperationError, HashMap, Literal, WeightedLiteral,
};
use crate::engine::PseudoBooleanSolver;

/// Selects how the defining constraints of a reified conjunction are expressed: as plain
/// clauses, or as a clause plus a single pseudo-Boolean constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReificationMode {
    Clauses,
    PseudoBoolean,
}

/// Introduces fresh variables that are equivalent to conjunctions of literals or to
/// pseudo-Boolean constraints, so that higher layers can treat them as ordinary literals.
/// Encodings are cached by the canonicalized input: requesting the same conjunction twice
/// yields the same literal, and the defining constraints are only asserted once.
///
/// The encoder holds no reference to the solver; it borrows one per call. Dropping the
/// encoder leaves all asserted constraints in the solver intact.
pub struct TseitinEncoder {
    conjunction_cache: HashMap<Vec<Literal>, Literal>,
    pb_cache: HashMap<(Vec<WeightedLiteral>, u64), Literal>,
    mode: ReificationMode,
}

impl TseitinEncoder {
    pub fn new(mode: ReificationMode) -> TseitinEncoder {
        TseitinEncoder {
            conjunction_cache: HashMap::default(),
            pb_cache: HashMap::default(),
            mode,
        }
    }

    /// Returns a literal that is equivalent to the conjunction of the input literals. The empty
    /// conjunction is the constant-true literal, singletons are returned unchanged, and a
    /// conjunction containing both polarities of a variable is the constant-false literal.
    pub fn encode_conjunction(
        &mut self,
        solver: &mut PseudoBooleanSolver,
        literals: &[Literal],
    ) -> Result<Literal, ConstraintOperationError> {
        //canonicalize: the literal set is the only identity of a conjunction
        let mut canonical: Vec<Literal> = literals.to_vec();
        canonical.sort_unstable_by_key(|literal| literal.to_u32());
        canonical.dedup();

        if canonical.is_empty() {
            return Ok(solver.get_true_literal());
        }
        if canonical.len() == 1 {
            return Ok(canonical[0]);
        }
        for i in 1..canonical.len() {
            if canonical[i - 1].get_propositional_variable()
                == canonical[i].get_propositional_variable()
            {
                //l and ~l can never hold together
                return Ok(solver.get_false_literal());
            }
        }

        if let Some(cached_literal) = self.conjunction_cache.get(&canonical) {
            return Ok(*cached_literal);
        }

        let definition_literal = Literal::new(solver.new_variable(), true);

        //(l1 and ... and ln) -> y
        let mut completion_clause: Vec<Literal> = vec![definition_literal];
        completion_clause.extend(canonical.iter().map(|literal| !*literal));
        solver.add_clause(completion_clause)?;

        match self.mode {
            ReificationMode::Clauses => {
                //y -> li for each i
                for literal in &canonical {
                    solver.add_permanent_implication_unchecked(definition_literal, *literal);
                }
            }
            ReificationMode::PseudoBoolean => {
                //sum of li >= n * y, expressed with positive coefficients as
                //  n * (not y) + sum of li >= n
                let n = canonical.len() as u64;
                let mut terms: Vec<WeightedLiteral> = vec![WeightedLiteral {
                    literal: !definition_literal,
                    weight: n,
                }];
                terms.extend(canonical.iter().map(|literal| WeightedLiteral {
                    literal: *literal,
                    weight: 1,
                }));
                solver.add_pb_at_least(terms, n)?;
            }
        }

        let _ = self.conjunction_cache.insert(canonical, definition_literal);
        Ok(definition_literal)
    }

    /// Returns a selector literal `s` that is equivalent to `sum of weight_i * literal_i >= k`.
    /// Used by soft-constraint and indicator encodings.
    pub fn encode_pb_at_least(
        &mut self,
        solver: &mut PseudoBooleanSolver,
        terms: &[WeightedLiteral],
        k: u64,
    ) -> Result<Literal, ConstraintOperationError> {
        if k == 0 {
            //trivially satisfied
            return Ok(solver.get_true_literal());
        }

        let mut canonical: Vec<WeightedLiteral> = terms.to_vec();
        canonical.sort_unstable_by_key(|term| (term.literal.to_u32(), term.weight));

        if let Some(cached_literal) = self.pb_cache.get(&(canonical.clone(), k)) {
            return Ok(*cached_literal);
        }

        let selector = Literal::new(solver.new_variable(), true);

        //s -> (sum >= k)
        solver.add_pb_at_least_soft(selector, canonical.clone(), k)?;
        //(not s) -> (sum <= k - 1), together the two directions reify the constraint
        solver.add_pb_at_most_soft(!selector, canonical.clone(), k - 1)?;

        let _ = self.pb_cache.insert((canonical, k), selector);
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::SolverExecutionFlag;
    use crate::engine::SolverOptions;

    fn solver_with_literals(num_variables: u32) -> (PseudoBooleanSolver, Vec<Literal>) {
        let mut solver = PseudoBooleanSolver::new(SolverOptions::default());
        let literals = solver
            .new_variables(num_variables)
            .into_iter()
            .map(|variable| Literal::new(variable, true))
            .collect();
        (solver, literals)
    }

    #[test]
    fn test_empty_conjunction_is_true_literal() {
        let (mut solver, _) = solver_with_literals(0);
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let literal = encoder
            .encode_conjunction(&mut solver, &[])
            .expect("Valid encoding.");
        assert_eq!(literal, solver.get_true_literal());
    }

    #[test]
    fn test_singleton_conjunction_is_identity() {
        let (mut solver, literals) = solver_with_literals(1);
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let literal = encoder
            .encode_conjunction(&mut solver, &[literals[0]])
            .expect("Valid encoding.");
        assert_eq!(literal, literals[0]);
    }

    #[test]
    fn test_contradictory_conjunction_is_false_literal() {
        let (mut solver, literals) = solver_with_literals(1);
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let literal = encoder
            .encode_conjunction(&mut solver, &[literals[0], !literals[0]])
            .expect("Valid encoding.");
        assert_eq!(literal, solver.get_false_literal());
    }

    #[test]
    fn test_conjunction_cache_is_order_independent() {
        let (mut solver, literals) = solver_with_literals(2);
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let first = encoder
            .encode_conjunction(&mut solver, &[literals[0], literals[1]])
            .expect("Valid encoding.");
        let second = encoder
            .encode_conjunction(&mut solver, &[literals[1], literals[0], literals[1]])
            .expect("Valid encoding.");
        assert_eq!(first, second);
    }

    #[test]
    fn test_conjunction_equivalence_in_all_models() {
        for mode in [ReificationMode::Clauses, ReificationMode::PseudoBoolean] {
            let (mut solver, literals) = solver_with_literals(2);
            let mut encoder = TseitinEncoder::new(mode);
            let conjunction_literal = encoder
                .encode_conjunction(&mut solver, &[literals[0], literals[1]])
                .expect("Valid encoding.");

            for a_value in [false, true] {
                for b_value in [false, true] {
                    solver.restore_state_at_root();
                    let assumptions = vec![
                        if a_value { literals[0] } else { !literals[0] },
                        if b_value { literals[1] } else { !literals[1] },
                    ];
                    assert_eq!(
                        solver.solve_under_assumptions(&assumptions, i64::MAX),
                        SolverExecutionFlag::Feasible
                    );
                    let solution = solver.get_solution();
                    assert_eq!(
                        solution.get_literal_value(conjunction_literal),
                        a_value && b_value
                    );
                }
            }
        }
    }

    #[test]
    fn test_pb_reification_is_equivalent() {
        let (mut solver, literals) = solver_with_literals(2);
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let terms = vec![
            WeightedLiteral {
                literal: literals[0],
                weight: 1,
            },
            WeightedLiteral {
                literal: literals[1],
                weight: 1,
            },
        ];
        let selector = encoder
            .encode_pb_at_least(&mut solver, &terms, 2)
            .expect("Valid encoding.");

        //assuming the selector imposes the constraint
        assert_eq!(
            solver.solve_under_assumptions(&[selector], i64::MAX),
            SolverExecutionFlag::Feasible
        );
        let solution = solver.get_solution();
        assert!(solution.get_literal_value(literals[0]));
        assert!(solution.get_literal_value(literals[1]));

        //falsifying the constraint forces the selector to be false
        solver.restore_state_at_root();
        assert_eq!(
            solver.solve_under_assumptions(&[!literals[0]], i64::MAX),
            SolverExecutionFlag::Feasible
        );
        assert!(!solver.get_solution().get_literal_value(selector));
    }

    #[test]
    fn test_pb_reification_cache() {
        let (mut solver, literals) = solver_with_literals(2);
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let terms = vec![
            WeightedLiteral {
                literal: literals[0],
                weight: 2,
            },
            WeightedLiteral {
                literal: literals[1],
                weight: 3,
            },
        ];
        let first = encoder
            .encode_pb_at_least(&mut solver, &terms, 3)
            .expect("Valid encoding.");
        let reversed: Vec<WeightedLiteral> = terms.iter().rev().copied().collect();
        let second = encoder
            .encode_pb_at_least(&mut solver, &reversed, 3)
            .expect("Valid encoding.");
        assert_eq!(first, second);
    }
}
