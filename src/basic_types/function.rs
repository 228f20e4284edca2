use crate::basic_types::HashMap;
use crate::engine::Assignments;
use crate::marrow_assert_moderate;

use super::{Literal, Solution, WeightedLiteral};

/// A linear objective function over literals: `sum of weight * literal + constant`.
/// The solver minimises this quantity.
#[derive(Clone, Default)]
pub struct Function {
    weighted_literals: HashMap<Literal, u64>,
    constant_term: u64,
}

impl Function {
    pub fn new() -> Function {
        Function {
            weighted_literals: HashMap::default(),
            constant_term: 0,
        }
    }

    pub fn add_weighted_literal(&mut self, literal: Literal, weight: u64) {
        //we want to avoid the situation where both polarities of a variable carry a weight
        //  in case that happens, we keep a weight for one of the two polarities,
        //  and factor the obligatory cost into the constant term
        let negative_literal = !literal;
        if let Some(opposite_weight) = self.weighted_literals.get_mut(&negative_literal) {
            marrow_assert_moderate!(*opposite_weight != 0);
            match weight.cmp(opposite_weight) {
                std::cmp::Ordering::Less => {
                    *opposite_weight -= weight;
                    self.constant_term += weight;
                }
                std::cmp::Ordering::Equal => {
                    let _ = self.weighted_literals.remove(&negative_literal);
                    self.constant_term += weight;
                }
                std::cmp::Ordering::Greater => {
                    let diff = weight - *opposite_weight;
                    self.constant_term += *opposite_weight;
                    let _ = self.weighted_literals.remove(&negative_literal);
                    let _ = self.weighted_literals.insert(literal, diff);
                }
            }
        } else {
            *self.weighted_literals.entry(literal).or_insert(0) += weight;
        }
    }

    pub fn add_constant_term(&mut self, value: u64) {
        self.constant_term += value;
    }

    pub fn get_weighted_literals(&self) -> std::collections::hash_map::Iter<Literal, u64> {
        self.weighted_literals.iter()
    }

    pub fn get_constant_term(&self) -> u64 {
        self.constant_term
    }

    pub fn is_empty(&self) -> bool {
        self.weighted_literals.is_empty() && self.constant_term == 0
    }

    pub fn evaluate_solution(&self, solution: &Solution) -> u64 {
        let mut value: u64 = self.constant_term;
        for term in self.get_weighted_literals() {
            let literal = *term.0;
            let weight = *term.1;
            value += weight * (solution.get_literal_value(literal) as u64);
        }
        value
    }

    pub fn evaluate_assignment(&self, assignments: &Assignments) -> u64 {
        let mut value: u64 = self.constant_term;
        for term in self.get_weighted_literals() {
            let literal = *term.0;
            let weight = *term.1;
            marrow_assert_moderate!(assignments.is_literal_assigned(literal));
            value += weight * (assignments.is_literal_assigned_true(literal) as u64);
        }
        value
    }

    pub fn get_function_as_weighted_literals_vector(&self) -> Vec<WeightedLiteral> {
        let mut weighted_literals: Vec<WeightedLiteral> = self
            .get_weighted_literals()
            .map(|p| WeightedLiteral {
                literal: *p.0,
                weight: *p.1,
            })
            .collect();

        //hashmaps internally use randomisation when storing keys, which influences the order in
        //  which elements are traversed, this in turn has an impact on the solver since the order
        //  in which literals are stored influences the encoding, so we sort to stay deterministic
        weighted_literals.sort_by_key(|wl| wl.literal.to_u32());

        weighted_literals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::PropositionalVariable;

    #[test]
    fn test_opposite_polarities_fold_into_constant() {
        let literal = Literal::new(PropositionalVariable::new(1), true);

        let mut function = Function::new();
        function.add_weighted_literal(literal, 5);
        function.add_weighted_literal(!literal, 3);

        //either polarity pays at least 3, so the constant absorbs it
        assert_eq!(function.get_constant_term(), 3);
        let weighted_literals = function.get_function_as_weighted_literals_vector();
        assert_eq!(weighted_literals.len(), 1);
        assert_eq!(weighted_literals[0].literal, literal);
        assert_eq!(weighted_literals[0].weight, 2);
    }

    #[test]
    fn test_equal_weights_cancel_completely() {
        let literal = Literal::new(PropositionalVariable::new(2), false);

        let mut function = Function::new();
        function.add_weighted_literal(literal, 4);
        function.add_weighted_literal(!literal, 4);

        assert_eq!(function.get_constant_term(), 4);
        assert!(function.get_function_as_weighted_literals_vector().is_empty());
    }
}
