use crate::engine::Assignments;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;

use super::{Literal, PropositionalVariable};

/// A snapshot of a full truth assignment, taken when the solver reports feasibility.
/// The snapshot is kept out-of-band so that the solver is free to backtrack afterwards.
#[derive(Clone, Debug)]
pub struct Solution {
    truth_values: Vec<bool>,
}

impl Solution {
    pub fn new(assignments: &Assignments) -> Solution {
        let mut truth_values = vec![true; assignments.num_propositional_variables() as usize];
        Solution::update_propositional_values(&mut truth_values, assignments);
        Solution { truth_values }
    }

    pub fn num_propositional_variables(&self) -> usize {
        self.truth_values.len()
    }

    pub fn update(&mut self, assignments: &Assignments) {
        marrow_assert_moderate!(
            self.truth_values.len() <= assignments.num_propositional_variables() as usize
        );

        //more variables may have been created since the last snapshot,
        //  e.g., selectors introduced while strengthening the objective bound,
        //  in that case the internal data structures are resized
        if self.truth_values.len() < assignments.num_propositional_variables() as usize {
            self.truth_values
                .resize(assignments.num_propositional_variables() as usize, true);
        }

        Solution::update_propositional_values(&mut self.truth_values, assignments);
    }

    pub fn get_literal_value(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.truth_values[literal.get_propositional_variable()]
        } else {
            !self.truth_values[literal.get_propositional_variable()]
        }
    }

    fn update_propositional_values(truth_values: &mut [bool], assignments: &Assignments) {
        for variable in assignments.get_propositional_variables() {
            marrow_assert_simple!(
                assignments.is_variable_assigned(variable),
                "The solution struct expects that all propositional variables are assigned."
            );
            truth_values[variable.index() as usize] =
                assignments.is_variable_assigned_true(variable);
        }
    }
}

impl std::ops::Index<PropositionalVariable> for Solution {
    type Output = bool;
    fn index(&self, variable: PropositionalVariable) -> &bool {
        &self.truth_values[variable]
    }
}
