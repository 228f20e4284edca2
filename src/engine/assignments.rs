use crate::basic_types::{Literal, PropositionalVariable, PropositionalVariableGeneratorIterator};
use crate::marrow_assert_moderate;
use crate::marrow_assert_ne_simple;
use crate::marrow_assert_simple;

/// The trail and per-variable assignment bookkeeping: for every assigned variable the truth
/// value, the decision level, the position on the trail, and the reason code of the constraint
/// that propagated it (zero for decisions and root assignments).
pub struct Assignments {
    assignment_info: Vec<AssignmentInfo>,
    current_decision_level: u32,
    pub trail: Vec<Literal>,
    pub trail_delimiter: Vec<u32>, //[i] is the position where the i-th decision level ends (exclusive) on the trail. Note that the current decision level does not have an entry in the trail delimiter!
    pub true_literal: Literal,
    pub false_literal: Literal,
}

impl Assignments {
    pub fn new() -> Assignments {
        let dummy_literal = Literal::new(PropositionalVariable::new(0), true);
        Assignments {
            assignment_info: vec![],
            current_decision_level: 0,
            trail: vec![],
            trail_delimiter: vec![],
            true_literal: dummy_literal,
            false_literal: !dummy_literal,
        }
    }

    pub fn increase_decision_level(&mut self) {
        self.current_decision_level += 1;
        self.trail_delimiter.push(self.trail.len() as u32);
    }

    pub fn get_decision_level(&self) -> u32 {
        self.current_decision_level
    }

    pub fn grow(&mut self) {
        self.assignment_info.push(AssignmentInfo::Unassigned);
    }

    pub fn num_propositional_variables(&self) -> u32 {
        self.assignment_info.len() as u32
    }

    pub fn get_propositional_variables(&self) -> PropositionalVariableGeneratorIterator {
        //we start from 1 to ignore the special variable with index zero,
        //  which is always assigned at the root to true
        PropositionalVariableGeneratorIterator::new(1, self.num_propositional_variables())
    }

    pub fn pop_trail(&mut self) -> Literal {
        let last_literal = self.trail.pop().expect("Cannot pop empty trail?");
        self.undo_assignment(last_literal.get_propositional_variable());
        last_literal
    }

    pub fn is_variable_assigned_true(&self, variable: PropositionalVariable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { truth_value, .. } => truth_value,
            AssignmentInfo::Unassigned => false,
        }
    }

    pub fn is_variable_assigned_false(&self, variable: PropositionalVariable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { truth_value, .. } => !truth_value,
            AssignmentInfo::Unassigned => false,
        }
    }

    pub fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.is_variable_assigned_true(literal.get_propositional_variable())
        } else {
            self.is_variable_assigned_false(literal.get_propositional_variable())
        }
    }

    pub fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && !self.is_literal_assigned_true(literal)
    }

    pub fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.is_variable_assigned(literal.get_propositional_variable())
    }

    pub fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.is_variable_unassigned(literal.get_propositional_variable())
    }

    pub fn is_variable_unassigned(&self, variable: PropositionalVariable) -> bool {
        self.assignment_info[variable] == AssignmentInfo::Unassigned
    }

    pub fn is_variable_assigned(&self, variable: PropositionalVariable) -> bool {
        self.assignment_info[variable] != AssignmentInfo::Unassigned
    }

    pub fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        if self.is_literal_unassigned(literal) {
            false
        } else {
            self.get_variable_assignment_level(literal.get_propositional_variable()) == 0
        }
    }

    pub fn is_variable_propagated(&self, variable: PropositionalVariable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => false,
            AssignmentInfo::Assigned { reason_code, .. } => reason_code != 0,
        }
    }

    pub fn is_literal_propagated(&self, literal: Literal) -> bool {
        self.is_variable_propagated(literal.get_propositional_variable())
    }

    pub fn is_literal_decision(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && !self.is_literal_propagated(literal)
    }

    pub fn get_variable_assignment_level(&self, variable: PropositionalVariable) -> u32 {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have assignment levels");
            }
            AssignmentInfo::Assigned { decision_level, .. } => decision_level,
        }
    }

    pub fn get_literal_assignment_level(&self, literal: Literal) -> u32 {
        self.get_variable_assignment_level(literal.get_propositional_variable())
    }

    pub fn get_variable_reason_code(&self, variable: PropositionalVariable) -> u32 {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have reason codes");
            }
            AssignmentInfo::Assigned { reason_code, .. } => reason_code,
        }
    }

    pub fn get_literal_reason_code(&self, literal: Literal) -> u32 {
        self.get_variable_reason_code(literal.get_propositional_variable())
    }

    pub fn get_variable_trail_position(&self, variable: PropositionalVariable) -> u32 {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have trail positions");
            }
            AssignmentInfo::Assigned { trail_position, .. } => trail_position,
        }
    }

    pub fn get_literal_trail_position(&self, literal: Literal) -> u32 {
        self.get_variable_trail_position(literal.get_propositional_variable())
    }

    fn make_assignment(&mut self, true_literal: Literal, reason_code: u32) {
        marrow_assert_simple!(self.is_literal_unassigned(true_literal));

        self.assignment_info[true_literal.get_propositional_variable()] =
            AssignmentInfo::Assigned {
                truth_value: true_literal.is_positive(),
                decision_level: self.get_decision_level(),
                trail_position: self.trail.len() as u32,
                reason_code,
            };

        self.trail.push(true_literal);
    }

    pub fn undo_assignment(&mut self, variable: PropositionalVariable) {
        marrow_assert_moderate!(self.is_variable_assigned(variable));

        self.assignment_info[variable] = AssignmentInfo::Unassigned;
    }

    pub fn enqueue_decision_literal(&mut self, decision_literal: Literal) {
        marrow_assert_simple!(!self.is_literal_assigned(decision_literal));

        self.make_assignment(decision_literal, 0);
    }

    pub fn enqueue_propagated_literal(&mut self, propagated_literal: Literal, reason_code: u32) {
        marrow_assert_simple!(!self.is_literal_assigned(propagated_literal));
        marrow_assert_ne_simple!(reason_code, 0);

        self.make_assignment(propagated_literal, reason_code);
    }

    pub fn synchronise(&mut self, new_decision_level: u32) {
        marrow_assert_simple!(new_decision_level < self.current_decision_level);
        marrow_assert_simple!(
            self.trail.len() == (self.trail_delimiter[new_decision_level as usize] as usize),
            "It is expected that the solver would pop the trail before calling this method."
        );

        self.current_decision_level = new_decision_level;
        self.trail_delimiter.truncate(new_decision_level as usize);
    }

    pub fn is_at_the_root_level(&self) -> bool {
        self.current_decision_level == 0
    }

    pub fn num_assigned_propositional_variables(&self) -> u32 {
        self.trail.len() as u32
    }
}

#[derive(PartialEq, Clone, Copy)]
enum AssignmentInfo {
    Assigned {
        truth_value: bool,
        decision_level: u32,
        trail_position: u32,
        reason_code: u32,
    },
    Unassigned,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments_with_variables(num_variables: u32) -> Assignments {
        let mut assignments = Assignments::new();
        for _i in 0..num_variables {
            assignments.grow();
        }
        assignments
    }

    #[test]
    fn test_enqueue_and_query() {
        let mut assignments = assignments_with_variables(3);
        let literal = Literal::new(PropositionalVariable::new(1), true);

        assert!(assignments.is_literal_unassigned(literal));
        assignments.enqueue_decision_literal(literal);
        assert!(assignments.is_literal_assigned_true(literal));
        assert!(assignments.is_literal_assigned_false(!literal));
        assert!(assignments.is_literal_decision(literal));
        assert!(assignments.is_literal_root_assignment(literal));
        assert_eq!(assignments.get_literal_trail_position(literal), 0);
    }

    #[test]
    fn test_trail_levels_and_backtracking() {
        let mut assignments = assignments_with_variables(3);
        let first = Literal::new(PropositionalVariable::new(1), true);
        let second = Literal::new(PropositionalVariable::new(2), false);

        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(first);
        assignments.increase_decision_level();
        assignments.enqueue_propagated_literal(second, 5);

        assert_eq!(assignments.get_literal_assignment_level(first), 1);
        assert_eq!(assignments.get_literal_assignment_level(second), 2);
        assert_eq!(assignments.get_literal_reason_code(second), 5);

        let popped = assignments.pop_trail();
        assert_eq!(popped, second);
        assert!(assignments.is_literal_unassigned(second));
        assignments.synchronise(1);
        assert_eq!(assignments.get_decision_level(), 1);
        assert!(assignments.is_literal_assigned_true(first));
    }
}
