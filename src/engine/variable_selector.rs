use super::Assignments;
use crate::basic_types::{KeyValueHeap, PropositionalVariable};

/// Activity-based variable selection (VSIDS): activities are bumped for variables involved in
/// conflict analysis and decayed after every conflict; the next decision variable is the
/// unassigned variable of maximum activity.
pub struct VariableSelector {
    heap: KeyValueHeap,
    increment: f64,
    max_threshold: f64,
    decay_factor: f64,
}

impl VariableSelector {
    pub fn new(decay_factor: f64) -> VariableSelector {
        VariableSelector {
            heap: KeyValueHeap::new(),
            increment: 1.0,
            max_threshold: 1e100,
            decay_factor,
        }
    }

    pub fn bump_activity(&mut self, variable: PropositionalVariable) {
        //rescale the activities if the values get too large
        let activity = self.heap.get_value(variable.index());
        if activity + self.increment >= self.max_threshold {
            self.heap.divide_values(self.max_threshold);
            self.increment /= self.max_threshold;
        }
        //now perform the standard bumping
        self.heap.increment(variable.index(), self.increment);
    }

    pub fn bump_activity_by(&mut self, variable: PropositionalVariable, multiplier: f64) {
        let activity = self.heap.get_value(variable.index());
        if activity + self.increment * multiplier >= self.max_threshold {
            self.heap.divide_values(self.max_threshold);
            self.increment /= self.max_threshold;
        }
        self.heap
            .increment(variable.index(), self.increment * multiplier);
    }

    pub fn restore(&mut self, variable: PropositionalVariable) {
        self.heap.restore_key(variable.index());
    }

    pub fn decay_activities(&mut self) {
        //decaying activities is implemented by increasing the 'increment',
        //  so that future bumps are more impactful,
        //  this is cheaper than dividing each activity value
        self.increment *= 1.0 / self.decay_factor;
    }

    pub fn grow(&mut self) {
        self.heap.grow(0.0);
    }

    pub fn peek_next_variable(
        &mut self,
        assignments: &Assignments,
    ) -> Option<PropositionalVariable> {
        loop {
            if let Some(candidate_variable) = self.heap.peek_max().map(PropositionalVariable::new) {
                //some variables on the heap may already be assigned because a lazy data
                //  structure is used, in case an assigned variable is next, remove it
                //  from the heap and loop again
                if assignments.is_variable_assigned(candidate_variable) {
                    let _ = self.heap.pop_max();
                } else {
                    return Some(candidate_variable);
                }
            //otherwise there are no variables left in the heap
            } else {
                return None;
            }
        }
    }
}
