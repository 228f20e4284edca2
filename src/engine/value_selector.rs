use crate::basic_types::PropositionalVariable;

/// Selects the polarity of a decision variable. With phase saving enabled the last assigned
/// polarity is replayed; otherwise the caller-provided preferred polarity is used, defaulting
/// to false. Frozen entries override both, which is used for solution-guided search.
pub struct ValueSelector {
    truth_values: Vec<CandidateTruthAssignment>,
    phase_saving_enabled: bool,
}

struct CandidateTruthAssignment {
    saved_value: bool,
    preferred_value: Option<bool>,
    frozen: bool,
}

impl ValueSelector {
    pub fn new(phase_saving_enabled: bool) -> ValueSelector {
        ValueSelector {
            truth_values: vec![],
            phase_saving_enabled,
        }
    }

    pub fn grow(&mut self) {
        self.truth_values.push(CandidateTruthAssignment {
            saved_value: false,
            preferred_value: None,
            frozen: false,
        });
    }

    pub fn set_phase_saving(&mut self, enabled: bool) {
        self.phase_saving_enabled = enabled;
    }

    pub fn select_value(&self, variable: PropositionalVariable) -> bool {
        let entry = &self.truth_values[variable];
        if entry.frozen {
            entry.saved_value
        } else if self.phase_saving_enabled {
            entry.saved_value
        } else {
            entry.preferred_value.unwrap_or(false)
        }
    }

    //records the outgoing polarity of a variable when it becomes unassigned during backtracking
    pub fn update_if_not_frozen(&mut self, variable: PropositionalVariable, new_truth_value: bool) {
        if !self.truth_values[variable].frozen {
            self.truth_values[variable].saved_value = new_truth_value;
        }
    }

    pub fn update_and_freeze(&mut self, variable: PropositionalVariable, new_truth_value: bool) {
        self.truth_values[variable].saved_value = new_truth_value;
        self.truth_values[variable].frozen = true;
    }

    //a caller hint, consulted when phase saving is disabled and the entry is not frozen
    pub fn set_preferred_value(&mut self, variable: PropositionalVariable, truth_value: bool) {
        self.truth_values[variable].preferred_value = Some(truth_value);
        //seed the saved polarity so that phase saving starts from the hint as well
        if !self.truth_values[variable].frozen {
            self.truth_values[variable].saved_value = truth_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_polarity_is_false() {
        let mut selector = ValueSelector::new(true);
        selector.grow();
        assert!(!selector.select_value(PropositionalVariable::new(0)));
    }

    #[test]
    fn test_phase_saving_replays_last_polarity() {
        let mut selector = ValueSelector::new(true);
        selector.grow();
        let variable = PropositionalVariable::new(0);
        selector.update_if_not_frozen(variable, true);
        assert!(selector.select_value(variable));
    }

    #[test]
    fn test_preferred_polarity_used_without_phase_saving() {
        let mut selector = ValueSelector::new(false);
        selector.grow();
        let variable = PropositionalVariable::new(0);
        selector.set_preferred_value(variable, true);
        selector.update_if_not_frozen(variable, false);
        assert!(selector.select_value(variable));
    }

    #[test]
    fn test_frozen_value_wins() {
        let mut selector = ValueSelector::new(true);
        selector.grow();
        let variable = PropositionalVariable::new(0);
        selector.update_and_freeze(variable, true);
        selector.update_if_not_frozen(variable, false);
        assert!(selector.select_value(variable));
    }
}
