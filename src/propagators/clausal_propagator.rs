use crate::basic_types::Clause;
use crate::basic_types::ClauseReference;
use crate::basic_types::HashMap;
use crate::basic_types::Literal;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::marrow_assert_simple;

pub struct ClausalPropagator {
    pub watch_lists: Vec<Vec<ClauseWatcher>>,
    pub next_position_on_trail_to_propagate: usize,
}

pub enum PropagationStatusClausal {
    ConflictDetected { reason_code: u32 },
    NoConflictDetected,
}

impl PropagationStatusClausal {
    pub fn no_conflict(&self) -> bool {
        matches!(*self, PropagationStatusClausal::NoConflictDetected)
    }

    pub fn conflict_detected(&self) -> bool {
        !self.no_conflict()
    }
}

impl ClausalPropagator {
    pub fn new() -> ClausalPropagator {
        ClausalPropagator {
            watch_lists: vec![],
            next_position_on_trail_to_propagate: 0,
        }
    }

    pub fn grow(&mut self) {
        //increase the watch list, once for each polarity
        self.watch_lists.push(vec![]);
        self.watch_lists.push(vec![]);
    }

    pub fn start_watching_clause_unchecked(
        &mut self,
        clause: &Clause,
        clause_reference: ClauseReference,
    ) {
        marrow_assert_simple!(clause.len() >= 2);

        self.watch_lists[clause[0]].push(ClauseWatcher {
            cached_literal: clause[1],
            clause_reference,
        });

        self.watch_lists[clause[1]].push(ClauseWatcher {
            cached_literal: clause[0],
            clause_reference,
        });
    }

    pub fn propagate(
        &mut self,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> PropagationStatusClausal {
        //this function is implemented as one long function
        //  dividing it into several smaller functions would normally make sense for readability
        //  however this is a performance hotspot, and if the compiler does not inline the
        //  sub-functions there is a notable performance degradation, so the decision was to
        //  keep one long function
        while self.next_position_on_trail_to_propagate < assignments.trail.len() {
            let true_literal = assignments.trail[self.next_position_on_trail_to_propagate];
            marrow_assert_simple!(assignments.is_literal_assigned_true(true_literal));

            //effectively remove all watches from this true_literal
            //then go through the previous watches one by one and insert them as indicated
            //  (some might be placed back in the watch list of this true_literal)
            //if a conflict takes place, put back the remaining clauses into the watch list
            //  of this true_literal and report the conflict
            //empty watch lists are immediately skipped
            if self.watch_lists[!true_literal].is_empty() {
                self.next_position_on_trail_to_propagate += 1;
                continue;
            }

            //effectively, we are resizing the watch list to size zero for this literal,
            //  and in the loop we will add some of the old watches back
            let mut end_index: usize = 0;
            let mut current_index: usize = 0;
            while current_index < self.watch_lists[!true_literal].len() {
                //inspect if the cached literal is already set to true
                //if so, no need to go further into memory to check the clause
                //often this literal will be true in practice so it is a good heuristic to check
                let cached_literal = self.watch_lists[!true_literal][current_index].cached_literal;
                if assignments.is_literal_assigned_true(cached_literal) {
                    //keep the watcher, the clause is satisfied, no propagation can take place
                    self.watch_lists[!true_literal][end_index] =
                        self.watch_lists[!true_literal][current_index];
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                let watched_clause_reference =
                    self.watch_lists[!true_literal][current_index].clause_reference;

                let watched_clause = clause_allocator.get_mutable_clause(watched_clause_reference);

                //standard clause propagation starts here

                //place the considered literal at position 1 for simplicity
                if watched_clause[0] == !true_literal {
                    watched_clause[0] = watched_clause[1];
                    watched_clause[1] = !true_literal;
                }

                //check the other watched literal to see if the clause is already satisfied
                if assignments.is_literal_assigned_true(watched_clause[0]) {
                    //take the true literal as the new cached literal
                    self.watch_lists[!true_literal][current_index].cached_literal =
                        watched_clause[0];
                    //keep the watcher, the clause is satisfied, no propagation can take place
                    self.watch_lists[!true_literal][end_index] =
                        self.watch_lists[!true_literal][current_index];
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                //look for another nonfalsified literal to replace one of the watched literals
                let mut found_new_watch = false;
                //start from index 2 since we are skipping watched literals
                for i in 2..watched_clause.len() {
                    //find a literal that is either true or unassigned, i.e., not assigned false
                    if !assignments.is_literal_assigned_false(watched_clause[i]) {
                        //replace the watched literal, add the clause to the watch list of the
                        //  new watcher literal
                        watched_clause[1] = watched_clause[i];
                        watched_clause[i] = !true_literal;

                        self.watch_lists[watched_clause[1]].push(ClauseWatcher {
                            cached_literal: watched_clause[0],
                            clause_reference: watched_clause_reference,
                        });

                        found_new_watch = true;
                        break; //no propagation is taking place, go to the next clause
                    }
                }

                if found_new_watch {
                    //note this clause is effectively removed from the watch list of true_literal,
                    //  since we are only incrementing the current index and not copying anything
                    //  to the end_index location
                    current_index += 1;
                    continue;
                }

                //keep the current watch for this literal
                self.watch_lists[!true_literal][end_index] =
                    self.watch_lists[!true_literal][current_index];
                end_index += 1;
                current_index += 1;

                //at this point, nonwatched literals and literal[1] are assigned false
                //there are two scenarios:
                //	watched_clause[0] is unassigned -> propagate the literal to true
                //	watched_clause[0] is assigned false -> conflict
                if assignments.is_literal_unassigned(watched_clause[0]) {
                    assignments
                        .enqueue_propagated_literal(watched_clause[0], watched_clause_reference.id);
                } else {
                    //conflict detected, stop any further propagation and report the conflict
                    //readd the remaining watchers to the watch list
                    while current_index < self.watch_lists[!true_literal].len() {
                        self.watch_lists[!true_literal][end_index] =
                            self.watch_lists[!true_literal][current_index];
                        current_index += 1;
                        end_index += 1;
                    }
                    self.watch_lists[!true_literal].truncate(end_index);
                    return PropagationStatusClausal::ConflictDetected {
                        reason_code: watched_clause_reference.id,
                    };
                }
            }
            self.watch_lists[!true_literal].truncate(end_index);
            self.next_position_on_trail_to_propagate += 1;
        }
        PropagationStatusClausal::NoConflictDetected
    }

    pub fn synchronise(&mut self, trail_size: usize) {
        marrow_assert_simple!(self.next_position_on_trail_to_propagate >= trail_size);
        self.next_position_on_trail_to_propagate = trail_size;
    }

    pub fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_position_on_trail_to_propagate == trail_size
    }

    pub fn remove_clause_consideration(
        &mut self,
        clause: &Clause,
        clause_reference: ClauseReference,
    ) {
        //a simple implementation, in the future it could be worthwhile considering
        //  lazy data structures or batch removals
        let remove_clause_from_watchers =
            |watchers: &mut Vec<ClauseWatcher>, clause_reference: ClauseReference| {
                let index = watchers
                    .iter()
                    .position(|x| x.clause_reference == clause_reference)
                    .expect("The clause must be watched by its watched literals.");
                let _ = watchers.swap_remove(index);
            };

        let watched_literal1 = clause[0];
        let watched_literal2 = clause[1];

        remove_clause_from_watchers(&mut self.watch_lists[watched_literal1], clause_reference);
        remove_clause_from_watchers(&mut self.watch_lists[watched_literal2], clause_reference);
    }
}

//methods for debugging
impl ClausalPropagator {
    pub fn debug_check_state(
        &self,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
    ) -> bool {
        assert!(
            self.watch_lists.len() as u32 == 2 * assignments.num_propositional_variables(),
            "Watch list length is not as expected given the number of propositional variables."
        );

        //check that each clause that appears in the watch list appears exactly twice
        //  note that not every clause in the allocator necessarily appears in the watch list!
        let mut clause_ids: HashMap<ClauseReference, usize> = HashMap::default();

        self.watch_lists.iter().flatten().for_each(|x| {
            *clause_ids.entry(x.clause_reference).or_insert(0) += 1;
        });
        assert!(
            clause_ids.iter().all(|x| *x.1 == 2),
            "There is a clause in the watch list that does not appear exactly twice."
        );

        for literal_code in 0..self.watch_lists.len() {
            let literal = Literal::u32_to_literal(literal_code as u32);
            assert!(self.watch_lists[literal].iter().all(|x| {
                let clause = clause_allocator.get_clause(x.clause_reference);
                clause[0] == literal || clause[1] == literal
            }), "The watches are not correct, i.e., there is a clause in the watch list of a literal that is not a watcher of the clause");
        }

        //check if the propagator missed a falsified clause or a propagation
        clause_ids.iter().for_each(|x| {
            let clause = clause_allocator.get_clause(*x.0);
            assert!(
                !clause
                    .get_literal_slice()
                    .iter()
                    .all(|lit| assignments.is_literal_assigned_false(*lit)),
                "Debugging revealed that the clausal propagator missed a falsified clause."
            );

            let num_falsified_literals = clause
                .get_literal_slice()
                .iter()
                .filter(|lit| assignments.is_literal_assigned_false(**lit))
                .count();

            if num_falsified_literals + 1 == clause.len() as usize {
                let true_literal = clause
                    .get_literal_slice()
                    .iter()
                    .find(|lit| !assignments.is_literal_assigned_false(**lit))
                    .expect("One literal is not falsified.");
                assert!(
                    assignments.is_literal_assigned_true(*true_literal),
                    "Debugging revealed that the clausal propagator missed a propagation."
                );
            }
        });
        true
    }
}

#[derive(Clone, Copy)]
pub struct ClauseWatcher {
    cached_literal: Literal,
    clause_reference: ClauseReference,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::PropositionalVariable;

    struct TestSetup {
        assignments: Assignments,
        clause_allocator: ClauseAllocator,
        propagator: ClausalPropagator,
    }

    impl TestSetup {
        fn with_variables(num_variables: u32) -> TestSetup {
            let mut assignments = Assignments::new();
            let mut propagator = ClausalPropagator::new();
            for _i in 0..num_variables {
                assignments.grow();
                propagator.grow();
            }
            TestSetup {
                assignments,
                clause_allocator: ClauseAllocator::new(),
                propagator,
            }
        }

        fn add_clause(&mut self, literals: Vec<Literal>) -> ClauseReference {
            let reference = self.clause_allocator.create_clause(literals, false);
            self.propagator.start_watching_clause_unchecked(
                self.clause_allocator.get_clause(reference),
                reference,
            );
            reference
        }
    }

    fn literal(index: u32, is_positive: bool) -> Literal {
        Literal::new(PropositionalVariable::new(index), is_positive)
    }

    #[test]
    fn test_unit_propagation_on_binary_clause() {
        let mut setup = TestSetup::with_variables(3);
        let reference = setup.add_clause(vec![literal(1, true), literal(2, true)]);

        setup.assignments.enqueue_decision_literal(literal(1, false));
        let status = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        assert!(status.no_conflict());
        assert!(setup.assignments.is_literal_assigned_true(literal(2, true)));
        assert_eq!(
            setup.assignments.get_literal_reason_code(literal(2, true)),
            reference.id
        );
    }

    #[test]
    fn test_conflict_detection() {
        let mut setup = TestSetup::with_variables(3);
        let reference = setup.add_clause(vec![literal(1, true), literal(2, true)]);

        setup.assignments.enqueue_decision_literal(literal(1, false));
        setup.assignments.enqueue_decision_literal(literal(2, false));
        let status = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        match status {
            PropagationStatusClausal::ConflictDetected { reason_code } => {
                assert_eq!(reason_code, reference.id)
            }
            PropagationStatusClausal::NoConflictDetected => {
                panic!("Expected a conflict on a fully falsified clause.")
            }
        }
    }

    #[test]
    fn test_watch_relocation_avoids_propagation() {
        let mut setup = TestSetup::with_variables(4);
        let _ = setup.add_clause(vec![literal(1, true), literal(2, true), literal(3, true)]);

        setup.assignments.enqueue_decision_literal(literal(1, false));
        let status = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        assert!(status.no_conflict());
        assert!(setup.assignments.is_literal_unassigned(literal(2, true)));
        assert!(setup.assignments.is_literal_unassigned(literal(3, true)));
    }
}
