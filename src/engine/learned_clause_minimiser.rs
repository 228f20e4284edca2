use crate::basic_types::{HashMap, HashSet, Literal};
use crate::engine::reasons::compute_reason_literals;
use crate::engine::{Assignments, ClauseAllocator, ConflictAnalysisResult};
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;
use crate::propagators::PseudoBooleanPropagator;

/// The amount of effort spent on shrinking learned clauses after conflict analysis:
/// - `Off` keeps the 1-UIP clause as derived,
/// - `Local` removes literals whose reason is fully covered by the remaining clause literals
///   (self-subsuming resolution against the immediate reason),
/// - `Recursive` removes literals dominated in the implication graph, following a bounded
///   recursive check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinimisationMode {
    Off,
    Local,
    Recursive,
}

impl std::fmt::Display for MinimisationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MinimisationMode::Off => write!(f, "off"),
            MinimisationMode::Local => write!(f, "local"),
            MinimisationMode::Recursive => write!(f, "recursive"),
        }
    }
}

//the implementation of the recursive mode is based on the algorithms from the papers:
//  "Improved conflict-clause minimization leads to improved propositional proof traces.",
//      Allen Van Gelder. SAT'09
//  "Minimizing learned clauses", Niklas Sörensson and Armin Biere, SAT'09
#[derive(Default)]
pub struct LearnedClauseMinimiser {
    current_depth: usize,
    allowed_decision_levels: HashSet<u32>, //could consider direct hashing here
    label_assignments: HashMap<Literal, Option<Label>>,
    num_minimisation_calls: usize,
    num_literals_removed_total: usize,
    num_literals_seen_total: usize,
}

impl LearnedClauseMinimiser {
    /// Shrinks the learned clause in the analysis result. Assumes the asserting literal sits at
    /// index zero; the asserting literal is never removed. The `seen` flags of the conflict
    /// analysis are expected to still be set for the variables of the learned clause, and are
    /// left untouched. The caller re-establishes the backjump invariants afterwards.
    pub fn remove_dominated_literals(
        &mut self,
        mode: MinimisationMode,
        analysis_result: &mut ConflictAnalysisResult,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
        pseudo_boolean_propagator: &PseudoBooleanPropagator,
        seen: &[bool],
    ) {
        if mode == MinimisationMode::Off || analysis_result.learned_literals.len() <= 1 {
            return;
        }

        self.num_minimisation_calls += 1;
        self.num_literals_seen_total += analysis_result.learned_literals.len();
        let num_literals_before_minimisation = analysis_result.learned_literals.len();

        match mode {
            MinimisationMode::Off => unreachable!(),
            MinimisationMode::Local => self.minimise_locally(
                analysis_result,
                assignments,
                clause_allocator,
                pseudo_boolean_propagator,
                seen,
            ),
            MinimisationMode::Recursive => self.minimise_recursively(
                analysis_result,
                assignments,
                clause_allocator,
                pseudo_boolean_propagator,
            ),
        }

        let num_literals_removed =
            num_literals_before_minimisation - analysis_result.learned_literals.len();
        self.num_literals_removed_total += num_literals_removed;
    }

    //a literal is dropped when every literal of its reason is either a root assignment or
    //  already part of the learned clause, resolving the clause with the reason then yields
    //  a strict subset of the original clause
    fn minimise_locally(
        &mut self,
        analysis_result: &mut ConflictAnalysisResult,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
        pseudo_boolean_propagator: &PseudoBooleanPropagator,
        seen: &[bool],
    ) {
        let mut reason_literals: Vec<Literal> = vec![];
        let mut end_position: usize = 1; //the asserting literal must stay
        for i in 1..analysis_result.learned_literals.len() {
            let learned_literal = analysis_result.learned_literals[i];
            //the corresponding trail literal is the negation of the learned clause literal
            let trail_literal = !learned_literal;

            let removable = if assignments.is_literal_decision(trail_literal) {
                false
            } else {
                compute_reason_literals(
                    trail_literal,
                    assignments.get_literal_reason_code(trail_literal),
                    clause_allocator,
                    pseudo_boolean_propagator,
                    assignments,
                    &mut reason_literals,
                );

                reason_literals[1..].iter().all(|reason_literal| {
                    assignments.is_literal_root_assignment(*reason_literal)
                        || seen[reason_literal.get_propositional_variable().index() as usize]
                })
            };

            if !removable {
                analysis_result.learned_literals[end_position] = learned_literal;
                end_position += 1;
            }
        }
        analysis_result.learned_literals.truncate(end_position);
    }

    fn minimise_recursively(
        &mut self,
        analysis_result: &mut ConflictAnalysisResult,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
        pseudo_boolean_propagator: &PseudoBooleanPropagator,
    ) {
        self.initialise(analysis_result, assignments);

        //iterate over each literal and check whether it is a dominated literal
        let mut end_position: usize = 1; //the asserting literal must stay
        for i in 1..analysis_result.learned_literals.len() {
            let learned_literal = analysis_result.learned_literals[i];

            self.compute_label(
                !learned_literal,
                assignments,
                clause_allocator,
                pseudo_boolean_propagator,
            );

            let label = self.get_literal_label(!learned_literal);
            //keep the literal in case it was not deemed redundant,
            //  in the other cases 'end_position' is not incremented
            //  and the literal is effectively removed
            if label == Label::Poison || label == Label::Keep {
                analysis_result.learned_literals[end_position] = learned_literal;
                end_position += 1;
            }
        }
        analysis_result.learned_literals.truncate(end_position);

        self.clean_up();
    }

    fn compute_label(
        &mut self,
        input_literal: Literal,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
        pseudo_boolean_propagator: &PseudoBooleanPropagator,
    ) {
        marrow_assert_moderate!(assignments.is_literal_assigned_true(input_literal));

        self.current_depth += 1;

        if self.is_literal_label_already_computed(input_literal) {
            self.current_depth -= 1;
            return;
        }

        //for performance reasons the analysis stops when many recursive calls are needed
        if self.is_at_max_allowed_depth() {
            self.assign_literal_label(input_literal, Label::Poison);
            self.current_depth -= 1;
            return;
        }

        //at this point the literal is either labelled 'seen' or unlabelled
        //a decision literal that is not part of the original learned clause can never be
        //  removed, the same holds for literals from other decision levels
        if assignments.is_literal_decision(input_literal)
            || !self.is_decision_level_allowed(assignments.get_literal_assignment_level(input_literal))
        {
            self.assign_literal_label(input_literal, Label::Poison);
            self.current_depth -= 1;
            return;
        }

        let mut reason_literals: Vec<Literal> = vec![];
        compute_reason_literals(
            input_literal,
            assignments.get_literal_reason_code(input_literal),
            clause_allocator,
            pseudo_boolean_propagator,
            assignments,
            &mut reason_literals,
        );

        for i in 1..reason_literals.len() {
            let antecedent_literal = !reason_literals[i];

            //root assignments can be safely ignored
            if assignments.is_literal_root_assignment(antecedent_literal) {
                continue;
            }

            //compute the label of the antecedent literal
            self.compute_label(
                antecedent_literal,
                assignments,
                clause_allocator,
                pseudo_boolean_propagator,
            );

            //in case one of the antecedents is Poison, the input literal is not redundant
            if self.get_literal_label(antecedent_literal) == Label::Poison {
                //literals from the original learned clause are labelled Keep,
                //  all other literals cannot be part of the clause and become Poison
                if self.is_literal_assigned_seen(input_literal) {
                    self.assign_literal_label(input_literal, Label::Keep);
                } else {
                    self.assign_literal_label(input_literal, Label::Poison);
                }
                self.current_depth -= 1;
                return;
            }
        }
        //all antecedents of the literal are either Keep or Removable,
        //  meaning this literal is Removable
        self.assign_literal_label(input_literal, Label::Removable);
        self.current_depth -= 1;
    }

    fn is_decision_level_allowed(&self, decision_level: u32) -> bool {
        self.allowed_decision_levels.contains(&decision_level)
    }

    fn mark_decision_level_as_allowed(&mut self, decision_level: u32) {
        let _ = self.allowed_decision_levels.insert(decision_level);
    }

    fn is_literal_assigned_seen(&self, literal: Literal) -> bool {
        let entry = self.label_assignments.get(&literal);
        if let Some(label) = entry {
            label.expect("Stored label is None, error?") == Label::Seen
        } else {
            false
        }
    }

    fn get_literal_label(&self, literal: Literal) -> Label {
        self.label_assignments
            .get(&literal)
            .expect("Cannot ask for a label of an unlabelled literal?")
            .expect("Stored label is None, error?")
    }

    fn assign_literal_label(&mut self, literal: Literal, label: Label) {
        marrow_assert_moderate!(
            !self.label_assignments.contains_key(&literal)
                || self.is_literal_assigned_seen(literal),
            "Cannot assign the label of an already labelled literal"
        );
        let _ = self.label_assignments.insert(literal, Some(label));
    }

    fn is_literal_label_already_computed(&self, literal: Literal) -> bool {
        let entry = self.label_assignments.get(&literal);
        if let Some(label) = entry {
            label.expect("Stored label is None, error?") != Label::Seen
        } else {
            false
        }
    }

    fn initialise(&mut self, analysis_result: &ConflictAnalysisResult, assignments: &Assignments) {
        marrow_assert_simple!(self.current_depth == 0);

        //mark literals from the initial learned clause
        //  the asserting literal is always kept
        let _ = self
            .label_assignments
            .insert(analysis_result.learned_literals[0], Some(Label::Keep));
        //  go through the other literals
        for i in 1..analysis_result.learned_literals.len() {
            let literal = !analysis_result.learned_literals[i];
            //decision literals must be kept
            if assignments.is_literal_decision(literal) {
                self.assign_literal_label(literal, Label::Keep);
            } else {
                self.assign_literal_label(literal, Label::Seen);
            }

            self.mark_decision_level_as_allowed(assignments.get_literal_assignment_level(literal));
        }
    }

    fn clean_up(&mut self) {
        marrow_assert_simple!(self.current_depth == 0);

        self.allowed_decision_levels.clear();
        self.label_assignments.clear();
    }

    fn is_at_max_allowed_depth(&self) -> bool {
        marrow_assert_moderate!(self.current_depth <= 500);
        self.current_depth == 500
    }
}

impl LearnedClauseMinimiser {
    pub fn num_literals_removed_total(&self) -> usize {
        self.num_literals_removed_total
    }

    pub fn num_minimisation_calls(&self) -> usize {
        self.num_minimisation_calls
    }

    pub fn percentage_num_removed_literals_per_clause(&self) -> f64 {
        if self.num_literals_seen_total > 0 {
            self.num_literals_removed_total as f64 / self.num_literals_seen_total as f64
        } else {
            0.0
        }
    }
}

#[derive(PartialEq, Copy, Clone)]
enum Label {
    Seen, //'Present'
    Poison,
    Removable,
    Keep,
}
