use log::debug;
use log::info;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

use crate::basic_types::{
    BranchingDecision, ClauseReference, ConstraintOperationError, HashMap, HashSet, Literal,
    PropositionalVariable, Solution, SolverExecutionFlag, Stopwatch, WeightedLiteral,
};
use crate::engine::reasons::compute_reason_literals;
use crate::marrow_assert_moderate;
use crate::marrow_assert_ne_simple;
use crate::marrow_assert_simple;
use crate::propagators::{
    ClausalPropagator, PbConstraintAttachmentOutcome, PbHandlerType, PropagationStatusClausal,
    PropagationStatusPb, PseudoBooleanPropagator,
};

use super::{
    Assignments, ClauseAllocator, LearnedClauseMinimiser, MinimisationMode, RestartOptions,
    RestartStrategy, ValueSelector, VariableSelector,
};

/// A CDCL solver over clauses and native pseudo-Boolean constraints. Constraints are added at
/// the root level; `solve` and `solve_under_assumptions` drive the search. The solver owns all
/// variable tables, clauses and watch lists; encoders and optimisers borrow it per call.
pub struct PseudoBooleanSolver {
    state: SolverState,
    assignments: Assignments,
    clause_allocator: ClauseAllocator,
    clausal_propagator: ClausalPropagator,
    pseudo_boolean_propagator: PseudoBooleanPropagator,
    variable_selector: VariableSelector,
    value_selector: ValueSelector,
    restart_strategy: RestartStrategy,
    learned_clause_minimiser: LearnedClauseMinimiser,
    permanent_clauses: Vec<ClauseReference>,
    learned_clauses: Vec<ClauseReference>,
    assumptions: Vec<Literal>,
    seen: Vec<bool>,
    counters: Counters,
    parameters: SolverInternalParameters,
    clause_bump_increment: f32,
    random_generator: SmallRng,
    stopwatch: Stopwatch,
}

/// Runtime configuration of the solver. The options mirror the setters the solver offers;
/// construct with `Default::default()` and override the fields of interest.
pub struct SolverOptions {
    pub restart_options: RestartOptions,
    /// The number of learned clauses that can be added to the database before reduction is
    /// triggered. The limit grows by the growth factor after every reduction.
    pub learned_clause_limit: u64,
    pub learned_clause_limit_growth_factor: f64,
    pub learned_clause_sorting_strategy: LearnedClauseSortingStrategy,
    pub clause_activity_decay_factor: f32,
    pub variable_activity_decay_factor: f64,
    pub minimisation_mode: MinimisationMode,
    pub phase_saving: bool,
    pub forward_subsumption: bool,
    pub backward_subsumption: bool,
    /// The probability of taking a uniformly random decision variable instead of the variable
    /// of maximum activity.
    pub random_decision_frequency: f64,
    pub random_seed: u64,
    pub pb_handler_type: PbHandlerType,
    /// Verifies every reported solution against all registered constraints. Debugging aid.
    pub model_check: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            restart_options: RestartOptions::default(),
            learned_clause_limit: 4000,
            learned_clause_limit_growth_factor: 1.1,
            learned_clause_sorting_strategy: LearnedClauseSortingStrategy::Lbd,
            clause_activity_decay_factor: 0.999,
            variable_activity_decay_factor: 0.95,
            minimisation_mode: MinimisationMode::Recursive,
            phase_saving: true,
            forward_subsumption: false,
            backward_subsumption: false,
            random_decision_frequency: 0.0,
            random_seed: 42,
            pb_handler_type: PbHandlerType::Counter,
            model_check: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LearnedClauseSortingStrategy {
    Activity,
    Lbd,
}

impl std::fmt::Display for LearnedClauseSortingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearnedClauseSortingStrategy::Activity => write!(f, "activity"),
            LearnedClauseSortingStrategy::Lbd => write!(f, "lbd"),
        }
    }
}

struct SolverInternalParameters {
    learned_clause_limit: u64,
    learned_clause_limit_growth_factor: f64,
    learned_clause_sorting_strategy: LearnedClauseSortingStrategy,
    max_clause_activity: f32,
    clause_activity_decay_factor: f32,
    minimisation_mode: MinimisationMode,
    forward_subsumption: bool,
    backward_subsumption: bool,
    random_decision_frequency: f64,
    model_check: bool,
}

//methods that offer basic functionality
impl PseudoBooleanSolver {
    pub fn new(options: SolverOptions) -> PseudoBooleanSolver {
        let mut solver = PseudoBooleanSolver {
            state: SolverState::new(),
            assignments: Assignments::new(),
            clause_allocator: ClauseAllocator::new(),
            clausal_propagator: ClausalPropagator::new(),
            pseudo_boolean_propagator: PseudoBooleanPropagator::new(options.pb_handler_type),
            variable_selector: VariableSelector::new(options.variable_activity_decay_factor),
            value_selector: ValueSelector::new(options.phase_saving),
            restart_strategy: RestartStrategy::new(options.restart_options),
            learned_clause_minimiser: LearnedClauseMinimiser::default(),
            permanent_clauses: vec![],
            learned_clauses: vec![],
            assumptions: vec![],
            seen: vec![],
            counters: Counters::default(),
            parameters: SolverInternalParameters {
                learned_clause_limit: options.learned_clause_limit,
                learned_clause_limit_growth_factor: options.learned_clause_limit_growth_factor,
                learned_clause_sorting_strategy: options.learned_clause_sorting_strategy,
                max_clause_activity: 1e20,
                clause_activity_decay_factor: options.clause_activity_decay_factor,
                minimisation_mode: options.minimisation_mode,
                forward_subsumption: options.forward_subsumption,
                backward_subsumption: options.backward_subsumption,
                random_decision_frequency: options.random_decision_frequency,
                model_check: options.model_check,
            },
            clause_bump_increment: 1.0,
            random_generator: SmallRng::seed_from_u64(options.random_seed),
            stopwatch: Stopwatch::new(i64::MAX),
        };

        //we introduce a dummy variable set to true at the root level
        //  this is useful for convenience when a fact needs to be expressed that is always true,
        //  e.g., it serves as the constant-true literal of the reification encoder
        let root_variable = solver.new_variable();
        let true_literal = Literal::new(root_variable, true);

        solver.assignments.true_literal = true_literal;
        solver.assignments.false_literal = !true_literal;
        solver.assignments.enqueue_decision_literal(true_literal);
        solver.propagate_enqueued();

        solver
    }

    pub fn new_variable(&mut self) -> PropositionalVariable {
        let new_variable =
            PropositionalVariable::new(self.assignments.num_propositional_variables());

        //all per-variable structures grow in lockstep
        self.assignments.grow();
        self.clausal_propagator.grow();
        self.pseudo_boolean_propagator.grow();
        self.variable_selector.grow();
        self.value_selector.grow();
        self.seen.push(false);

        new_variable
    }

    pub fn new_variables(&mut self, num_variables: u32) -> Vec<PropositionalVariable> {
        (0..num_variables).map(|_i| self.new_variable()).collect()
    }

    pub fn num_propositional_variables(&self) -> u32 {
        self.assignments.num_propositional_variables()
    }

    pub fn get_true_literal(&self) -> Literal {
        self.assignments.true_literal
    }

    pub fn get_false_literal(&self) -> Literal {
        self.assignments.false_literal
    }

    pub fn get_state(&self) -> &SolverState {
        &self.state
    }

    pub fn get_propositional_assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn get_solution(&self) -> Solution {
        marrow_assert_simple!(
            self.state.has_solution(),
            "Cannot take a solution snapshot without a solution in the solver."
        );
        Solution::new(&self.assignments)
    }

    pub fn get_counters(&self) -> &Counters {
        &self.counters
    }

    pub fn solve(&mut self, time_limit_in_seconds: i64) -> SolverExecutionFlag {
        let dummy_assumptions: Vec<Literal> = vec![];
        self.solve_under_assumptions(&dummy_assumptions, time_limit_in_seconds)
    }

    pub fn solve_under_assumptions(
        &mut self,
        assumptions: &[Literal],
        time_limit_in_seconds: i64,
    ) -> SolverExecutionFlag {
        if self.state.is_infeasible() {
            //infeasibility detected at the root is permanent, no search is needed
            return SolverExecutionFlag::Infeasible;
        }

        self.initialise(assumptions, time_limit_in_seconds);
        self.solve_internal()
    }

    /// After `solve_under_assumptions` reports infeasibility under the assumptions, extracts a
    /// subset of the assumptions that cannot be satisfied together (an unsat core).
    pub fn extract_core(&mut self) -> Vec<Literal> {
        marrow_assert_simple!(
            self.state.is_infeasible_under_assumptions(),
            "Cannot extract core unless the solver is in the infeasible-under-assumptions state."
        );

        let violated_assumption = self.state.get_violated_assumption();
        let mut core = vec![violated_assumption];

        //the negation of the violated assumption was derived from the other assumptions,
        //  walk the implication graph backwards and collect the assumption literals involved,
        //  following the scheme of Minisat's final conflict analysis
        self.seen[(!violated_assumption).get_propositional_variable().index() as usize] = true;
        let mut reason_literals: Vec<Literal> = vec![];
        for trail_index in (0..self.assignments.trail.len()).rev() {
            let trail_literal = self.assignments.trail[trail_index];
            let variable_index = trail_literal.get_propositional_variable().index() as usize;
            if !self.seen[variable_index] {
                continue;
            }
            self.seen[variable_index] = false;

            if self.assignments.is_literal_root_assignment(trail_literal) {
                continue;
            }

            if self.assignments.is_literal_decision(trail_literal) {
                //decisions on the trail are assumptions at this point of the search
                core.push(trail_literal);
            } else {
                compute_reason_literals(
                    trail_literal,
                    self.assignments.get_literal_reason_code(trail_literal),
                    &self.clause_allocator,
                    &self.pseudo_boolean_propagator,
                    &self.assignments,
                    &mut reason_literals,
                );
                for reason_literal in reason_literals[1..].iter() {
                    if !self.assignments.is_literal_root_assignment(*reason_literal) {
                        self.seen
                            [reason_literal.get_propositional_variable().index() as usize] = true;
                    }
                }
            }
        }

        core
    }

    pub fn restore_state_at_root(&mut self) {
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        if self.state.has_solution()
            || self.state.timeout()
            || self.state.is_infeasible_under_assumptions()
        {
            self.state.declare_ready();
        }
    }

    /// Freezes the polarity of every assigned variable to its value in the current solution,
    /// so that the next search attempt starts out towards the previous solution.
    pub fn set_solution_guided_search(&mut self) {
        marrow_assert_simple!(
            self.state.has_solution(),
            "Cannot set solution-guided search without a solution in the solver."
        );

        for variable in self.assignments.get_propositional_variables() {
            //note: variables created after calling this method may follow a different strategy
            let new_truth_value = self.assignments.is_variable_assigned_true(variable);
            self.value_selector
                .update_and_freeze(variable, new_truth_value);
        }
    }

    pub fn set_fixed_phases_for_variables(&mut self, literals: &[Literal]) {
        for literal in literals {
            self.value_selector
                .update_and_freeze(literal.get_propositional_variable(), literal.is_positive());
        }
    }

    pub fn log_statistics(&self) {
        info!(
            "Search statistics: {} decisions, {} conflicts, {} propagations, {} restarts, {} learned unit clauses, {} clause database reductions",
            self.counters.num_decisions,
            self.counters.num_conflicts,
            self.counters.num_propagations,
            self.restart_strategy.num_restarts(),
            self.counters.num_unit_clauses_learned,
            self.counters.num_learned_clause_reductions,
        );
    }
}

//methods for changing the solver configuration
impl PseudoBooleanSolver {
    pub fn set_restart_options(&mut self, restart_options: RestartOptions) {
        self.restart_strategy = RestartStrategy::new(restart_options);
    }

    pub fn set_minimisation_mode(&mut self, mode: MinimisationMode) {
        self.parameters.minimisation_mode = mode;
    }

    pub fn set_phase_saving(&mut self, enabled: bool) {
        self.value_selector.set_phase_saving(enabled);
    }

    pub fn set_subsumption(&mut self, forward: bool, backward: bool) {
        self.parameters.forward_subsumption = forward;
        self.parameters.backward_subsumption = backward;
    }

    pub fn set_random_decision_frequency(&mut self, frequency: f64) {
        marrow_assert_simple!((0.0..=1.0).contains(&frequency));
        self.parameters.random_decision_frequency = frequency;
    }

    pub fn set_random_seed(&mut self, random_seed: u64) {
        self.random_generator = SmallRng::seed_from_u64(random_seed);
    }

    pub fn set_learned_clause_limit(&mut self, limit: u64) {
        self.parameters.learned_clause_limit = limit;
    }

    pub fn set_learned_clause_limit_growth_factor(&mut self, growth_factor: f64) {
        marrow_assert_simple!(growth_factor >= 1.0);
        self.parameters.learned_clause_limit_growth_factor = growth_factor;
    }

    pub fn set_learned_clause_sorting_strategy(&mut self, strategy: LearnedClauseSortingStrategy) {
        self.parameters.learned_clause_sorting_strategy = strategy;
    }

    pub fn set_preferred_polarity(&mut self, variable: PropositionalVariable, truth_value: bool) {
        self.value_selector.set_preferred_value(variable, truth_value);
    }

    /// Bumps the activity of a variable by a multiple of the current increment. Used by the
    /// optimiser to steer the first decisions towards the objective variables.
    pub fn bump_variable_activity(&mut self, variable: PropositionalVariable, multiplier: f64) {
        self.variable_selector.bump_activity_by(variable, multiplier);
    }

    pub fn set_model_check(&mut self, enabled: bool) {
        self.parameters.model_check = enabled;
    }

    /// The handler type can only be changed while no pseudo-Boolean constraints are present.
    pub fn set_pb_handler_type(&mut self, handler_type: PbHandlerType) {
        marrow_assert_simple!(
            self.pseudo_boolean_propagator.num_constraints() == 0,
            "The pseudo-Boolean handler cannot be changed once constraints are attached."
        );
        self.pseudo_boolean_propagator = PseudoBooleanPropagator::new(handler_type);
        for _i in 0..self.assignments.num_propositional_variables() {
            self.pseudo_boolean_propagator.grow();
        }
    }
}

//methods that serve as the main building blocks of the search
impl PseudoBooleanSolver {
    fn initialise(&mut self, assumptions: &[Literal], time_limit_in_seconds: i64) {
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }

        self.state.declare_solving();
        self.stopwatch.reset(time_limit_in_seconds);
        self.assumptions = assumptions.to_owned();
        let num_variables = self.assignments.num_propositional_variables() as usize;
        self.seen.resize(num_variables, false);
    }

    fn solve_internal(&mut self) -> SolverExecutionFlag {
        loop {
            if self.stopwatch.get_remaining_time_budget() <= 0 {
                if self.assignments.get_decision_level() > 0 {
                    self.backtrack(0);
                }
                self.state.declare_timeout();
                return SolverExecutionFlag::Timeout;
            }

            self.propagate_enqueued();

            if self.state.no_conflict() {
                if self.restart_strategy.should_restart() {
                    self.perform_restart_during_search();
                }

                self.assignments.increase_decision_level();

                match self.get_next_branching_decision() {
                    Some(BranchingDecision::Assumption { assumption_literal }) => {
                        //Case 1: the assumption is unassigned, assign it
                        if self.assignments.is_literal_unassigned(assumption_literal) {
                            self.assignments
                                .enqueue_decision_literal(assumption_literal);
                        //Case 2: the assumption has already been set to true
                        //  this happens when other assumptions propagated the literal
                        //  or the assumption is already true at the root, in this case do nothing:
                        //  the solver then increases the decision level without a decision literal,
                        //  keeping the convention that the i-th assumption is at decision level i+1
                        } else if self.assignments.is_literal_assigned_true(assumption_literal) {
                        }
                        //Case 3: the assumption literal is in conflict with the input assumptions,
                        //  which means the instance is infeasible under the current assumptions
                        else {
                            self.state
                                .declare_infeasible_under_assumptions(assumption_literal);
                            return SolverExecutionFlag::InfeasibleUnderAssumptions;
                        }
                    }
                    Some(BranchingDecision::StandardDecision { decision_literal }) => {
                        self.counters.num_decisions += 1;
                        self.assignments.enqueue_decision_literal(decision_literal);
                    }
                    None => {
                        self.state.declare_solution_found();
                        if self.parameters.model_check {
                            self.debug_check_model();
                        }
                        return SolverExecutionFlag::Feasible;
                    }
                }
            } else {
                if self.assignments.is_at_the_root_level() {
                    self.state.declare_infeasible();
                    return SolverExecutionFlag::Infeasible;
                }

                let analysis_result = self.analyse_conflict();
                self.counters.num_unit_clauses_learned +=
                    (analysis_result.learned_literals.len() == 1) as u64;
                self.process_conflict_analysis_result(analysis_result);

                self.state.declare_solving();

                self.decay_clause_activities();
                self.variable_selector.decay_activities();
                self.restart_strategy.notify_conflict();
                self.counters.num_conflicts += 1;
            }
        }
    }

    fn get_next_branching_decision(&mut self) -> Option<BranchingDecision> {
        //by convention the i-th assumption literal is assigned at decision level i+1
        let current_decision_level = self.assignments.get_decision_level() as usize;
        if current_decision_level <= self.assumptions.len() {
            let assumption_literal = self.assumptions[current_decision_level - 1];
            return Some(BranchingDecision::Assumption { assumption_literal });
        }

        //with the configured probability a uniformly random unassigned variable is selected
        let random_frequency = self.parameters.random_decision_frequency;
        if random_frequency > 0.0 && self.random_generator.gen_bool(random_frequency) {
            if let Some(decision_variable) = self.get_random_unassigned_variable() {
                let selected_value = self.value_selector.select_value(decision_variable);
                return Some(BranchingDecision::StandardDecision {
                    decision_literal: Literal::new(decision_variable, selected_value),
                });
            }
        }

        if let Some(decision_variable) = self
            .variable_selector
            .peek_next_variable(&self.assignments)
        {
            let selected_value = self.value_selector.select_value(decision_variable);
            let decision_literal = Literal::new(decision_variable, selected_value);

            marrow_assert_moderate!(self.assignments.is_literal_unassigned(decision_literal));

            Some(BranchingDecision::StandardDecision { decision_literal })
        } else {
            None
        }
    }

    fn get_random_unassigned_variable(&mut self) -> Option<PropositionalVariable> {
        let num_variables = self.assignments.num_propositional_variables();
        let start_index = self.random_generator.gen_range(0..num_variables);
        for offset in 0..num_variables {
            let variable = PropositionalVariable::new((start_index + offset) % num_variables);
            if self.assignments.is_variable_unassigned(variable) {
                return Some(variable);
            }
        }
        None
    }

    fn propagate_enqueued(&mut self) {
        let num_assigned_variables_old = self.assignments.num_assigned_propositional_variables();

        loop {
            //the clausal propagator is the cheaper of the two and always goes first
            let clausal_status = self
                .clausal_propagator
                .propagate(&mut self.assignments, &mut self.clause_allocator);

            if let PropagationStatusClausal::ConflictDetected { reason_code } = clausal_status {
                self.state.declare_conflict(reason_code);
                break;
            }

            let pb_status = self
                .pseudo_boolean_propagator
                .propagate(&mut self.assignments);

            if let PropagationStatusPb::ConflictDetected { constraint_index } = pb_status {
                let reason_code = self
                    .pseudo_boolean_propagator
                    .get_reason_code(constraint_index);
                self.state.declare_conflict(reason_code);
                break;
            }

            //pseudo-Boolean propagation may have extended the trail,
            //  in that case the clausal propagator goes again
            if self.is_propagation_complete() {
                break;
            }
        }

        self.counters.num_propagations += self.assignments.num_assigned_propositional_variables()
            as u64
            - num_assigned_variables_old as u64;
    }

    pub fn is_propagation_complete(&self) -> bool {
        let trail_size = self.assignments.trail.len();
        self.clausal_propagator.is_propagation_complete(trail_size)
            && self
                .pseudo_boolean_propagator
                .is_propagation_complete(trail_size)
    }

    fn backtrack(&mut self, backtrack_level: u32) {
        marrow_assert_simple!(backtrack_level < self.assignments.get_decision_level());

        let num_assignments_for_removal = self.assignments.trail.len()
            - self.assignments.trail_delimiter[backtrack_level as usize] as usize;

        for _i in 0..num_assignments_for_removal {
            let trail_position = self.assignments.trail.len() - 1;
            let last_literal = self.assignments.pop_trail();

            self.pseudo_boolean_propagator
                .notify_literal_unassigned(last_literal, trail_position);

            self.variable_selector
                .restore(last_literal.get_propositional_variable());

            //phase saving records the outgoing polarity
            self.value_selector.update_if_not_frozen(
                last_literal.get_propositional_variable(),
                last_literal.is_positive(),
            );
        }

        self.assignments.synchronise(backtrack_level);

        let trail_size = self.assignments.trail.len();
        self.clausal_propagator.synchronise(trail_size);
        self.pseudo_boolean_propagator.synchronise(trail_size);
    }

    fn perform_restart_during_search(&mut self) {
        debug!(
            "Restarting after {} conflicts",
            self.counters.num_conflicts
        );

        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }

        self.shrink_learned_clause_database_if_needed();

        self.restart_strategy.notify_restart();
    }

    fn analyse_conflict(&mut self) -> ConflictAnalysisResult {
        marrow_assert_simple!(self.state.conflict_detected());
        marrow_assert_simple!(
            self.seen.len() as u32 == self.assignments.num_propositional_variables()
        );

        let conflict_reason_code = self.state.get_conflict_reason_code();

        let mut analysis_result = ConflictAnalysisResult {
            //the convention is to place the asserting literal at index zero,
            //  space is allocated for it now with the true literal as a placeholder
            learned_literals: vec![self.assignments.true_literal],
            backjump_level: 0,
        };

        let current_decision_level = self.assignments.get_decision_level();
        let mut num_current_decision_level_literals: u32 = 0;
        let mut next_trail_index = self.assignments.trail.len() - 1;
        let mut next_literal: Option<Literal> = None; //none signals the first iteration, where the conflicting constraint is used
        let mut reason_literals: Vec<Literal> = vec![];

        loop {
            if let Some(propagated_literal) = next_literal {
                let reason_code = self.assignments.get_literal_reason_code(propagated_literal);
                self.update_clause_lbd_and_bump_activity(reason_code);
                compute_reason_literals(
                    propagated_literal,
                    reason_code,
                    &self.clause_allocator,
                    &self.pseudo_boolean_propagator,
                    &self.assignments,
                    &mut reason_literals,
                );
            } else {
                self.update_clause_lbd_and_bump_activity(conflict_reason_code);
                if self
                    .clause_allocator
                    .is_reason_code_linked_to_a_clause(conflict_reason_code)
                {
                    let conflict_clause = self
                        .clause_allocator
                        .get_clause(ClauseReference {
                            id: conflict_reason_code,
                        });
                    reason_literals.clear();
                    reason_literals.extend_from_slice(conflict_clause.get_literal_slice());
                } else {
                    let constraint_index = self
                        .pseudo_boolean_propagator
                        .get_constraint_index(conflict_reason_code);
                    self.pseudo_boolean_propagator.explain_conflict(
                        constraint_index,
                        &self.assignments,
                        &mut reason_literals,
                    );
                }
            }

            //process the reason literals, i.e., perform resolution and update the internal state
            //  index zero is skipped in case the reason represents a propagation
            let start_index = next_literal.is_some() as usize;
            for index in start_index..reason_literals.len() {
                let reason_literal = reason_literals[index];
                let variable = reason_literal.get_propositional_variable();
                //only consider non-root assignments that have not been considered before
                if !self.assignments.is_literal_root_assignment(reason_literal)
                    && !self.seen[variable.index() as usize]
                {
                    //mark the variable as seen so that it is not processed more than once
                    self.seen[variable.index() as usize] = true;

                    self.variable_selector.bump_activity(variable);

                    let literal_decision_level =
                        self.assignments.get_literal_assignment_level(reason_literal);

                    if literal_decision_level == current_decision_level {
                        num_current_decision_level_literals += 1;
                    } else {
                        //literals from previous decision levels enter the learned clause
                        analysis_result.learned_literals.push(reason_literal);
                    }
                }
            }

            //find the next literal on the trail to resolve with:
            //  expand a node of the current decision level, i.e., find a literal that has been
            //  seen during the analysis, literals that have not been seen are not relevant
            //  for this conflict (recall that each literal is on the trail at most once)
            while !self.seen[self.assignments.trail[next_trail_index]
                .get_propositional_variable()
                .index() as usize]
            {
                marrow_assert_moderate!(next_trail_index > 0);
                next_trail_index -= 1;
            }

            //make appropriate adjustments to prepare for the next iteration
            let trail_literal = self.assignments.trail[next_trail_index];
            //the same literal cannot be encountered more than once on the trail,
            //  so the flag can be cleared here
            self.seen[trail_literal.get_propositional_variable().index() as usize] = false;
            num_current_decision_level_literals -= 1;
            next_literal = Some(trail_literal);
            if next_trail_index > 0 {
                next_trail_index -= 1;
            }

            //once the counter hits zero the 1UIP has been found
            if num_current_decision_level_literals == 0 {
                break;
            }
        }
        analysis_result.learned_literals[0] =
            !next_literal.expect("At least one iteration has been performed.");

        //remember the variables of the learned clause so that the seen flags of literals
        //  removed by minimisation can be cleared as well
        let marked_variables: Vec<PropositionalVariable> = analysis_result
            .learned_literals
            .iter()
            .map(|literal| literal.get_propositional_variable())
            .collect();

        self.learned_clause_minimiser.remove_dominated_literals(
            self.parameters.minimisation_mode,
            &mut analysis_result,
            &self.assignments,
            &self.clause_allocator,
            &self.pseudo_boolean_propagator,
            &self.seen,
        );

        for variable in marked_variables {
            self.seen[variable.index() as usize] = false;
        }

        //the literal of the highest decision level (excluding the asserting literal) must be
        //  placed at index one to prepare the clause for watching, the backjump level is the
        //  level of that literal
        if analysis_result.learned_literals.len() > 1 {
            let mut highest_level_index = 1;
            let mut highest_level = self
                .assignments
                .get_literal_assignment_level(analysis_result.learned_literals[1]);
            for index in 2..analysis_result.learned_literals.len() {
                let level = self
                    .assignments
                    .get_literal_assignment_level(analysis_result.learned_literals[index]);
                if level > highest_level {
                    highest_level = level;
                    highest_level_index = index;
                }
            }
            analysis_result.learned_literals.swap(1, highest_level_index);
            analysis_result.backjump_level = highest_level;
        } else {
            analysis_result.backjump_level = 0;
        }

        analysis_result
    }

    //changes the state based on the conflict analysis result given as input,
    //i.e., adds the learned clause to the database, backtracks, and enqueues the asserting
    //literal. Note that no propagation is done, this is left to the solver
    fn process_conflict_analysis_result(&mut self, analysis_result: ConflictAnalysisResult) {
        //unit clauses are treated in a special way:
        //  they are added as root assignments rather than as clauses
        if analysis_result.learned_literals.len() == 1 {
            self.backtrack(0);
            let unit_literal = analysis_result.learned_literals[0];
            marrow_assert_simple!(
                self.assignments.is_literal_unassigned(unit_literal),
                "Do not expect to learn a literal that is already set."
            );

            self.assignments.enqueue_decision_literal(unit_literal);
        } else {
            self.backtrack(analysis_result.backjump_level);

            let asserting_literal = analysis_result.learned_literals[0];

            let clause_reference = self
                .clause_allocator
                .create_clause(analysis_result.learned_literals, true);
            self.learned_clauses.push(clause_reference);
            self.clausal_propagator.start_watching_clause_unchecked(
                self.clause_allocator.get_clause(clause_reference),
                clause_reference,
            );

            self.assignments
                .enqueue_propagated_literal(asserting_literal, clause_reference.id);
        }
    }

    fn debug_check_model(&self) {
        marrow_assert_simple!(self.state.has_solution());

        for clause_reference in &self.permanent_clauses {
            let clause = self.clause_allocator.get_clause(*clause_reference);
            assert!(
                clause
                    .get_literal_slice()
                    .iter()
                    .any(|literal| self.assignments.is_literal_assigned_true(*literal)),
                "Model check failed: a clause is not satisfied by the reported model."
            );
        }

        for constraint_index in 0..self.pseudo_boolean_propagator.num_constraints() {
            assert!(
                self.pseudo_boolean_propagator.debug_is_constraint_satisfied(
                    constraint_index as u32,
                    |literal| self.assignments.is_literal_assigned_true(literal)
                ),
                "Model check failed: a pseudo-Boolean constraint is not satisfied by the reported model."
            );
        }
    }
}

//methods for managing the learned clause database and activities
impl PseudoBooleanSolver {
    fn shrink_learned_clause_database_if_needed(&mut self) {
        marrow_assert_moderate!(
            self.assignments.is_at_the_root_level(),
            "Learned clause reductions can only be done at the root level."
        );

        if self.learned_clauses.len() <= self.parameters.learned_clause_limit as usize {
            return;
        }

        //sort the learned clauses such that the 'good' clauses are in the front
        let clause_allocator = &self.clause_allocator;
        let sorting_strategy = self.parameters.learned_clause_sorting_strategy;
        self.learned_clauses
            .sort_unstable_by(|clause_reference1, clause_reference2| {
                let clause1 = clause_allocator.get_clause(*clause_reference1);
                let clause2 = clause_allocator.get_clause(*clause_reference2);

                match sorting_strategy {
                    LearnedClauseSortingStrategy::Activity => {
                        //note that clause1 and clause2 are reversed, a higher activity is better
                        clause2
                            .get_activity()
                            .partial_cmp(&clause1.get_activity())
                            .expect("Clause activities are never NaN.")
                    }
                    LearnedClauseSortingStrategy::Lbd => {
                        if clause1.get_lbd() != clause2.get_lbd() {
                            clause1.get_lbd().cmp(&clause2.get_lbd())
                        } else {
                            clause2
                                .get_activity()
                                .partial_cmp(&clause1.get_activity())
                                .expect("Clause activities are never NaN.")
                        }
                    }
                }
            });

        //the clauses at the back of the array are the 'bad' clauses, drop the worse half
        let mut num_clauses_to_remove = self.learned_clauses.len() / 2;
        let mut index = self.learned_clauses.len();
        while index > 0 && num_clauses_to_remove > 0 {
            index -= 1;
            let clause_reference = self.learned_clauses[index];

            //binary clauses are cheap to keep and valuable, they are never deleted
            if self.clause_allocator[clause_reference].len() == 2 {
                continue;
            }

            //clauses protected by a recent lbd improvement get one round of grace
            if self.clause_allocator[clause_reference].is_protected_against_deletion() {
                self.clause_allocator[clause_reference].clear_protection_against_deletion();
                continue;
            }

            //locked clauses, i.e., clauses that are the reason of a current assignment,
            //  cannot be removed
            if self.is_clause_locked(clause_reference) {
                continue;
            }

            //remove the reference from the learned clause vector,
            //  then detach and delete the clause
            //  (swap_remove moves in a clause that has already been inspected)
            let _ = self.learned_clauses.swap_remove(index);

            self.clausal_propagator.remove_clause_consideration(
                &self.clause_allocator[clause_reference],
                clause_reference,
            );
            self.clause_allocator.delete_clause(clause_reference);

            num_clauses_to_remove -= 1;
        }

        self.counters.num_learned_clause_reductions += 1;
        self.parameters.learned_clause_limit = (self.parameters.learned_clause_limit as f64
            * self.parameters.learned_clause_limit_growth_factor)
            as u64;

        debug!(
            "Learned clause database reduced to {} clauses, next reduction at {}",
            self.learned_clauses.len(),
            self.parameters.learned_clause_limit
        );
    }

    fn is_clause_locked(&self, clause_reference: ClauseReference) -> bool {
        let propagated_literal = self.clause_allocator[clause_reference][0];
        self.assignments.is_literal_assigned_true(propagated_literal)
            && self.assignments.is_literal_propagated(propagated_literal)
            && self.assignments.get_literal_reason_code(propagated_literal)
                == clause_reference.id
    }

    fn update_clause_lbd_and_bump_activity(&mut self, reason_code: u32) {
        if !self
            .clause_allocator
            .is_reason_code_linked_to_a_clause(reason_code)
        {
            return;
        }
        let clause_reference = ClauseReference { id: reason_code };
        if self.clause_allocator.get_clause(clause_reference).is_learned()
            && self.clause_allocator.get_clause(clause_reference).get_lbd() > 2
        {
            self.bump_clause_activity(clause_reference);
            self.update_lbd(clause_reference);
        }
    }

    fn update_lbd(&mut self, clause_reference: ClauseReference) {
        let new_lbd = self
            .compute_lbd_for_literals(self.clause_allocator[clause_reference].get_literal_slice());
        if new_lbd < self.clause_allocator[clause_reference].get_lbd() {
            self.clause_allocator[clause_reference].update_lbd(new_lbd);
            self.clause_allocator[clause_reference].mark_protection_against_deletion();
        }
    }

    fn compute_lbd_for_literals(&self, literals: &[Literal]) -> u32 {
        marrow_assert_moderate!(
            literals
                .iter()
                .all(|literal| self.assignments.is_literal_assigned(*literal)),
            "Cannot compute LBD if not all literals are assigned."
        );
        //the LBD is the number of distinct decision levels in the clause
        let mut levels: Vec<u32> = literals
            .iter()
            .map(|literal| self.assignments.get_literal_assignment_level(*literal))
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels.len() as u32
    }

    fn bump_clause_activity(&mut self, clause_reference: ClauseReference) {
        //rescale all activities in case bumping would exceed the maximum value
        if self
            .clause_allocator
            .get_clause(clause_reference)
            .get_activity()
            + self.clause_bump_increment
            > self.parameters.max_clause_activity
        {
            self.rescale_clause_activities();
        }
        self.clause_allocator
            .get_mutable_clause(clause_reference)
            .increase_activity(self.clause_bump_increment);
    }

    fn rescale_clause_activities(&mut self) {
        let max_clause_activity = self.parameters.max_clause_activity;
        let clause_allocator = &mut self.clause_allocator;
        self.learned_clauses.iter().for_each(|clause_reference| {
            let clause = clause_allocator.get_mutable_clause(*clause_reference);
            clause.divide_activity(max_clause_activity);
        });
        self.clause_bump_increment /= max_clause_activity;
    }

    fn decay_clause_activities(&mut self) {
        self.clause_bump_increment /= self.parameters.clause_activity_decay_factor;
    }
}

//methods for adding constraints
impl PseudoBooleanSolver {
    pub fn add_clause(
        &mut self,
        literals: Vec<Literal>,
    ) -> Result<(), ConstraintOperationError> {
        self.validate_literals(literals.iter().copied())?;

        if self.state.is_infeasible() {
            //the solver is already permanently infeasible, further adds make no difference
            return Ok(());
        }

        marrow_assert_simple!(self.assignments.is_at_the_root_level());
        marrow_assert_simple!(self.is_propagation_complete());

        let literals = self.preprocess_clause(literals);

        //infeasible at the root? note that the original clause is not added in this case
        if literals.is_empty() {
            self.state.declare_infeasible();
            return Ok(());
        }

        //satisfied at the root, preprocessing reduced the clause to the true literal
        if literals.len() == 1 && literals[0] == self.assignments.true_literal {
            return Ok(());
        }

        //unit clauses are added as root assignments rather than as actual clauses
        if literals.len() == 1 {
            self.add_unit_clause(literals[0]);
            return Ok(());
        }

        if self.parameters.forward_subsumption && self.is_subsumed_by_existing_clause(&literals) {
            return Ok(());
        }

        if self.parameters.backward_subsumption {
            self.remove_clauses_subsumed_by(&literals);
        }

        let clause_reference = self.clause_allocator.create_clause(literals, false);
        self.permanent_clauses.push(clause_reference);
        self.clausal_propagator.start_watching_clause_unchecked(
            self.clause_allocator.get_clause(clause_reference),
            clause_reference,
        );

        Ok(())
    }

    pub fn add_permanent_implication_unchecked(&mut self, lhs: Literal, rhs: Literal) {
        let clause_reference = self.clause_allocator.create_clause(vec![!lhs, rhs], false);
        self.permanent_clauses.push(clause_reference);
        self.clausal_propagator.start_watching_clause_unchecked(
            self.clause_allocator.get_clause(clause_reference),
            clause_reference,
        );
    }

    fn add_unit_clause(&mut self, unit_literal: Literal) {
        marrow_assert_simple!(self.assignments.get_decision_level() == 0);
        marrow_assert_simple!(self.is_propagation_complete());

        //if the literal is unassigned, assign it at the root and propagate
        if self.assignments.is_literal_unassigned(unit_literal) {
            self.assignments.enqueue_decision_literal(unit_literal);
            self.propagate_enqueued();
            if self.state.conflict_detected() {
                self.state.declare_infeasible();
            }
        } else if self.assignments.is_literal_assigned_false(unit_literal) {
            //the unit clause is falsified at the root level
            self.state.declare_infeasible();
        }
        //the unit clause is already present, no need to do anything
    }

    pub fn add_at_least(
        &mut self,
        literals: Vec<Literal>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        let terms = literals
            .into_iter()
            .map(|literal| WeightedLiteral { literal, weight: 1 })
            .collect();
        self.add_pb_at_least(terms, k)
    }

    pub fn add_at_most(
        &mut self,
        literals: Vec<Literal>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        let terms = literals
            .into_iter()
            .map(|literal| WeightedLiteral { literal, weight: 1 })
            .collect();
        self.add_pb_at_most(terms, k)
    }

    pub fn add_exactly(
        &mut self,
        literals: Vec<Literal>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.add_at_least(literals.clone(), k)?;
        self.add_at_most(literals, k)
    }

    /// Adds the constraint `sum of weight_i * literal_i >= k`.
    pub fn add_pb_at_least(
        &mut self,
        terms: Vec<WeightedLiteral>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.validate_terms(&terms)?;
        if terms.is_empty() && k > 0 {
            return Err(ConstraintOperationError::EmptyPseudoBooleanConstraint);
        }

        if self.state.is_infeasible() {
            return Ok(());
        }

        marrow_assert_simple!(self.assignments.is_at_the_root_level());
        marrow_assert_simple!(self.is_propagation_complete());

        let (terms, rhs) = PseudoBooleanSolver::normalise_pb_terms(terms, k);

        //trivially satisfied once opposing polarities have been cancelled out
        if rhs == 0 {
            return Ok(());
        }

        let total_weight: u128 = terms.iter().map(|term| term.weight as u128).sum();
        if total_weight < rhs as u128 {
            //the threshold is unreachable, the problem is infeasible at the root
            self.state.declare_infeasible();
            return Ok(());
        }

        //a constraint over unit weights with threshold one is an ordinary clause
        if rhs == 1 && terms.iter().all(|term| term.weight == 1) {
            let literals = terms.into_iter().map(|term| term.literal).collect();
            return self.add_clause(literals);
        }

        //saturation: weights above the threshold are equivalent to the threshold itself
        let terms: Vec<WeightedLiteral> = terms
            .into_iter()
            .map(|term| WeightedLiteral {
                literal: term.literal,
                weight: std::cmp::min(term.weight, rhs),
            })
            .collect();

        //each pseudo-Boolean constraint takes one reason code from the top of the clause id space
        self.clause_allocator.reduce_id_limit_by_one();
        let outcome = self.pseudo_boolean_propagator.attach_constraint(
            terms,
            rhs,
            &mut self.assignments,
        );

        if outcome == PbConstraintAttachmentOutcome::RootConflict {
            self.state.declare_infeasible();
            return Ok(());
        }

        //attachment may have forced literals at the root, propagate to the fixed point
        self.propagate_enqueued();
        if self.state.conflict_detected() {
            self.state.declare_infeasible();
        }

        Ok(())
    }

    /// Adds the constraint `sum of weight_i * literal_i <= k`.
    pub fn add_pb_at_most(
        &mut self,
        terms: Vec<WeightedLiteral>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.validate_terms(&terms)?;

        let total_weight: u128 = terms.iter().map(|term| term.weight as u128).sum();
        if total_weight <= k as u128 {
            //the bound can never be exceeded
            return Ok(());
        }
        marrow_assert_simple!(
            total_weight - k as u128 <= u64::MAX as u128,
            "The total weight exceeds the supported range."
        );

        //sum w_i l_i <= k is expressed as sum w_i (not l_i) >= total - k
        let negated_terms = terms
            .into_iter()
            .map(|term| WeightedLiteral {
                literal: !term.literal,
                weight: term.weight,
            })
            .collect();
        self.add_pb_at_least(negated_terms, (total_weight - k as u128) as u64)
    }

    pub fn add_pb_exactly(
        &mut self,
        terms: Vec<WeightedLiteral>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.add_pb_at_least(terms.clone(), k)?;
        self.add_pb_at_most(terms, k)
    }

    /// Adds `selector -> (sum of weight_i * literal_i >= k)`: when the selector is false the
    /// constraint imposes nothing.
    pub fn add_pb_at_least_soft(
        &mut self,
        selector: Literal,
        terms: Vec<WeightedLiteral>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.validate_literals(std::iter::once(selector))?;
        if k == 0 {
            return Ok(());
        }
        let mut soft_terms = terms;
        //the negated selector carries the full threshold, so a false selector satisfies
        //  the constraint on its own
        soft_terms.push(WeightedLiteral {
            literal: !selector,
            weight: k,
        });
        self.add_pb_at_least(soft_terms, k)
    }

    /// Adds `selector -> (sum of weight_i * literal_i <= k)`.
    pub fn add_pb_at_most_soft(
        &mut self,
        selector: Literal,
        terms: Vec<WeightedLiteral>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.validate_literals(std::iter::once(selector))?;
        self.validate_terms(&terms)?;

        let total_weight: u128 = terms.iter().map(|term| term.weight as u128).sum();
        if total_weight <= k as u128 {
            return Ok(());
        }
        marrow_assert_simple!(
            total_weight - k as u128 <= u64::MAX as u128,
            "The total weight exceeds the supported range."
        );
        let rhs = (total_weight - k as u128) as u64;

        let mut soft_terms: Vec<WeightedLiteral> = terms
            .into_iter()
            .map(|term| WeightedLiteral {
                literal: !term.literal,
                weight: term.weight,
            })
            .collect();
        soft_terms.push(WeightedLiteral {
            literal: !selector,
            weight: rhs,
        });
        self.add_pb_at_least(soft_terms, rhs)
    }

    pub fn add_pb_exactly_soft(
        &mut self,
        selector: Literal,
        terms: Vec<WeightedLiteral>,
        k: u64,
    ) -> Result<(), ConstraintOperationError> {
        self.add_pb_at_least_soft(selector, terms.clone(), k)?;
        self.add_pb_at_most_soft(selector, terms, k)
    }

    fn validate_literals(
        &self,
        literals: impl Iterator<Item = Literal>,
    ) -> Result<(), ConstraintOperationError> {
        let num_variables = self.assignments.num_propositional_variables();
        for literal in literals {
            if literal.get_propositional_variable().index() >= num_variables {
                return Err(ConstraintOperationError::VariableOutOfRange);
            }
        }
        Ok(())
    }

    fn validate_terms(
        &self,
        terms: &[WeightedLiteral],
    ) -> Result<(), ConstraintOperationError> {
        self.validate_literals(terms.iter().map(|term| term.literal))?;
        if terms.iter().any(|term| term.weight == 0) {
            return Err(ConstraintOperationError::ZeroCoefficient);
        }
        Ok(())
    }

    //merges duplicate literals and cancels opposing polarities against the threshold,
    //  the result mentions each variable at most once
    fn normalise_pb_terms(terms: Vec<WeightedLiteral>, rhs: u64) -> (Vec<WeightedLiteral>, u64) {
        let mut weight_per_literal: HashMap<Literal, u128> = HashMap::default();
        for term in terms {
            *weight_per_literal.entry(term.literal).or_insert(0) += term.weight as u128;
        }

        let mut rhs = rhs as i128;
        let mut normalised_terms: Vec<WeightedLiteral> = vec![];
        let mut processed: HashSet<Literal> = HashSet::default();
        let mut literals: Vec<Literal> = weight_per_literal.keys().copied().collect();
        literals.sort_by_key(|literal| literal.to_u32());

        for literal in literals {
            if processed.contains(&literal) {
                continue;
            }
            let _ = processed.insert(literal);
            let weight = weight_per_literal[&literal];

            if let Some(opposite_weight) = weight_per_literal.get(&!literal).copied() {
                let _ = processed.insert(!literal);
                //w1*l + w2*(not l) = min + (w1-min)*l + (w2-min)*(not l),
                //  the guaranteed contribution is subtracted from the threshold
                let guaranteed = std::cmp::min(weight, opposite_weight);
                rhs -= guaranteed as i128;
                if weight > opposite_weight {
                    normalised_terms.push(WeightedLiteral {
                        literal,
                        weight: (weight - opposite_weight) as u64,
                    });
                } else if opposite_weight > weight {
                    normalised_terms.push(WeightedLiteral {
                        literal: !literal,
                        weight: (opposite_weight - weight) as u64,
                    });
                }
            } else {
                normalised_terms.push(WeightedLiteral {
                    literal,
                    weight: weight as u64,
                });
            }
        }

        if rhs <= 0 {
            (normalised_terms, 0)
        } else {
            (normalised_terms, rhs as u64)
        }
    }

    //does simple preprocessing on the clause, modifying the input vector:
    //	removes duplicate literals and literals falsified at the root,
    //	detects tautologies and clauses satisfied at the root, in which case the result only
    //  contains the true literal,
    //	a clause that is violated at the root becomes empty
    fn preprocess_clause(&self, mut literals: Vec<Literal>) -> Vec<Literal> {
        //remove literals that are falsified at the root level,
        //  and check if the clause has a true literal at the root level
        let mut satisfied_at_root = false;
        let mut next_location = 0;
        for i in 0..literals.len() {
            if self.assignments.is_literal_assigned_true(literals[i]) {
                satisfied_at_root = true;
                break;
            }
            //skip falsified literals, only keep unassigned literals
            else if self.assignments.is_literal_unassigned(literals[i]) {
                literals[next_location] = literals[i];
                next_location += 1;
            }
        }
        literals.truncate(next_location);

        if satisfied_at_root {
            literals.resize(1, self.assignments.true_literal);
            literals[0] = self.assignments.true_literal;
            return literals;
        } else if literals.is_empty() {
            return literals;
        }

        //remove duplicated literals: sort and keep one literal of each kind
        literals.sort_unstable_by_key(|a| a.to_u32());
        literals.dedup();

        //check if the clause contains both polarities of the same variable,
        //	since duplicates are removed and the literals sorted, it suffices to check neighbours
        for i in 1..literals.len() {
            if literals[i - 1].get_propositional_variable()
                == literals[i].get_propositional_variable()
            {
                satisfied_at_root = true;
                break;
            }
        }

        if satisfied_at_root {
            literals.truncate(1);
            literals[0] = self.assignments.true_literal;
        }

        literals
    }

    //forward subsumption: the new clause is redundant if an existing clause is a subset of it
    fn is_subsumed_by_existing_clause(&self, literals: &[Literal]) -> bool {
        let literal_set: HashSet<Literal> = literals.iter().copied().collect();
        self.permanent_clauses.iter().any(|clause_reference| {
            let clause = self.clause_allocator.get_clause(*clause_reference);
            !clause.is_deleted()
                && clause.len() as usize <= literals.len()
                && clause
                    .get_literal_slice()
                    .iter()
                    .all(|literal| literal_set.contains(literal))
        })
    }

    //backward subsumption: existing clauses that are supersets of the new clause are removed
    fn remove_clauses_subsumed_by(&mut self, literals: &[Literal]) {
        let mut subsumed_references: Vec<ClauseReference> = vec![];
        for clause_reference in &self.permanent_clauses {
            let clause = self.clause_allocator.get_clause(*clause_reference);
            if !clause.is_deleted()
                && clause.len() as usize > literals.len()
                && literals
                    .iter()
                    .all(|literal| clause.get_literal_slice().contains(literal))
                && !self.is_clause_locked(*clause_reference)
            {
                subsumed_references.push(*clause_reference);
            }
        }

        for clause_reference in subsumed_references {
            let index = self
                .permanent_clauses
                .iter()
                .position(|reference| *reference == clause_reference)
                .expect("The subsumed clause was taken from the permanent clause list.");
            let _ = self.permanent_clauses.swap_remove(index);

            self.clausal_propagator.remove_clause_consideration(
                &self.clause_allocator[clause_reference],
                clause_reference,
            );
            self.clause_allocator.delete_clause(clause_reference);
        }
    }
}

#[derive(Default)]
pub struct Counters {
    pub num_decisions: u64,
    pub num_conflicts: u64,
    pub num_propagations: u64,
    pub num_unit_clauses_learned: u64,
    pub num_learned_clause_reductions: u64,
}

pub struct ConflictAnalysisResult {
    pub learned_literals: Vec<Literal>,
    pub backjump_level: u32,
}

#[derive(Default)]
enum SolverStateInternal {
    #[default]
    Ready,
    Solving,
    ContainsSolution,
    Conflict {
        conflict_reason_code: u32,
    },
    Infeasible,
    InfeasibleUnderAssumptions {
        violated_assumption: Literal,
    },
    Timeout,
}

pub struct SolverState {
    internal_state: SolverStateInternal,
}

impl SolverState {
    fn new() -> SolverState {
        SolverState {
            internal_state: SolverStateInternal::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::Ready)
    }

    pub fn no_conflict(&self) -> bool {
        !self.conflict_detected()
    }

    pub fn conflict_detected(&self) -> bool {
        matches!(
            self.internal_state,
            SolverStateInternal::Conflict {
                conflict_reason_code: _
            }
        )
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::Infeasible)
    }

    pub fn is_infeasible_under_assumptions(&self) -> bool {
        matches!(
            self.internal_state,
            SolverStateInternal::InfeasibleUnderAssumptions {
                violated_assumption: _
            }
        )
    }

    pub fn get_violated_assumption(&self) -> Literal {
        if let SolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        } = self.internal_state
        {
            violated_assumption
        } else {
            panic!("Cannot extract the violated assumption without being in the infeasible-under-assumptions state.");
        }
    }

    pub fn get_conflict_reason_code(&self) -> u32 {
        if let SolverStateInternal::Conflict {
            conflict_reason_code,
        } = self.internal_state
        {
            conflict_reason_code
        } else {
            panic!("Cannot extract the conflict reason if the solver is not in a conflict state.");
        }
    }

    pub fn timeout(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::Timeout)
    }

    pub fn has_solution(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::ContainsSolution)
    }

    fn declare_ready(&mut self) {
        self.internal_state = SolverStateInternal::Ready;
    }

    fn declare_solving(&mut self) {
        self.internal_state = SolverStateInternal::Solving;
    }

    fn declare_infeasible(&mut self) {
        self.internal_state = SolverStateInternal::Infeasible;
    }

    fn declare_conflict(&mut self, conflict_reason_code: u32) {
        marrow_assert_ne_simple!(conflict_reason_code, 0);
        self.internal_state = SolverStateInternal::Conflict {
            conflict_reason_code,
        };
    }

    fn declare_solution_found(&mut self) {
        self.internal_state = SolverStateInternal::ContainsSolution;
    }

    fn declare_timeout(&mut self) {
        self.internal_state = SolverStateInternal::Timeout;
    }

    fn declare_infeasible_under_assumptions(&mut self, violated_assumption: Literal) {
        self.internal_state = SolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::sequence_generators::SequenceGeneratorType;
    use crate::engine::MinimisationMode;

    fn solver_with_variables(num_variables: u32) -> (PseudoBooleanSolver, Vec<Literal>) {
        solver_with_options(num_variables, SolverOptions::default())
    }

    fn solver_with_options(
        num_variables: u32,
        options: SolverOptions,
    ) -> (PseudoBooleanSolver, Vec<Literal>) {
        let mut solver = PseudoBooleanSolver::new(options);
        let literals = solver
            .new_variables(num_variables)
            .into_iter()
            .map(|variable| Literal::new(variable, true))
            .collect();
        (solver, literals)
    }

    fn weighted(literal: Literal, weight: u64) -> WeightedLiteral {
        WeightedLiteral { literal, weight }
    }

    #[test]
    fn test_solve_with_no_variables_is_feasible() {
        let (mut solver, _) = solver_with_variables(0);
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert!(solution.get_literal_value(solver.get_true_literal()));
    }

    #[test]
    fn test_unit_clause_forces_literal() {
        let (mut solver, literals) = solver_with_variables(1);
        solver.add_clause(vec![!literals[0]]).expect("Valid clause.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        assert!(solver.get_solution().get_literal_value(!literals[0]));
    }

    #[test]
    fn test_empty_clause_is_infeasible() {
        let (mut solver, _) = solver_with_variables(1);
        solver.add_clause(vec![]).expect("Adding is permitted.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
        //infeasibility at the root is permanent
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
    }

    #[test]
    fn test_tautology_is_a_no_op() {
        let (mut solver, literals) = solver_with_variables(1);
        solver
            .add_clause(vec![literals[0], !literals[0]])
            .expect("Valid clause.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
    }

    #[test]
    fn test_duplicate_clause_changes_nothing() {
        let (mut solver, literals) = solver_with_variables(2);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert!(
            solution.get_literal_value(literals[0]) || solution.get_literal_value(literals[1])
        );
    }

    #[test]
    fn test_out_of_range_variable_is_rejected() {
        let (mut solver, _) = solver_with_variables(1);
        let foreign_literal = Literal::new(PropositionalVariable::new(100), true);
        assert_eq!(
            solver.add_clause(vec![foreign_literal]),
            Err(ConstraintOperationError::VariableOutOfRange)
        );
        //the failed add has no effect on the solver
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
    }

    #[test]
    fn test_scenario_unique_model() {
        //clauses {1,2}, {1,~2}, {~1,~2} admit only x1=true, x2=false
        let (mut solver, literals) = solver_with_variables(2);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![literals[0], !literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![!literals[0], !literals[1]])
            .expect("Valid clause.");

        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert!(solution.get_literal_value(literals[0]));
        assert!(!solution.get_literal_value(literals[1]));
    }

    #[test]
    fn test_scenario_all_polarities_infeasible() {
        let (mut solver, literals) = solver_with_variables(2);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![literals[0], !literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![!literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![!literals[0], !literals[1]])
            .expect("Valid clause.");

        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
    }

    #[test]
    fn test_pigeonhole_is_infeasible() {
        //three pigeons into two holes: exercises clause learning and backjumping
        for minimisation_mode in [
            MinimisationMode::Off,
            MinimisationMode::Local,
            MinimisationMode::Recursive,
        ] {
            let options = SolverOptions {
                minimisation_mode,
                ..Default::default()
            };
            let (mut solver, p) = solver_with_options(6, options);
            //p[2i] and p[2i+1] are the hole literals of pigeon i
            for pigeon in 0..3 {
                solver
                    .add_clause(vec![p[2 * pigeon], p[2 * pigeon + 1]])
                    .expect("Valid clause.");
            }
            for hole in 0..2 {
                for pigeon1 in 0..3 {
                    for pigeon2 in (pigeon1 + 1)..3 {
                        solver
                            .add_clause(vec![!p[2 * pigeon1 + hole], !p[2 * pigeon2 + hole]])
                            .expect("Valid clause.");
                    }
                }
            }
            assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
        }
    }

    #[test]
    fn test_pb_with_zero_threshold_is_trivial() {
        let (mut solver, literals) = solver_with_variables(2);
        solver
            .add_pb_at_least(vec![weighted(literals[0], 3), weighted(literals[1], 2)], 0)
            .expect("Valid constraint.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
    }

    #[test]
    fn test_pb_feasible_iff_threshold_reachable() {
        for handler_type in [PbHandlerType::Counter, PbHandlerType::Watched] {
            let options = SolverOptions {
                pb_handler_type: handler_type,
                ..Default::default()
            };
            let (mut solver, literals) = solver_with_options(3, options);
            solver
                .add_pb_at_least(
                    vec![
                        weighted(literals[0], 3),
                        weighted(literals[1], 2),
                        weighted(literals[2], 1),
                    ],
                    6,
                )
                .expect("Valid constraint.");
            assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
            let solution = solver.get_solution();
            assert!(solution.get_literal_value(literals[0]));
            assert!(solution.get_literal_value(literals[1]));
            assert!(solution.get_literal_value(literals[2]));

            let options = SolverOptions {
                pb_handler_type: handler_type,
                ..Default::default()
            };
            let (mut solver, literals) = solver_with_options(2, options);
            solver
                .add_pb_at_least(vec![weighted(literals[0], 3), weighted(literals[1], 2)], 6)
                .expect("Valid constraint.");
            assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
        }
    }

    #[test]
    fn test_pb_propagation_under_assumptions() {
        for handler_type in [PbHandlerType::Counter, PbHandlerType::Watched] {
            let options = SolverOptions {
                pb_handler_type: handler_type,
                ..Default::default()
            };
            let (mut solver, literals) = solver_with_options(3, options);
            //3a + 2b + c >= 3: assuming ~a forces b and c
            solver
                .add_pb_at_least(
                    vec![
                        weighted(literals[0], 3),
                        weighted(literals[1], 2),
                        weighted(literals[2], 1),
                    ],
                    3,
                )
                .expect("Valid constraint.");

            assert_eq!(
                solver.solve_under_assumptions(&[!literals[0]], i64::MAX),
                SolverExecutionFlag::Feasible
            );
            let solution = solver.get_solution();
            assert!(!solution.get_literal_value(literals[0]));
            assert!(solution.get_literal_value(literals[1]));
            assert!(solution.get_literal_value(literals[2]));
        }
    }

    #[test]
    fn test_pb_at_least_forces_large_coefficient() {
        //3a + 2b + c >= 4 forces a at the root
        let (mut solver, literals) = solver_with_variables(3);
        solver
            .add_pb_at_least(
                vec![
                    weighted(literals[0], 3),
                    weighted(literals[1], 2),
                    weighted(literals[2], 1),
                ],
                4,
            )
            .expect("Valid constraint.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        assert!(solver.get_solution().get_literal_value(literals[0]));
    }

    #[test]
    fn test_pb_at_most_and_exactly() {
        let (mut solver, literals) = solver_with_variables(3);
        solver
            .add_exactly(literals.clone(), 2)
            .expect("Valid constraint.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        let num_true = literals
            .iter()
            .filter(|literal| solution.get_literal_value(**literal))
            .count();
        assert_eq!(num_true, 2);
    }

    #[test]
    fn test_soft_pb_constraint_respects_selector() {
        let (mut solver, literals) = solver_with_variables(3);
        let selector = literals[2];
        //selector -> (a + b >= 2)
        solver
            .add_pb_at_least_soft(
                selector,
                vec![weighted(literals[0], 1), weighted(literals[1], 1)],
                2,
            )
            .expect("Valid constraint.");

        assert_eq!(
            solver.solve_under_assumptions(&[selector], i64::MAX),
            SolverExecutionFlag::Feasible
        );
        let solution = solver.get_solution();
        assert!(solution.get_literal_value(literals[0]));
        assert!(solution.get_literal_value(literals[1]));

        //with the selector false the constraint imposes nothing
        solver.restore_state_at_root();
        assert_eq!(
            solver.solve_under_assumptions(&[!selector, !literals[0]], i64::MAX),
            SolverExecutionFlag::Feasible
        );
    }

    #[test]
    fn test_infeasible_assumptions_produce_core() {
        let (mut solver, literals) = solver_with_variables(3);
        //a -> b and b -> ~c, assuming a and c is infeasible
        solver
            .add_clause(vec![!literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![!literals[1], !literals[2]])
            .expect("Valid clause.");

        let flag = solver.solve_under_assumptions(&[literals[0], literals[2]], i64::MAX);
        assert_eq!(flag, SolverExecutionFlag::InfeasibleUnderAssumptions);

        let core = solver.extract_core();
        assert!(!core.is_empty());
        assert!(core
            .iter()
            .all(|literal| *literal == literals[0] || *literal == literals[2]));
    }

    #[test]
    fn test_zero_time_budget_reports_timeout() {
        let (mut solver, literals) = solver_with_variables(2);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        assert_eq!(solver.solve(0), SolverExecutionFlag::Timeout);
        //a timeout leaves the solver in a consistent state for the next attempt
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
    }

    #[test]
    fn test_restart_strategies_find_the_same_answer() {
        for sequence_generator_type in [
            SequenceGeneratorType::Geometric,
            SequenceGeneratorType::InnerOuterGeometric,
            SequenceGeneratorType::Luby,
        ] {
            let options = SolverOptions {
                restart_options: RestartOptions {
                    sequence_generator_type,
                    base_interval: 1,
                    geometric_coefficient: 1.5,
                },
                ..Default::default()
            };
            let (mut solver, p) = solver_with_options(6, options);
            for pigeon in 0..3 {
                solver
                    .add_clause(vec![p[2 * pigeon], p[2 * pigeon + 1]])
                    .expect("Valid clause.");
            }
            for hole in 0..2 {
                for pigeon1 in 0..3 {
                    for pigeon2 in (pigeon1 + 1)..3 {
                        solver
                            .add_clause(vec![!p[2 * pigeon1 + hole], !p[2 * pigeon2 + hole]])
                            .expect("Valid clause.");
                    }
                }
            }
            assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
        }
    }

    #[test]
    fn test_random_decisions_preserve_correctness() {
        let options = SolverOptions {
            random_decision_frequency: 0.5,
            random_seed: 7,
            ..Default::default()
        };
        let (mut solver, literals) = solver_with_options(2, options);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![literals[0], !literals[1]])
            .expect("Valid clause.");
        solver
            .add_clause(vec![!literals[0], !literals[1]])
            .expect("Valid clause.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert!(solution.get_literal_value(literals[0]));
        assert!(!solution.get_literal_value(literals[1]));
    }

    #[test]
    fn test_subsumption_keeps_semantics() {
        let options = SolverOptions {
            forward_subsumption: true,
            backward_subsumption: true,
            ..Default::default()
        };
        let (mut solver, literals) = solver_with_options(3, options);
        solver
            .add_clause(vec![literals[0], literals[1], literals[2]])
            .expect("Valid clause.");
        //subsumes the ternary clause
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        //subsumed by the binary clause
        solver
            .add_clause(vec![literals[0], literals[1], !literals[2]])
            .expect("Valid clause.");
        solver.add_clause(vec![!literals[0]]).expect("Valid clause.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        assert!(solver.get_solution().get_literal_value(literals[1]));
    }

    #[test]
    fn test_model_check_accepts_correct_models() {
        let options = SolverOptions {
            model_check: true,
            ..Default::default()
        };
        let (mut solver, literals) = solver_with_options(3, options);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");
        solver
            .add_pb_at_least(vec![weighted(literals[1], 2), weighted(literals[2], 1)], 2)
            .expect("Valid constraint.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
    }
}
