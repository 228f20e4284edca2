use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn, LevelFilter};

use marrow::basic_types::sequence_generators::SequenceGeneratorType;
use marrow::basic_types::{FileFormat, PropositionalVariable, Solution, SolverExecutionFlag};
use marrow::engine::{
    LearnedClauseSortingStrategy, MinimisationMode, PseudoBooleanSolver, RestartOptions,
    SolverOptions,
};
use marrow::optimisation::{OptimisationResult, OptimisationSolver, OptimisationStrategy};
use marrow::parsers::dimacs::{parse_cnf_file, parse_wcnf_file};
use marrow::parsers::Instance;
use marrow::propagators::PbHandlerType;
use marrow::result::{MarrowError, MarrowResult};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The instance to solve. The file should have one of the following extensions:
    ///  * '.cnf' for SAT instances, given in the DIMACS format,
    ///  * '.wcnf' for MaxSAT instances, given in the WDIMACS format.
    instance_path: PathBuf,

    /// The time budget for the solver, given in seconds.
    #[arg(short = 't', long = "time-limit")]
    time_limit: Option<u64>,

    /// The number of learned clauses that can be added to the clause database before clause
    /// deletion is triggered. The limit grows after every deletion round.
    #[arg(long = "threshold-learned-clauses", default_value_t = 4000)]
    threshold_learned_clauses: u64,

    /// Decides which clauses will be removed when cleaning up the learned clauses.
    #[arg(short = 'l', long = "learned-clause-sorting-strategy", value_parser = learned_clause_sorting_strategy_parser, default_value = "lbd")]
    learned_clause_sorting_strategy: LearnedClauseSortingStrategy,

    /// The restart interval sequence.
    #[arg(long = "restart-sequence", value_parser = restart_sequence_parser, default_value = "geometric")]
    restart_sequence: SequenceGeneratorType,

    /// The base interval of the restart sequence, in conflicts.
    #[arg(long = "restart-base-interval", default_value_t = 100)]
    restart_base_interval: u64,

    /// The multiplication factor of the geometric and inner/outer restart sequences.
    #[arg(long = "restart-coefficient", default_value_t = 1.5)]
    restart_coefficient: f64,

    /// The amount of effort spent on minimising learned clauses.
    #[arg(long = "clause-minimisation", value_parser = minimisation_mode_parser, default_value = "recursive")]
    clause_minimisation: MinimisationMode,

    /// Disables phase saving; decisions then use the preferred polarities.
    #[arg(long = "no-phase-saving", default_value_t = false)]
    no_phase_saving: bool,

    /// Skips adding clauses that are subsumed by an existing clause.
    #[arg(long = "forward-subsumption", default_value_t = false)]
    forward_subsumption: bool,

    /// Removes existing clauses that are subsumed by a newly added clause.
    #[arg(long = "backward-subsumption", default_value_t = false)]
    backward_subsumption: bool,

    /// The probability of branching on a uniformly random unassigned variable.
    #[arg(long = "random-frequency", default_value_t = 0.0)]
    random_frequency: f64,

    /// The random seed used by the pseudo-random number generator of the solver.
    #[arg(long = "random-seed", default_value_t = 42)]
    random_seed: u64,

    /// The propagation mechanism for pseudo-Boolean constraints.
    #[arg(long = "pb-handler", value_parser = pb_handler_parser, default_value = "counter")]
    pb_handler: PbHandlerType,

    /// The optimisation strategy used for weighted instances.
    #[arg(short = 's', long = "optimisation-strategy", value_parser = optimisation_strategy_parser, default_value = "linear")]
    optimisation_strategy: OptimisationStrategy,

    /// Verify every model reported by the solver against the registered constraints.
    #[arg(long = "model-check", default_value_t = false)]
    model_check: bool,

    /// Verify the reported solution against a re-read of the instance, and, if applicable,
    /// verify that it evaluates to the reported objective value.
    #[arg(long = "verify", default_value_t = false)]
    verify_solution: bool,

    /// Enables log message output from the solver.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,

    /// If `--verbose` is enabled removes the timestamp information from the log messages.
    #[arg(long = "omit-timestamp", default_value_t = false)]
    omit_timestamp: bool,

    /// If `--verbose` is enabled removes the call site information from the log messages.
    /// Call site is the file and line in it that originated the message.
    #[arg(long = "omit-call-site", default_value_t = false)]
    omit_call_site: bool,
}

fn learned_clause_sorting_strategy_parser(
    value: &str,
) -> Result<LearnedClauseSortingStrategy, String> {
    match value {
        "activity" => Ok(LearnedClauseSortingStrategy::Activity),
        "lbd" => Ok(LearnedClauseSortingStrategy::Lbd),
        value => Err(format!(
            "'{}' is not a learned clause sorting strategy, expected 'activity' or 'lbd'.",
            value
        )),
    }
}

fn restart_sequence_parser(value: &str) -> Result<SequenceGeneratorType, String> {
    match value {
        "geometric" => Ok(SequenceGeneratorType::Geometric),
        "inner-outer-geometric" => Ok(SequenceGeneratorType::InnerOuterGeometric),
        "luby" => Ok(SequenceGeneratorType::Luby),
        value => Err(format!(
            "'{}' is not a restart sequence, expected 'geometric', 'inner-outer-geometric' or 'luby'.",
            value
        )),
    }
}

fn minimisation_mode_parser(value: &str) -> Result<MinimisationMode, String> {
    match value {
        "off" => Ok(MinimisationMode::Off),
        "local" => Ok(MinimisationMode::Local),
        "recursive" => Ok(MinimisationMode::Recursive),
        value => Err(format!(
            "'{}' is not a minimisation mode, expected 'off', 'local' or 'recursive'.",
            value
        )),
    }
}

fn pb_handler_parser(value: &str) -> Result<PbHandlerType, String> {
    match value {
        "counter" => Ok(PbHandlerType::Counter),
        "watched" => Ok(PbHandlerType::Watched),
        value => Err(format!(
            "'{}' is not a pseudo-Boolean handler, expected 'counter' or 'watched'.",
            value
        )),
    }
}

fn optimisation_strategy_parser(value: &str) -> Result<OptimisationStrategy, String> {
    match value {
        "linear" => Ok(OptimisationStrategy::Linear),
        "binary" => Ok(OptimisationStrategy::Binary),
        "adaptive" => Ok(OptimisationStrategy::Adaptive),
        "unsat-core" => Ok(OptimisationStrategy::UnsatCore),
        "msu4" => Ok(OptimisationStrategy::Msu4),
        value => Err(format!(
            "'{}' is not an optimisation strategy, expected 'linear', 'binary', 'adaptive', 'unsat-core' or 'msu4'.",
            value
        )),
    }
}

fn configure_logging(
    verbose: bool,
    omit_timestamp: bool,
    omit_call_site: bool,
) -> std::io::Result<()> {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;
            if !omit_timestamp {
                write!(buf, "{} ", buf.timestamp())?;
            }
            write!(buf, "{} ", record.level())?;
            if !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .init();
    info!("Logging successfully configured");
    Ok(())
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            error!("Execution failed, error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> MarrowResult<()> {
    let args = Args::parse();

    configure_logging(args.verbose, args.omit_timestamp, args.omit_call_site)?;
    marrow::print_marrow_assert_warning_message!();

    let file_location = args
        .instance_path
        .to_str()
        .ok_or(MarrowError::MissingFileError)?
        .to_owned();
    info!("File location: {file_location}");

    let file_format = if file_location.ends_with(".cnf") {
        FileFormat::CnfDimacsPLine
    } else if file_location.ends_with(".wcnf") {
        FileFormat::WcnfDimacsPLine
    } else {
        return Err(MarrowError::InvalidInstanceFile);
    };

    let time_limit_in_seconds = args
        .time_limit
        .map(|seconds| seconds as i64)
        .unwrap_or(i64::MAX);

    let solver_options = SolverOptions {
        restart_options: RestartOptions {
            sequence_generator_type: args.restart_sequence,
            base_interval: args.restart_base_interval,
            geometric_coefficient: args.restart_coefficient,
        },
        learned_clause_limit: args.threshold_learned_clauses,
        learned_clause_sorting_strategy: args.learned_clause_sorting_strategy,
        minimisation_mode: args.clause_minimisation,
        phase_saving: !args.no_phase_saving,
        forward_subsumption: args.forward_subsumption,
        backward_subsumption: args.backward_subsumption,
        random_decision_frequency: args.random_frequency,
        random_seed: args.random_seed,
        pb_handler_type: args.pb_handler,
        model_check: args.model_check,
        ..Default::default()
    };
    let mut solver = PseudoBooleanSolver::new(solver_options);

    match file_format {
        FileFormat::CnfDimacsPLine => {
            let num_variables = parse_cnf_file(&file_location, &mut solver)? as u32;

            let execution_flag = solver.solve(time_limit_in_seconds);
            solver.log_statistics();
            match execution_flag {
                SolverExecutionFlag::Feasible => {
                    let solution = solver.get_solution();
                    println!("s SATISFIABLE");
                    println!("v {}", stringify_solution(&solution, num_variables));
                    if args.verify_solution {
                        verify_solution(&file_location, file_format, &solution, None)?;
                    }
                }
                SolverExecutionFlag::Infeasible => println!("s UNSATISFIABLE"),
                SolverExecutionFlag::Timeout => println!("s UNKNOWN"),
                SolverExecutionFlag::InfeasibleUnderAssumptions => {
                    panic!("The instance is solved without assumptions.")
                }
            }
        }
        FileFormat::WcnfDimacsPLine => {
            let (objective_function, num_variables) = parse_wcnf_file(&file_location, &mut solver)?;
            let num_variables = num_variables as u32;

            let mut optimiser = OptimisationSolver::new(args.optimisation_strategy)
                .with_solution_callback(Box::new(|_solution, objective_value| {
                    println!("o {}", objective_value);
                    let _ = std::io::stdout().flush();
                }))
                .with_lower_bound_callback(Box::new(|lower_bound| {
                    info!("Lower bound is now {}", lower_bound);
                }));

            let result =
                optimiser.optimise(&mut solver, &objective_function, time_limit_in_seconds);
            solver.log_statistics();
            report_optimisation_result(
                result,
                num_variables,
                &file_location,
                file_format,
                args.verify_solution,
            )?;
        }
    }

    Ok(())
}

fn report_optimisation_result(
    result: OptimisationResult,
    num_variables: u32,
    file_location: &str,
    file_format: FileFormat,
    verify: bool,
) -> MarrowResult<()> {
    match result {
        OptimisationResult::Optimal {
            solution,
            objective_value,
        } => {
            println!("s OPTIMUM FOUND");
            println!("v {}", stringify_solution(&solution, num_variables));
            if verify {
                verify_solution(file_location, file_format, &solution, Some(objective_value))?;
            }
        }
        OptimisationResult::Satisfiable {
            solution,
            objective_value,
        } => {
            println!("s SATISFIABLE");
            println!("v {}", stringify_solution(&solution, num_variables));
            if verify {
                verify_solution(file_location, file_format, &solution, Some(objective_value))?;
            }
        }
        OptimisationResult::Infeasible => println!("s UNSATISFIABLE"),
        OptimisationResult::Unknown => println!("s UNKNOWN"),
    }
    Ok(())
}

fn stringify_solution(solution: &Solution, num_variables: u32) -> String {
    (1..=num_variables)
        .map(|index| {
            let variable = PropositionalVariable::new(index);
            if solution[variable] {
                format!("{} ", index)
            } else {
                format!("-{} ", index)
            }
        })
        .collect::<String>()
        .trim_end()
        .to_owned()
}

fn verify_solution(
    file_location: &str,
    file_format: FileFormat,
    solution: &Solution,
    reported_objective_value: Option<u64>,
) -> MarrowResult<()> {
    let instance = Instance::read_file(file_location, file_format)?;

    if instance.are_hard_clauses_violated(solution) {
        return Err(MarrowError::InconsistentSolution);
    }

    if let Some(reported_objective_value) = reported_objective_value {
        let recomputed_objective_value = instance.compute_soft_clause_violation(solution);
        match recomputed_objective_value.cmp(&reported_objective_value) {
            std::cmp::Ordering::Less => {
                warn!("Reported objective value is greater than the recomputed cost.")
            }
            std::cmp::Ordering::Equal => {}
            std::cmp::Ordering::Greater => {
                return Err(MarrowError::InconsistentObjective);
            }
        }
    }

    info!("No critical issues found after checking the solution.");
    Ok(())
}
