use crate::basic_types::sequence_generators::{
    GeometricSequence, InnerOuterGeometricSequence, LubySequence, SequenceGenerator,
    SequenceGeneratorType,
};

/// The options which determine when the solver restarts.
#[derive(Debug, Clone, Copy)]
pub struct RestartOptions {
    /// Decides the sequence based on which the restarts are performed, to be used in
    /// combination with [`RestartOptions::base_interval`].
    pub sequence_generator_type: SequenceGeneratorType,
    /// The base interval length is used as a multiplier to the restart sequence: geometric
    /// restarts with base interval 100 and coefficient 2.0 trigger after 100, 200, 400, ...
    /// conflicts.
    pub base_interval: u64,
    /// The coefficient of the geometric and inner/outer geometric sequences, unused for Luby.
    pub geometric_coefficient: f64,
}

impl Default for RestartOptions {
    fn default() -> Self {
        RestartOptions {
            sequence_generator_type: SequenceGeneratorType::Geometric,
            base_interval: 100,
            geometric_coefficient: 1.5,
        }
    }
}

/// Tracks the number of conflicts since the last restart and signals a restart whenever the
/// interval prescribed by the configured sequence has been exhausted. Restarting itself is the
/// solver's responsibility; activities and saved polarities survive a restart.
pub struct RestartStrategy {
    sequence_generator: Box<dyn SequenceGenerator>,
    num_conflicts_until_restart: i64,
    num_restarts: u64,
}

impl RestartStrategy {
    pub fn new(options: RestartOptions) -> RestartStrategy {
        let mut sequence_generator: Box<dyn SequenceGenerator> =
            match options.sequence_generator_type {
                SequenceGeneratorType::Geometric => Box::new(GeometricSequence::new(
                    options.base_interval as i64,
                    options.geometric_coefficient,
                )),
                SequenceGeneratorType::InnerOuterGeometric => {
                    Box::new(InnerOuterGeometricSequence::new(
                        options.base_interval as i64,
                        options.geometric_coefficient,
                    ))
                }
                SequenceGeneratorType::Luby => {
                    Box::new(LubySequence::new(options.base_interval as i64))
                }
            };

        let num_conflicts_until_restart = sequence_generator.next();

        RestartStrategy {
            sequence_generator,
            num_conflicts_until_restart,
            num_restarts: 0,
        }
    }

    pub fn should_restart(&self) -> bool {
        self.num_conflicts_until_restart <= 0
    }

    pub fn notify_conflict(&mut self) {
        self.num_conflicts_until_restart -= 1;
    }

    pub fn notify_restart(&mut self) {
        self.num_restarts += 1;
        self.num_conflicts_until_restart = self.sequence_generator.next();
    }

    pub fn num_restarts(&self) -> u64 {
        self.num_restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_conflicts_until_restart(strategy: &mut RestartStrategy) -> u64 {
        let mut num_conflicts = 0;
        while !strategy.should_restart() {
            strategy.notify_conflict();
            num_conflicts += 1;
        }
        strategy.notify_restart();
        num_conflicts
    }

    #[test]
    fn test_geometric_intervals() {
        let mut strategy = RestartStrategy::new(RestartOptions {
            sequence_generator_type: SequenceGeneratorType::Geometric,
            base_interval: 100,
            geometric_coefficient: 2.0,
        });

        assert_eq!(count_conflicts_until_restart(&mut strategy), 100);
        assert_eq!(count_conflicts_until_restart(&mut strategy), 200);
        assert_eq!(count_conflicts_until_restart(&mut strategy), 400);
        assert_eq!(strategy.num_restarts(), 3);
    }

    #[test]
    fn test_luby_intervals() {
        let mut strategy = RestartStrategy::new(RestartOptions {
            sequence_generator_type: SequenceGeneratorType::Luby,
            base_interval: 10,
            geometric_coefficient: 0.0,
        });

        assert_eq!(count_conflicts_until_restart(&mut strategy), 10);
        assert_eq!(count_conflicts_until_restart(&mut strategy), 10);
        assert_eq!(count_conflicts_until_restart(&mut strategy), 20);
        assert_eq!(count_conflicts_until_restart(&mut strategy), 10);
    }
}
