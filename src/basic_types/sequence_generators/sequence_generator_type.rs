/// The restart interval sequences supported by the solver:
/// - geometric restarts after `base * coef^n` conflicts,
/// - inner/outer geometric restarts where the inner limit grows geometrically and is reset
///   each time it overtakes the (also growing) outer limit,
/// - Luby restarts after `base * luby(n)` conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceGeneratorType {
    Geometric,
    InnerOuterGeometric,
    Luby,
}

impl std::fmt::Display for SequenceGeneratorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceGeneratorType::Geometric => write!(f, "geometric"),
            SequenceGeneratorType::InnerOuterGeometric => write!(f, "inner-outer-geometric"),
            SequenceGeneratorType::Luby => write!(f, "luby"),
        }
    }
}
