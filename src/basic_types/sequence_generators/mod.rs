pub mod geometric_sequence;
pub mod inner_outer_geometric_sequence;
pub mod luby_sequence;
pub mod sequence_generator;
pub mod sequence_generator_type;

pub use geometric_sequence::GeometricSequence;
pub use inner_outer_geometric_sequence::InnerOuterGeometricSequence;
pub use luby_sequence::LubySequence;
pub use sequence_generator::SequenceGenerator;
pub use sequence_generator_type::SequenceGeneratorType;
