mod clausal_propagator;
mod pseudo_boolean_propagator;

pub use clausal_propagator::{ClausalPropagator, ClauseWatcher, PropagationStatusClausal};
pub use pseudo_boolean_propagator::{
    PbConstraintAttachmentOutcome, PbHandlerType, PropagationStatusPb, PseudoBooleanPropagator,
};
