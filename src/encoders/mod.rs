mod tseitin_encoder;

pub use tseitin_encoder::{ReificationMode, TseitinEncoder};
