mod integer_expression;

pub use integer_expression::{BoundedInteger, IntegerExpression};
