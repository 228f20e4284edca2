use crate::basic_types::{
    ConstraintOperationError, HashMap, Literal, Solution, WeightedLiteral,
};
use crate::encoders::TseitinEncoder;
use crate::engine::PseudoBooleanSolver;
use crate::marrow_assert_simple;

/// A bounded integer variable in `[lower_bound, upper_bound]`, represented as
/// `lower_bound + sum of 2^i * bit_i`. The bit width covers the range, and when the range is
/// not a power of two the unused top values are cut off with a pseudo-Boolean clamp.
pub struct BoundedInteger {
    lower_bound: i64,
    upper_bound: i64,
    bits: Vec<Literal>,
}

impl BoundedInteger {
    pub fn new(
        solver: &mut PseudoBooleanSolver,
        lower_bound: i64,
        upper_bound: i64,
    ) -> Result<BoundedInteger, ConstraintOperationError> {
        marrow_assert_simple!(lower_bound <= upper_bound);

        let range = (upper_bound - lower_bound) as u64;
        let num_bits = if range == 0 {
            0
        } else {
            64 - range.leading_zeros()
        };

        let bits: Vec<Literal> = (0..num_bits)
            .map(|_i| Literal::new(solver.new_variable(), true))
            .collect();

        //cut off the bit patterns that would exceed the range
        if num_bits > 0 && range + 1 != 1u64 << num_bits {
            let clamp_terms: Vec<WeightedLiteral> = bits
                .iter()
                .enumerate()
                .map(|(bit_index, bit)| WeightedLiteral {
                    literal: *bit,
                    weight: 1u64 << bit_index,
                })
                .collect();
            solver.add_pb_at_most(clamp_terms, range)?;
        }

        Ok(BoundedInteger {
            lower_bound,
            upper_bound,
            bits,
        })
    }

    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    pub fn expression(&self) -> IntegerExpression {
        let mut expression = IntegerExpression::from_constant(self.lower_bound);
        for (bit_index, bit) in self.bits.iter().enumerate() {
            expression.add_term(1i64 << bit_index, *bit);
        }
        expression
    }

    pub fn evaluate(&self, solution: &Solution) -> i64 {
        self.expression().evaluate(solution)
    }
}

/// A linear expression `sum of coefficient_i * literal_i + constant` over 0/1 literals.
/// Products of expressions are linearized on the fly: a product of two literals becomes the
/// literal defined equivalent to their conjunction through the Tseitin encoder.
#[derive(Clone, Debug, Default)]
pub struct IntegerExpression {
    terms: Vec<(i64, Literal)>,
    constant: i64,
}

impl IntegerExpression {
    pub fn from_constant(constant: i64) -> IntegerExpression {
        IntegerExpression {
            terms: vec![],
            constant,
        }
    }

    pub fn from_literal(literal: Literal) -> IntegerExpression {
        IntegerExpression {
            terms: vec![(1, literal)],
            constant: 0,
        }
    }

    pub fn add_term(&mut self, coefficient: i64, literal: Literal) {
        if coefficient != 0 {
            self.terms.push((coefficient, literal));
        }
    }

    pub fn add_constant(&mut self, constant: i64) {
        self.constant += constant;
    }

    pub fn get_constant(&self) -> i64 {
        self.constant
    }

    pub fn get_terms(&self) -> &[(i64, Literal)] {
        &self.terms
    }

    pub fn add(&self, other: &IntegerExpression) -> IntegerExpression {
        let mut result = self.clone();
        result.terms.extend_from_slice(&other.terms);
        result.constant += other.constant;
        result.merge_duplicate_literals();
        result
    }

    pub fn subtract(&self, other: &IntegerExpression) -> IntegerExpression {
        self.add(&other.scaled(-1))
    }

    pub fn scaled(&self, factor: i64) -> IntegerExpression {
        let mut result = IntegerExpression {
            terms: self
                .terms
                .iter()
                .map(|(coefficient, literal)| (coefficient * factor, *literal))
                .collect(),
            constant: self.constant * factor,
        };
        result.merge_duplicate_literals();
        result
    }

    /// The product of two expressions, linearized: each product of two distinct literals is
    /// replaced by the literal equivalent to their conjunction.
    pub fn multiply(
        &self,
        other: &IntegerExpression,
        solver: &mut PseudoBooleanSolver,
        encoder: &mut TseitinEncoder,
    ) -> Result<IntegerExpression, ConstraintOperationError> {
        let mut result = IntegerExpression::from_constant(self.constant * other.constant);

        for (coefficient, literal) in &self.terms {
            result.add_term(coefficient * other.constant, *literal);
        }
        for (coefficient, literal) in &other.terms {
            result.add_term(coefficient * self.constant, *literal);
        }
        for (coefficient1, literal1) in &self.terms {
            for (coefficient2, literal2) in &other.terms {
                let product_literal =
                    encoder.encode_conjunction(solver, &[*literal1, *literal2])?;
                result.add_term(coefficient1 * coefficient2, product_literal);
            }
        }

        result.merge_duplicate_literals();
        Ok(result)
    }

    pub fn evaluate(&self, solution: &Solution) -> i64 {
        let mut value = self.constant;
        for (coefficient, literal) in &self.terms {
            value += coefficient * (solution.get_literal_value(*literal) as i64);
        }
        value
    }

    /// Posts `self >= bound` as a pseudo-Boolean constraint over the underlying bits.
    pub fn add_greater_or_equal(
        &self,
        solver: &mut PseudoBooleanSolver,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        //negative coefficients are eliminated through a * l = a - a * (not l)
        let mut rhs = bound as i128 - self.constant as i128;
        let mut positive_terms: Vec<WeightedLiteral> = vec![];
        for (coefficient, literal) in &self.terms {
            if *coefficient > 0 {
                positive_terms.push(WeightedLiteral {
                    literal: *literal,
                    weight: *coefficient as u64,
                });
            } else if *coefficient < 0 {
                rhs += (-*coefficient) as i128;
                positive_terms.push(WeightedLiteral {
                    literal: !*literal,
                    weight: (-*coefficient) as u64,
                });
            }
        }

        if rhs <= 0 {
            //trivially satisfied
            return Ok(());
        }
        marrow_assert_simple!(rhs <= u64::MAX as i128);

        solver.add_pb_at_least(positive_terms, rhs as u64)
    }

    /// Posts `self <= bound`.
    pub fn add_less_or_equal(
        &self,
        solver: &mut PseudoBooleanSolver,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.scaled(-1).add_greater_or_equal(solver, -bound)
    }

    /// Posts `self == bound`.
    pub fn add_equal(
        &self,
        solver: &mut PseudoBooleanSolver,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.add_greater_or_equal(solver, bound)?;
        self.add_less_or_equal(solver, bound)
    }

    fn merge_duplicate_literals(&mut self) {
        if self.terms.len() <= 1 {
            return;
        }
        let mut coefficient_per_literal: HashMap<Literal, i64> = HashMap::default();
        for (coefficient, literal) in &self.terms {
            *coefficient_per_literal.entry(*literal).or_insert(0) += coefficient;
        }
        self.terms = self
            .terms
            .iter()
            .filter_map(|(_coefficient, literal)| {
                coefficient_per_literal
                    .remove(literal)
                    .filter(|merged| *merged != 0)
                    .map(|merged| (merged, *literal))
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::SolverExecutionFlag;
    use crate::encoders::ReificationMode;
    use crate::engine::SolverOptions;

    fn new_solver() -> PseudoBooleanSolver {
        PseudoBooleanSolver::new(SolverOptions::default())
    }

    #[test]
    fn test_bit_width_covers_the_range() {
        let mut solver = new_solver();
        let integer = BoundedInteger::new(&mut solver, 3, 10).expect("Valid bounds.");
        //the range is 7, three bits suffice and no clamp is needed
        assert_eq!(integer.expression().get_terms().len(), 3);
    }

    #[test]
    fn test_constant_integer_has_no_bits() {
        let mut solver = new_solver();
        let integer = BoundedInteger::new(&mut solver, 5, 5).expect("Valid bounds.");
        assert!(integer.expression().get_terms().is_empty());
        assert_eq!(integer.expression().get_constant(), 5);
    }

    #[test]
    fn test_clamp_excludes_values_above_the_range() {
        let mut solver = new_solver();
        //range 5 requires three bits, patterns 6 and 7 must be cut off
        let integer = BoundedInteger::new(&mut solver, 0, 5).expect("Valid bounds.");
        integer
            .expression()
            .add_greater_or_equal(&mut solver, 6)
            .expect("Valid constraint.");
        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Infeasible);
    }

    #[test]
    fn test_equality_pins_the_value() {
        let mut solver = new_solver();
        let integer = BoundedInteger::new(&mut solver, 3, 10).expect("Valid bounds.");
        integer
            .expression()
            .add_equal(&mut solver, 7)
            .expect("Valid constraint.");

        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        assert_eq!(integer.evaluate(&solver.get_solution()), 7);
    }

    #[test]
    fn test_linear_combination_of_integers() {
        let mut solver = new_solver();
        let x = BoundedInteger::new(&mut solver, 0, 7).expect("Valid bounds.");
        let y = BoundedInteger::new(&mut solver, 0, 7).expect("Valid bounds.");

        //2x - y == 5 with y >= 3 admits x = 4, y = 3
        let combination = x.expression().scaled(2).subtract(&y.expression());
        combination.add_equal(&mut solver, 5).expect("Valid constraint.");
        y.expression()
            .add_greater_or_equal(&mut solver, 3)
            .expect("Valid constraint.");

        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert_eq!(
            2 * x.evaluate(&solution) - y.evaluate(&solution),
            5
        );
        assert!(y.evaluate(&solution) >= 3);
    }

    #[test]
    fn test_product_is_linearized() {
        let mut solver = new_solver();
        let mut encoder = TseitinEncoder::new(ReificationMode::Clauses);
        let x = BoundedInteger::new(&mut solver, 0, 3).expect("Valid bounds.");
        let y = BoundedInteger::new(&mut solver, 0, 3).expect("Valid bounds.");

        let product = x
            .expression()
            .multiply(&y.expression(), &mut solver, &mut encoder)
            .expect("Valid encoding.");
        product.add_equal(&mut solver, 6).expect("Valid constraint.");

        assert_eq!(solver.solve(i64::MAX), SolverExecutionFlag::Feasible);
        let solution = solver.get_solution();
        assert_eq!(
            x.evaluate(&solution) * y.evaluate(&solution),
            6
        );
        assert_eq!(product.evaluate(&solution), 6);
    }
}
