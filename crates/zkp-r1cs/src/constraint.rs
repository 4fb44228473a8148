//! Rank-1 constraints

use crate::{LinearCombination, R1CSError, Variable};
use std::fmt;
use zkp_field::FieldLike;

/// R1CS constraint: <A, z> * <B, z> = <C, z>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint<F: FieldLike> {
    /// Left linear combination (A)
    pub a: LinearCombination<F>,
    /// Right linear combination (B)
    pub b: LinearCombination<F>,
    /// Output linear combination (C)
    pub c: LinearCombination<F>,
}

impl<F: FieldLike> Constraint<F> {
    /// Create a new constraint
    pub fn new(a: LinearCombination<F>, b: LinearCombination<F>, c: LinearCombination<F>) -> Self {
        Self { a, b, c }
    }

    /// Check if this constraint is satisfied by the given assignment
    pub fn is_satisfied(&self, assignment: &[F]) -> Result<bool, R1CSError> {
        let a_val = self.a.evaluate(assignment)?;
        let b_val = self.b.evaluate(assignment)?;
        let c_val = self.c.evaluate(assignment)?;

        Ok(a_val * b_val == c_val)
    }

    /// Whether the constraint mentions nothing but the constant variable
    pub fn is_constant(&self) -> bool {
        self.a.is_constant() && self.b.is_constant() && self.c.is_constant()
    }

    /// Largest variable index referenced by any of the three combinations
    pub fn max_variable(&self) -> Option<Variable> {
        [&self.a, &self.b, &self.c]
            .iter()
            .filter_map(|lc| lc.max_variable())
            .max()
    }

    /// Iterate over every variable referenced (may repeat)
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.a
            .terms()
            .iter()
            .chain(self.b.terms())
            .chain(self.c.terms())
            .map(|(var, _)| *var)
    }
}

impl<F: FieldLike> fmt::Display for Constraint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) * ({}) = ({})", self.a, self.b, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;
    use zkp_field::F;

    #[test]
    fn test_constraint_satisfaction() {
        // x * y = z
        let constraint = Constraint::<F>::new(
            Variable(1).into(),
            Variable(2).into(),
            Variable(3).into(),
        );

        let good = vec![F::one(), F::from(3u64), F::from(4u64), F::from(12u64)];
        assert!(constraint.is_satisfied(&good).unwrap());

        let bad = vec![F::one(), F::from(3u64), F::from(4u64), F::from(13u64)];
        assert!(!constraint.is_satisfied(&bad).unwrap());

        assert_eq!(constraint.max_variable(), Some(Variable(3)));
        assert!(!constraint.is_constant());
    }

    #[test]
    fn test_constant_constraint() {
        let constraint = Constraint::<F>::new(
            LinearCombination::from_constant(F::from(2u64)),
            LinearCombination::from_constant(F::from(3u64)),
            LinearCombination::from_constant(F::from(6u64)),
        );
        assert!(constraint.is_constant());
        assert!(constraint.is_satisfied(&[F::one()]).unwrap());
    }
}
