//! Sparse linear combinations over the assignment vector

use crate::{R1CSError, Variable};
use ark_ff::Zero;
use std::fmt;
use zkp_field::FieldLike;

/// Sparse linear combination `Σ coeff_i * var_i`.
///
/// Terms are kept sorted by variable index with no zero coefficients, so two
/// combinations that denote the same polynomial compare equal and encode to
/// the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearCombination<F: FieldLike> {
    terms: Vec<(Variable, F)>,
}

impl<F: FieldLike> LinearCombination<F> {
    /// Create a new empty linear combination
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Create a linear combination from a single variable
    pub fn from_variable(var: Variable) -> Self {
        let mut lc = Self::new();
        lc.add_term(var, F::one());
        lc
    }

    /// Create a linear combination from a constant
    pub fn from_constant(constant: F) -> Self {
        let mut lc = Self::new();
        lc.add_term(Variable::ONE, constant);
        lc
    }

    /// Add `coeff * var`, merging with an existing term for `var`
    pub fn add_term(&mut self, var: Variable, coeff: F) {
        if coeff.is_zero() {
            return;
        }

        match self.terms.binary_search_by_key(&var, |(v, _)| *v) {
            Ok(pos) => {
                self.terms[pos].1 += coeff;
                if self.terms[pos].1.is_zero() {
                    self.terms.remove(pos);
                }
            }
            Err(pos) => self.terms.insert(pos, (var, coeff)),
        }
    }

    /// Multiply this linear combination by a scalar
    pub fn mul_scalar(&mut self, scalar: F) {
        if scalar.is_zero() {
            self.terms.clear();
            return;
        }

        for (_, coeff) in self.terms.iter_mut() {
            *coeff *= scalar;
        }
    }

    /// Add another linear combination to this one
    pub fn add_lc(&mut self, other: &LinearCombination<F>) {
        for &(var, coeff) in &other.terms {
            self.add_term(var, coeff);
        }
    }

    /// Subtract another linear combination from this one
    pub fn sub_lc(&mut self, other: &LinearCombination<F>) {
        for &(var, coeff) in &other.terms {
            self.add_term(var, -coeff);
        }
    }

    /// Evaluate this linear combination given a full assignment vector
    pub fn evaluate(&self, assignment: &[F]) -> Result<F, R1CSError> {
        let mut result = F::zero();

        for &(var, coeff) in &self.terms {
            let value = assignment
                .get(var.index())
                .ok_or(R1CSError::VariableOutOfBounds {
                    var_index: var.index(),
                    num_vars: assignment.len(),
                })?;
            result += coeff * value;
        }

        Ok(result)
    }

    /// Coefficient of the constant-one variable
    pub fn constant_term(&self) -> F {
        match self.terms.first() {
            Some((var, coeff)) if var.is_constant() => *coeff,
            _ => F::zero(),
        }
    }

    /// Whether the combination references only the constant variable
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|(var, _)| var.is_constant())
    }

    /// Check if this linear combination is zero
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of non-zero terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sorted `(variable, coefficient)` terms
    pub fn terms(&self) -> &[(Variable, F)] {
        &self.terms
    }

    /// Largest variable index referenced, if any
    pub fn max_variable(&self) -> Option<Variable> {
        self.terms.last().map(|(var, _)| *var)
    }
}

impl<F: FieldLike> Default for LinearCombination<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FieldLike> From<Variable> for LinearCombination<F> {
    fn from(var: Variable) -> Self {
        Self::from_variable(var)
    }
}

impl<F: FieldLike> fmt::Display for LinearCombination<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }

        for (i, (var, coeff)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}*{}", coeff, var)?;
        }
        Ok(())
    }
}

impl<F: FieldLike> std::ops::Add for LinearCombination<F> {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.add_lc(&other);
        self
    }
}

impl<F: FieldLike> std::ops::Add<&LinearCombination<F>> for LinearCombination<F> {
    type Output = Self;

    fn add(mut self, other: &Self) -> Self {
        self.add_lc(other);
        self
    }
}

impl<F: FieldLike> std::ops::Sub for LinearCombination<F> {
    type Output = Self;

    fn sub(mut self, other: Self) -> Self {
        self.sub_lc(&other);
        self
    }
}

impl<F: FieldLike> std::ops::Mul<F> for LinearCombination<F> {
    type Output = Self;

    fn mul(mut self, scalar: F) -> Self {
        self.mul_scalar(scalar);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;
    use proptest::prelude::*;
    use zkp_field::F;

    #[test]
    fn test_linear_combination_basic() {
        let mut lc = LinearCombination::<F>::new();
        lc.add_term(Variable(1), F::from(2u64));
        lc.add_term(Variable(2), F::from(3u64));

        // 2*5 + 3*7 = 31
        let assignment = vec![F::one(), F::from(5u64), F::from(7u64)];
        assert_eq!(lc.evaluate(&assignment).unwrap(), F::from(31u64));
    }

    #[test]
    fn test_terms_merge_and_cancel() {
        let mut lc = LinearCombination::<F>::from_variable(Variable(3));
        lc.add_term(Variable(1), F::from(4u64));
        lc.add_term(Variable(3), -F::one());
        assert_eq!(lc.terms(), &[(Variable(1), F::from(4u64))]);

        let diff = lc.clone() - lc;
        assert!(diff.is_zero());
    }

    #[test]
    fn test_constant_detection() {
        let lc = LinearCombination::<F>::from_constant(F::from(9u64));
        assert!(lc.is_constant());
        assert_eq!(lc.constant_term(), F::from(9u64));

        let mixed = lc + LinearCombination::from_variable(Variable(2));
        assert!(!mixed.is_constant());
        assert_eq!(mixed.constant_term(), F::from(9u64));
        assert_eq!(mixed.max_variable(), Some(Variable(2)));
    }

    #[test]
    fn test_evaluate_out_of_bounds() {
        let lc = LinearCombination::<F>::from_variable(Variable(5));
        let err = lc.evaluate(&[F::one()]).unwrap_err();
        assert!(matches!(err, R1CSError::VariableOutOfBounds { var_index: 5, num_vars: 1 }));
    }

    proptest! {
        #[test]
        fn prop_insertion_order_is_irrelevant(
            terms in proptest::collection::vec((0usize..8, 0u64..5), 0..16)
        ) {
            let mut forward = LinearCombination::<F>::new();
            for &(var, coeff) in &terms {
                forward.add_term(Variable(var), F::from(coeff));
            }
            let mut backward = LinearCombination::<F>::new();
            for &(var, coeff) in terms.iter().rev() {
                backward.add_term(Variable(var), F::from(coeff));
            }
            prop_assert_eq!(&forward, &backward);
            prop_assert!(forward.terms().windows(2).all(|w| w[0].0 < w[1].0));
            prop_assert!(forward.terms().iter().all(|(_, c)| !c.is_zero()));
        }

        #[test]
        fn prop_evaluation_is_linear(a in any::<u64>(), b in any::<u64>(), k in any::<u64>()) {
            let assignment = vec![F::one(), F::from(a), F::from(b)];
            let lc = LinearCombination::from_variable(Variable(1)) + LinearCombination::from_variable(Variable(2));
            let scaled = lc.clone() * F::from(k);
            prop_assert_eq!(
                scaled.evaluate(&assignment).unwrap(),
                lc.evaluate(&assignment).unwrap() * F::from(k)
            );
        }
    }
}
