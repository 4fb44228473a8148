//! Reusable constraint gadgets

use crate::{ConstraintSystem, LinearCombination, R1CSError, Variable};
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use zkp_field::FieldLike;

pub mod mimc;

pub use mimc::{Mimc, MIMC_ROUNDS};

/// Enforce that `var` is boolean via `var * (1 - var) = 0`
pub fn enforce_boolean<F: FieldLike>(cs: &mut ConstraintSystem<F>, var: Variable) {
    let mut one_minus = LinearCombination::from_constant(F::one());
    one_minus.add_term(var, -F::one());
    cs.enforce_multiplication(
        LinearCombination::from_variable(var),
        one_minus,
        LinearCombination::new(),
    );
}

/// Decompose `value_var` into `num_bits` little-endian boolean variables.
///
/// `num_bits` must stay below the modulus bit size so the decomposition is
/// unique. A value that does not fit leaves the system unsatisfied.
pub fn to_bits_le<F: FieldLike>(
    cs: &mut ConstraintSystem<F>,
    value_var: Variable,
    num_bits: usize,
) -> Result<Vec<Variable>, R1CSError> {
    if num_bits == 0 || num_bits >= F::MODULUS_BIT_SIZE as usize {
        return Err(R1CSError::InvalidParameter(format!(
            "bit decomposition width {num_bits} out of range"
        )));
    }

    let bits = cs.value(value_var).map(|value| value.into_bigint());
    let mut bit_vars = Vec::with_capacity(num_bits);
    for i in 0..num_bits {
        let bit_value = bits
            .as_ref()
            .map(|b| if b.get_bit(i) { F::one() } else { F::zero() });
        let bit_var = cs.allocate_variable(bit_value)?;
        enforce_boolean(cs, bit_var);
        bit_vars.push(bit_var);
    }

    let mut sum = LinearCombination::new();
    let mut power_of_two = F::one();
    for &bit_var in &bit_vars {
        sum.add_term(bit_var, power_of_two);
        power_of_two.double_in_place();
    }

    cs.enforce_equal(LinearCombination::from_variable(value_var), sum);
    Ok(bit_vars)
}
