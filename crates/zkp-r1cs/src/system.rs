//! Constraint system builder and the `Circuit` trait
//!
//! The same builder runs in two modes. In shape mode (`new`) only the
//! constraint structure is recorded; in assignment mode (`with_public_inputs`)
//! every allocation must also carry a value, so a single `synthesize`
//! implementation yields both the circuit descriptor and the witness.

use crate::{Constraint, LinearCombination, R1CSError, Variable};
use ark_ff::One;
use zkp_field::FieldLike;

/// R1CS builder used while synthesizing a circuit
#[derive(Debug, Clone)]
pub struct ConstraintSystem<F: FieldLike> {
    constraints: Vec<Constraint<F>>,
    num_public_inputs: usize,
    num_variables: usize,
    values: Option<Vec<F>>,
}

impl<F: FieldLike> ConstraintSystem<F> {
    /// Create a shape-only system with the given number of public inputs
    pub fn new(num_public_inputs: usize) -> Self {
        Self {
            constraints: Vec::new(),
            num_public_inputs,
            num_variables: 1 + num_public_inputs,
            values: None,
        }
    }

    /// Create a system that also records values, seeded with public inputs
    pub fn with_public_inputs(public_inputs: &[F]) -> Self {
        let mut values = Vec::with_capacity(1 + public_inputs.len());
        values.push(F::one());
        values.extend_from_slice(public_inputs);

        Self {
            constraints: Vec::new(),
            num_public_inputs: public_inputs.len(),
            num_variables: 1 + public_inputs.len(),
            values: Some(values),
        }
    }

    /// Whether values are being recorded
    pub fn is_assigning(&self) -> bool {
        self.values.is_some()
    }

    /// Handle of the `index`-th public input
    pub fn public_input(&self, index: usize) -> Result<Variable, R1CSError> {
        if index >= self.num_public_inputs {
            return Err(R1CSError::VariableOutOfBounds {
                var_index: index + 1,
                num_vars: self.num_public_inputs + 1,
            });
        }
        Ok(Variable(index + 1))
    }

    /// Allocate a new private variable.
    ///
    /// In assignment mode a missing value is an error; in shape mode the
    /// value is ignored.
    pub fn allocate_variable(&mut self, value: Option<F>) -> Result<Variable, R1CSError> {
        let var = Variable(self.num_variables);
        if let Some(values) = self.values.as_mut() {
            let value = value.ok_or(R1CSError::MissingAssignment {
                var_index: var.index(),
            })?;
            values.push(value);
        }
        self.num_variables += 1;
        Ok(var)
    }

    /// Add a constraint to the system: A * B = C
    pub fn add_constraint(
        &mut self,
        a: LinearCombination<F>,
        b: LinearCombination<F>,
        c: LinearCombination<F>,
    ) {
        self.constraints.push(Constraint::new(a, b, c));
    }

    /// Enforce `left = right` as `(left - right) * 1 = 0`
    pub fn enforce_equal(&mut self, left: LinearCombination<F>, right: LinearCombination<F>) {
        let diff = left - right;
        self.add_constraint(
            diff,
            LinearCombination::from_constant(F::one()),
            LinearCombination::new(),
        );
    }

    /// Enforce `left * right = output`
    pub fn enforce_multiplication(
        &mut self,
        left: LinearCombination<F>,
        right: LinearCombination<F>,
        output: LinearCombination<F>,
    ) {
        self.add_constraint(left, right, output);
    }

    /// Value of a variable, when assigning
    pub fn value(&self, var: Variable) -> Option<F> {
        self.values.as_ref()?.get(var.index()).copied()
    }

    /// Value of a linear combination, when assigning
    pub fn evaluate(&self, lc: &LinearCombination<F>) -> Option<F> {
        lc.evaluate(self.values.as_ref()?).ok()
    }

    /// Number of constraints added so far
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of variables including the constant and public inputs
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Number of public inputs
    pub fn num_public_inputs(&self) -> usize {
        self.num_public_inputs
    }

    /// Constraints added so far
    pub fn constraints(&self) -> &[Constraint<F>] {
        &self.constraints
    }

    /// Full assignment vector, when assigning
    pub fn assignment(&self) -> Option<&[F]> {
        self.values.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Vec<Constraint<F>>, usize, usize, Option<Vec<F>>) {
        (
            self.constraints,
            self.num_public_inputs,
            self.num_variables,
            self.values,
        )
    }
}

/// A circuit that can be synthesized into a constraint system.
///
/// `synthesize` must produce the same constraints whether or not values are
/// present: the structure may depend on the circuit's fixed parameters but
/// never on witness data.
pub trait Circuit<F: FieldLike> {
    /// Short label used in logs
    fn name(&self) -> &'static str {
        "circuit"
    }

    /// Number of public inputs the circuit exposes
    fn num_public_inputs(&self) -> usize;

    /// Public input values, or `None` for a shape-only instance
    fn public_inputs(&self) -> Option<Vec<F>>;

    /// Allocate variables and add constraints
    fn synthesize(&self, cs: &mut ConstraintSystem<F>) -> Result<(), R1CSError>;
}
