//! Validated, immutable circuit descriptors
//!
//! A `CircuitDescriptor` is the frozen form of a synthesized constraint
//! system. It is checked once on construction, has a canonical byte encoding
//! and is identified by the SHA-256 digest of that encoding.

use crate::{Circuit, Constraint, ConstraintSystem, LinearCombination, R1CSError, Variable};
use ark_ff::{One, Zero};
use ark_serialize::CanonicalSerialize;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::io::{Read, Write};
use zkp_field::{from_canonical_bytes, to_canonical_bytes, FieldLike};

/// Length in bytes of a circuit id
pub const CIRCUIT_ID_BYTES: usize = 32;

const CIRCUIT_ID_DOMAIN: &[u8] = b"zkp-r1cs/circuit-id/v1";

/// Validated R1CS instance shared by setup, proving and verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitDescriptor<F: FieldLike> {
    constraints: Vec<Constraint<F>>,
    num_public_inputs: usize,
    num_variables: usize,
    circuit_id: [u8; CIRCUIT_ID_BYTES],
}

/// Values produced by running a circuit in assignment mode
#[derive(Clone)]
pub struct CircuitAssignment<F: FieldLike> {
    /// Public input values, in declaration order
    pub public_inputs: Vec<F>,
    /// Private variable values, in allocation order
    pub private_inputs: Vec<F>,
}

impl<F: FieldLike> fmt::Debug for CircuitAssignment<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitAssignment")
            .field("public_inputs", &self.public_inputs.len())
            .field("private_inputs", &"<redacted>")
            .finish()
    }
}

impl<F: FieldLike> CircuitDescriptor<F> {
    /// Synthesize `circuit` in shape-only mode and validate the result
    pub fn compile<C: Circuit<F> + ?Sized>(circuit: &C) -> Result<Self, R1CSError> {
        let mut cs = ConstraintSystem::new(circuit.num_public_inputs());
        circuit.synthesize(&mut cs)?;
        let (constraints, num_public_inputs, num_variables, _) = cs.into_parts();
        let descriptor = Self::from_parts(constraints, num_public_inputs, num_variables)?;

        tracing::debug!(
            circuit = circuit.name(),
            constraints = descriptor.num_constraints(),
            variables = descriptor.num_variables(),
            public_inputs = descriptor.num_public_inputs(),
            "compiled circuit"
        );
        Ok(descriptor)
    }

    /// Validate a hand-built constraint system
    pub fn from_parts(
        constraints: Vec<Constraint<F>>,
        num_public_inputs: usize,
        num_variables: usize,
    ) -> Result<Self, R1CSError> {
        let first_private = num_public_inputs
            .checked_add(1)
            .filter(|first| *first <= num_variables);
        let Some(first_private) = first_private else {
            return Err(R1CSError::TooFewVariables {
                num_variables,
                num_public_inputs,
            });
        };
        if constraints.is_empty() {
            return Err(R1CSError::EmptyCircuit);
        }

        let mut referenced = BTreeSet::new();
        for (constraint_index, constraint) in constraints.iter().enumerate() {
            if let Some(var) = constraint.max_variable() {
                if var.index() >= num_variables {
                    return Err(R1CSError::DanglingVariable {
                        constraint_index,
                        var_index: var.index(),
                    });
                }
            }
            if constraint.is_constant()
                && constraint.a.constant_term() * constraint.b.constant_term()
                    != constraint.c.constant_term()
            {
                return Err(R1CSError::UnsatisfiableConstraint { constraint_index });
            }
            referenced.extend(
                constraint
                    .variables()
                    .map(|var| var.index())
                    .filter(|index| *index >= first_private),
            );
        }

        let unused = num_variables - first_private - referenced.len();
        if unused > 0 {
            tracing::warn!(unused, "private variables not referenced by any constraint");
        }

        let mut descriptor = Self {
            constraints,
            num_public_inputs,
            num_variables,
            circuit_id: [0u8; CIRCUIT_ID_BYTES],
        };
        descriptor.circuit_id = descriptor.compute_circuit_id();
        Ok(descriptor)
    }

    /// Run `circuit` in assignment mode and return its public and private values.
    ///
    /// The synthesized shape must match this descriptor exactly.
    pub fn assign<C: Circuit<F> + ?Sized>(
        &self,
        circuit: &C,
    ) -> Result<CircuitAssignment<F>, R1CSError> {
        let public_inputs = circuit
            .public_inputs()
            .ok_or(R1CSError::MissingPublicInputs)?;
        if public_inputs.len() != self.num_public_inputs {
            return Err(R1CSError::InvalidPublicInputSize {
                expected: self.num_public_inputs,
                actual: public_inputs.len(),
            });
        }

        let mut cs = ConstraintSystem::with_public_inputs(&public_inputs);
        circuit.synthesize(&mut cs)?;
        let (constraints, _, num_variables, values) = cs.into_parts();

        let shape_mismatch = R1CSError::ShapeMismatch {
            expected_constraints: self.constraints.len(),
            actual_constraints: constraints.len(),
            expected_variables: self.num_variables,
            actual_variables: num_variables,
        };
        if num_variables != self.num_variables || constraints != self.constraints {
            return Err(shape_mismatch);
        }
        let mut values = values.ok_or(shape_mismatch)?;
        let private_inputs = values.split_off(1 + self.num_public_inputs);

        Ok(CircuitAssignment {
            public_inputs,
            private_inputs,
        })
    }

    /// Build `z = [1 | public | private]` after checking both lengths
    pub fn full_assignment(&self, public_inputs: &[F], private_inputs: &[F]) -> Result<Vec<F>, R1CSError> {
        if public_inputs.len() != self.num_public_inputs {
            return Err(R1CSError::InvalidPublicInputSize {
                expected: self.num_public_inputs,
                actual: public_inputs.len(),
            });
        }
        if private_inputs.len() != self.num_private_inputs() {
            return Err(R1CSError::InvalidWitnessSize {
                expected: self.num_private_inputs(),
                actual: private_inputs.len(),
            });
        }

        let mut assignment = Vec::with_capacity(self.num_variables);
        assignment.push(F::one());
        assignment.extend_from_slice(public_inputs);
        assignment.extend_from_slice(private_inputs);
        Ok(assignment)
    }

    /// Check every constraint, reporting the first one that fails
    pub fn is_satisfied(&self, assignment: &[F]) -> Result<(), R1CSError> {
        if assignment.len() != self.num_variables {
            return Err(R1CSError::InvalidAssignmentSize {
                expected: self.num_variables,
                actual: assignment.len(),
            });
        }
        if !assignment[0].is_one() {
            return Err(R1CSError::InvalidConstantVariable);
        }

        for (constraint_index, constraint) in self.constraints.iter().enumerate() {
            if !constraint.is_satisfied(assignment)? {
                return Err(R1CSError::UnsatisfiedConstraint { constraint_index });
            }
        }
        Ok(())
    }

    /// Constraints of the circuit
    pub fn constraints(&self) -> &[Constraint<F>] {
        &self.constraints
    }

    /// Number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of public inputs (excluding the constant)
    pub fn num_public_inputs(&self) -> usize {
        self.num_public_inputs
    }

    /// Number of private variables
    pub fn num_private_inputs(&self) -> usize {
        self.num_variables - 1 - self.num_public_inputs
    }

    /// Total number of variables including the constant
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// SHA-256 identifier of the canonical encoding
    pub fn circuit_id(&self) -> [u8; CIRCUIT_ID_BYTES] {
        self.circuit_id
    }

    /// Canonical encoding: counts, then each constraint's A, B and C terms.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_canonical(&mut bytes);
        bytes
    }

    /// Decode and re-validate a canonical encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, R1CSError> {
        let mut reader = bytes;
        let num_public_inputs = read_len(&mut reader)?;
        let num_variables = read_len(&mut reader)?;
        let num_constraints = read_len(&mut reader)?;

        if num_public_inputs >= num_variables {
            return Err(R1CSError::TooFewVariables {
                num_variables,
                num_public_inputs,
            });
        }

        let element_bytes = F::zero().compressed_size();
        let mut constraints = Vec::with_capacity(num_constraints.min(reader.len()));
        for _ in 0..num_constraints {
            let a = read_lc(&mut reader, element_bytes)?;
            let b = read_lc(&mut reader, element_bytes)?;
            let c = read_lc(&mut reader, element_bytes)?;
            constraints.push(Constraint::new(a, b, c));
        }
        if !reader.is_empty() {
            return Err(R1CSError::Encoding(format!(
                "{} trailing bytes after circuit",
                reader.len()
            )));
        }

        // Unreferenced variables are bounded by the input length
        let referenced_bound = constraints
            .iter()
            .filter_map(|constraint| constraint.max_variable())
            .map(|var| var.index().saturating_add(1))
            .max()
            .unwrap_or(1)
            .max(num_public_inputs + 1);
        if num_variables > referenced_bound.saturating_add(bytes.len()) {
            return Err(R1CSError::Encoding(format!(
                "{num_variables} variables declared but at most {referenced_bound} referenced"
            )));
        }

        Self::from_parts(constraints, num_public_inputs, num_variables)
    }

    fn write_canonical<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.num_public_inputs as u64)?;
        writer.write_u64::<LittleEndian>(self.num_variables as u64)?;
        writer.write_u64::<LittleEndian>(self.constraints.len() as u64)?;
        for constraint in &self.constraints {
            for lc in [&constraint.a, &constraint.b, &constraint.c] {
                writer.write_u32::<LittleEndian>(lc.len() as u32)?;
                for (var, coeff) in lc.terms() {
                    writer.write_u64::<LittleEndian>(var.index() as u64)?;
                    writer.write_all(&to_canonical_bytes(coeff))?;
                }
            }
        }
        Ok(())
    }

    fn compute_circuit_id(&self) -> [u8; CIRCUIT_ID_BYTES] {
        let mut hasher = Sha256::new();
        hasher.update(CIRCUIT_ID_DOMAIN);
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize, R1CSError> {
    let value = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| R1CSError::Encoding(e.to_string()))?;
    usize::try_from(value).map_err(|_| R1CSError::Encoding(format!("length {value} overflows usize")))
}

fn read_lc<F: FieldLike>(reader: &mut &[u8], element_bytes: usize) -> Result<LinearCombination<F>, R1CSError> {
    let num_terms = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| R1CSError::Encoding(e.to_string()))?;

    let mut lc = LinearCombination::new();
    let mut previous: Option<Variable> = None;
    let mut buf = vec![0u8; element_bytes];
    for _ in 0..num_terms {
        let var = Variable(read_len(reader)?);
        reader
            .read_exact(&mut buf)
            .map_err(|e| R1CSError::Encoding(e.to_string()))?;
        let coeff: F = from_canonical_bytes(&buf)?;

        if previous.map_or(false, |prev| prev >= var) || coeff.is_zero() {
            return Err(R1CSError::Encoding(
                "linear combination terms are not in canonical form".to_string(),
            ));
        }
        previous = Some(var);
        lc.add_term(var, coeff);
    }
    Ok(lc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::MultiplyCircuit;
    use zkp_field::F;

    fn square_circuit() -> CircuitDescriptor<F> {
        // x * x = out, out public
        let constraints = vec![Constraint::new(
            Variable(2).into(),
            Variable(2).into(),
            Variable(1).into(),
        )];
        CircuitDescriptor::from_parts(constraints, 1, 3).unwrap()
    }

    #[test]
    fn test_rejects_empty_circuit() {
        let err = CircuitDescriptor::<F>::from_parts(vec![], 1, 2).unwrap_err();
        assert!(matches!(err, R1CSError::EmptyCircuit));
    }

    #[test]
    fn test_rejects_dangling_variable() {
        let constraints = vec![Constraint::<F>::new(
            Variable(1).into(),
            Variable(7).into(),
            Variable(2).into(),
        )];
        let err = CircuitDescriptor::from_parts(constraints, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            R1CSError::DanglingVariable { constraint_index: 0, var_index: 7 }
        ));
    }

    #[test]
    fn test_rejects_unsatisfiable_constant_constraint() {
        let constraints = vec![
            Constraint::<F>::new(Variable(1).into(), Variable(1).into(), Variable(1).into()),
            Constraint::new(
                LinearCombination::from_constant(F::from(2u64)),
                LinearCombination::from_constant(F::from(2u64)),
                LinearCombination::from_constant(F::from(5u64)),
            ),
        ];
        let err = CircuitDescriptor::from_parts(constraints, 1, 2).unwrap_err();
        assert!(matches!(err, R1CSError::UnsatisfiableConstraint { constraint_index: 1 }));
    }

    #[test]
    fn test_rejects_too_few_variables() {
        let constraints = vec![Constraint::<F>::new(
            Variable::ONE.into(),
            Variable::ONE.into(),
            Variable::ONE.into(),
        )];
        let err = CircuitDescriptor::from_parts(constraints, 3, 2).unwrap_err();
        assert!(matches!(err, R1CSError::TooFewVariables { .. }));
    }

    #[test]
    fn test_is_satisfied_reports_index() {
        let circuit = square_circuit();
        let good = circuit.full_assignment(&[F::from(9u64)], &[F::from(3u64)]).unwrap();
        circuit.is_satisfied(&good).unwrap();

        let bad = circuit.full_assignment(&[F::from(10u64)], &[F::from(3u64)]).unwrap();
        assert!(matches!(
            circuit.is_satisfied(&bad),
            Err(R1CSError::UnsatisfiedConstraint { constraint_index: 0 })
        ));

        let mut wrong_constant = good;
        wrong_constant[0] = F::from(2u64);
        assert!(matches!(
            circuit.is_satisfied(&wrong_constant),
            Err(R1CSError::InvalidConstantVariable)
        ));
    }

    #[test]
    fn test_full_assignment_sizes() {
        let circuit = square_circuit();
        assert!(matches!(
            circuit.full_assignment(&[], &[F::one()]),
            Err(R1CSError::InvalidPublicInputSize { expected: 1, actual: 0 })
        ));
        assert!(matches!(
            circuit.full_assignment(&[F::one()], &[]),
            Err(R1CSError::InvalidWitnessSize { expected: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_encoding_preserves_identity() {
        let circuit = square_circuit();
        let bytes = circuit.to_bytes();
        let decoded = CircuitDescriptor::<F>::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, circuit);
        assert_eq!(decoded.circuit_id(), circuit.circuit_id());
    }

    #[test]
    fn test_decoding_rejects_trailing_and_truncated_bytes() {
        let mut bytes = square_circuit().to_bytes();
        bytes.push(0);
        assert!(matches!(
            CircuitDescriptor::<F>::from_bytes(&bytes),
            Err(R1CSError::Encoding(_))
        ));

        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            CircuitDescriptor::<F>::from_bytes(&bytes),
            Err(R1CSError::Encoding(_))
        ));
    }

    fn crafted_header(num_public_inputs: u64, num_variables: u64) -> Vec<u8> {
        // Header of the square circuit with its counts replaced
        let mut bytes = square_circuit().to_bytes();
        bytes[..8].copy_from_slice(&num_public_inputs.to_le_bytes());
        bytes[8..16].copy_from_slice(&num_variables.to_le_bytes());
        bytes
    }

    #[test]
    fn test_decoding_rejects_overflowing_public_count() {
        let err = CircuitDescriptor::<F>::from_bytes(&crafted_header(u64::MAX, 4)).unwrap_err();
        assert!(matches!(err, R1CSError::TooFewVariables { .. }));
        assert!(err.is_structural());

        let err = CircuitDescriptor::<F>::from_parts(
            square_circuit().constraints().to_vec(),
            usize::MAX,
            3,
        )
        .unwrap_err();
        assert!(matches!(err, R1CSError::TooFewVariables { .. }));
    }

    #[test]
    fn test_decoding_rejects_huge_variable_count() {
        let err = CircuitDescriptor::<F>::from_bytes(&crafted_header(1, 1 << 62)).unwrap_err();
        assert!(matches!(err, R1CSError::Encoding(_)));

        let err = CircuitDescriptor::<F>::from_bytes(&crafted_header(0, u64::MAX)).unwrap_err();
        assert!(matches!(err, R1CSError::Encoding(_)));
    }

    #[test]
    fn test_unreferenced_variable_survives_encoding() {
        // Variable 3 is declared but never constrained
        let constraints = vec![Constraint::<F>::new(
            Variable(2).into(),
            Variable(2).into(),
            Variable(1).into(),
        )];
        let circuit = CircuitDescriptor::from_parts(constraints, 1, 4).unwrap();
        let decoded = CircuitDescriptor::<F>::from_bytes(&circuit.to_bytes()).unwrap();
        assert_eq!(decoded, circuit);
        assert_eq!(decoded.num_private_inputs(), 2);
    }

    #[test]
    fn test_circuit_id_depends_on_shape() {
        let a = square_circuit();
        let b = CircuitDescriptor::<F>::compile(&MultiplyCircuit::<F>::shape()).unwrap();
        assert_ne!(a.circuit_id(), b.circuit_id());
    }

    #[test]
    fn test_assign_splits_values() {
        let descriptor = CircuitDescriptor::<F>::compile(&MultiplyCircuit::<F>::shape()).unwrap();
        let circuit = MultiplyCircuit::new(F::from(3u64), F::from(5u64));
        let assignment = descriptor.assign(&circuit).unwrap();
        assert_eq!(assignment.public_inputs, vec![F::from(15u64)]);
        assert_eq!(assignment.private_inputs, vec![F::from(3u64), F::from(5u64)]);

        let z = descriptor
            .full_assignment(&assignment.public_inputs, &assignment.private_inputs)
            .unwrap();
        descriptor.is_satisfied(&z).unwrap();
    }

    #[test]
    fn test_assign_requires_values() {
        let descriptor = CircuitDescriptor::<F>::compile(&MultiplyCircuit::<F>::shape()).unwrap();
        let err = descriptor.assign(&MultiplyCircuit::<F>::shape()).unwrap_err();
        assert!(matches!(err, R1CSError::MissingPublicInputs));
    }
}
