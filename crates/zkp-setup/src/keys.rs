//! Groth16 proving and verifying keys

use ark_bls12_381::{Fr, G1Affine, G2Affine};
use ark_poly::{EvaluationDomain, Radix2EvaluationDomain};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zkp_qap::required_domain_rows;
use zkp_r1cs::{CircuitDescriptor, CIRCUIT_ID_BYTES};

/// Proving key: the circuit plus the Groth16 query vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvingKey {
    /// Circuit this key was generated for
    pub circuit: Arc<CircuitDescriptor<Fr>>,
    /// Id of `circuit` at setup time
    pub circuit_id: [u8; CIRCUIT_ID_BYTES],
    /// Size of the QAP evaluation domain
    pub domain_size: usize,
    /// `[α]₁`
    pub alpha_g1: G1Affine,
    /// `[β]₁`
    pub beta_g1: G1Affine,
    /// `[β]₂`
    pub beta_g2: G2Affine,
    /// `[δ]₁`
    pub delta_g1: G1Affine,
    /// `[δ]₂`
    pub delta_g2: G2Affine,
    /// `[A_i(τ)]₁` for every variable
    pub a_query: Vec<G1Affine>,
    /// `[B_i(τ)]₁` for every variable
    pub b_g1_query: Vec<G1Affine>,
    /// `[B_i(τ)]₂` for every variable
    pub b_g2_query: Vec<G2Affine>,
    /// `[τ^i Z(τ) / δ]₁` for `i < domain_size - 1`
    pub h_query: Vec<G1Affine>,
    /// `[(β A_i(τ) + α B_i(τ) + C_i(τ)) / δ]₁` for private variables
    pub l_query: Vec<G1Affine>,
}

/// Verifying key: everything a verifier needs, without the circuit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyingKey {
    /// Id of the circuit this key verifies
    pub circuit_id: [u8; CIRCUIT_ID_BYTES],
    /// Number of public inputs
    pub num_public_inputs: usize,
    /// `[α]₁`
    pub alpha_g1: G1Affine,
    /// `[β]₂`
    pub beta_g2: G2Affine,
    /// `[γ]₂`
    pub gamma_g2: G2Affine,
    /// `[δ]₂`
    pub delta_g2: G2Affine,
    /// `[(β A_i(τ) + α B_i(τ) + C_i(τ)) / γ]₁` for the constant and public inputs
    pub gamma_abc_g1: Vec<G1Affine>,
}

/// Inconsistency between a key and the circuit it claims to serve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyShapeError {
    /// Stored circuit id differs from the circuit's digest
    #[error("key circuit id does not match its circuit")]
    CircuitIdMismatch,

    /// Domain size differs from what the circuit requires
    #[error("domain size {actual} does not match the circuit's {expected}")]
    DomainSize {
        /// Size the circuit requires
        expected: usize,
        /// Size stored in the key
        actual: usize,
    },

    /// A query vector has the wrong length
    #[error("{query} has {actual} entries, circuit needs {expected}")]
    QueryLength {
        /// Name of the query vector
        query: &'static str,
        /// Length the circuit requires
        expected: usize,
        /// Length stored in the key
        actual: usize,
    },
}

fn check_len(query: &'static str, expected: usize, actual: usize) -> Result<(), KeyShapeError> {
    if expected != actual {
        return Err(KeyShapeError::QueryLength {
            query,
            expected,
            actual,
        });
    }
    Ok(())
}

impl ProvingKey {
    /// Check that every query vector matches the embedded circuit
    pub fn check_shape(&self) -> Result<(), KeyShapeError> {
        let circuit = &self.circuit;
        if !bool::from(circuit.circuit_id()[..].ct_eq(&self.circuit_id[..])) {
            return Err(KeyShapeError::CircuitIdMismatch);
        }

        let rows = required_domain_rows(circuit.num_constraints(), circuit.num_public_inputs());
        let expected_domain =
            Radix2EvaluationDomain::<Fr>::compute_size_of_domain(rows).unwrap_or(0);
        if expected_domain != self.domain_size {
            return Err(KeyShapeError::DomainSize {
                expected: expected_domain,
                actual: self.domain_size,
            });
        }

        let num_variables = circuit.num_variables();
        check_len("a_query", num_variables, self.a_query.len())?;
        check_len("b_g1_query", num_variables, self.b_g1_query.len())?;
        check_len("b_g2_query", num_variables, self.b_g2_query.len())?;
        check_len("h_query", self.domain_size.saturating_sub(1), self.h_query.len())?;
        check_len("l_query", circuit.num_private_inputs(), self.l_query.len())
    }

    /// Whether this key was generated for `circuit_id` (constant time)
    pub fn is_for_circuit(&self, circuit_id: &[u8; CIRCUIT_ID_BYTES]) -> bool {
        self.circuit_id[..].ct_eq(&circuit_id[..]).into()
    }
}

impl VerifyingKey {
    /// Check the input commitment length against the public input count
    pub fn check_shape(&self) -> Result<(), KeyShapeError> {
        // An overflowing count can never match a real vector length
        let expected = self.num_public_inputs.checked_add(1).unwrap_or(usize::MAX);
        check_len("gamma_abc_g1", expected, self.gamma_abc_g1.len())
    }

    /// Whether this key verifies `circuit_id` (constant time)
    pub fn is_for_circuit(&self, circuit_id: &[u8; CIRCUIT_ID_BYTES]) -> bool {
        self.circuit_id[..].ct_eq(&circuit_id[..]).into()
    }
}
