//! Witness and public input containers

use crate::ProofEngineError;
use ark_bls12_381::Fr;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};
use zkp_field::{from_canonical_bytes, to_canonical_bytes, ELEMENT_BYTES};
use zkp_r1cs::{Circuit, CircuitDescriptor};

/// Private values of an assignment, in allocation order.
///
/// `Debug` never prints the values and they are overwritten with zero when
/// the witness is dropped.
pub struct Witness {
    values: Vec<Fr>,
}

impl Witness {
    /// Wrap private values
    pub fn new(values: Vec<Fr>) -> Self {
        Self { values }
    }

    /// Number of private values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the witness is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn values(&self) -> &[Fr] {
        &self.values
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("len", &self.values.len())
            .field("values", &"<redacted>")
            .finish()
    }
}

impl Zeroize for Witness {
    fn zeroize(&mut self) {
        self.values.zeroize();
    }
}

impl Drop for Witness {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for Witness {}

/// Ordered public inputs with a canonical byte form.
///
/// Bytes: u64 little-endian count, then one 32-byte little-endian canonical
/// element per input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicInputs {
    values: Vec<Fr>,
}

impl PublicInputs {
    /// Wrap public input values
    pub fn new(values: Vec<Fr>) -> Self {
        Self { values }
    }

    /// Values in order
    pub fn values(&self) -> &[Fr] {
        &self.values
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no inputs
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Canonical encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; 8];
        LittleEndian::write_u64(&mut bytes, self.values.len() as u64);
        for value in &self.values {
            bytes.extend_from_slice(&to_canonical_bytes(value));
        }
        bytes
    }

    /// Strict decoding: exact length, canonical elements only
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofEngineError> {
        if bytes.len() < 8 {
            return Err(ProofEngineError::MalformedInputs(
                "missing input count".to_string(),
            ));
        }
        let (header, body) = bytes.split_at(8);
        let count = LittleEndian::read_u64(header);
        let expected = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(ELEMENT_BYTES))
            .ok_or_else(|| ProofEngineError::MalformedInputs(format!("count {count} too large")))?;
        if body.len() != expected {
            return Err(ProofEngineError::MalformedInputs(format!(
                "{count} inputs need {expected} bytes, got {}",
                body.len()
            )));
        }

        let values = body
            .chunks(ELEMENT_BYTES)
            .enumerate()
            .map(|(i, chunk)| {
                from_canonical_bytes(chunk)
                    .map_err(|e| ProofEngineError::MalformedInputs(format!("input {i}: {e}")))
            })
            .collect::<Result<Vec<Fr>, _>>()?;
        Ok(Self { values })
    }
}

impl From<Vec<Fr>> for PublicInputs {
    fn from(values: Vec<Fr>) -> Self {
        Self::new(values)
    }
}

/// Run `circuit` in assignment mode against `descriptor`
pub fn assign<C: Circuit<Fr> + ?Sized>(
    descriptor: &CircuitDescriptor<Fr>,
    circuit: &C,
) -> Result<(Witness, PublicInputs), ProofEngineError> {
    let assignment = descriptor
        .assign(circuit)
        .map_err(|e| ProofEngineError::WitnessInvalid(e.to_string()))?;
    Ok((
        Witness::new(assignment.private_inputs),
        PublicInputs::new(assignment.public_inputs),
    ))
}
