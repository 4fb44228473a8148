//! Field operations and encodings for the zkp proof engine.
//!
//! This crate fixes the arithmetic foundation of the engine: the BLS12-381
//! scalar field, the `FieldLike` trait the constraint system is generic over,
//! and the canonical byte encoding used for public inputs and circuit
//! descriptors.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use ark_std::UniformRand;
use std::fmt::{Debug, Display};

pub mod encoding;

pub use ark_bls12_381::Fr;
pub use encoding::{
    from_canonical_bytes, num_packed_elements, pack_bytes, to_canonical_bytes, ELEMENT_BYTES,
    PACKED_CHUNK_BYTES,
};

/// Alias for the default field used by the engine: BLS12-381 scalar field
pub type F = Fr;

/// Trait representing the field operations the constraint system needs.
///
/// Anything implementing `FieldLike` can be serialized canonically and
/// shared across threads, which the engine relies on when keys and
/// descriptors are handed to concurrent provers.
pub trait FieldLike:
    PrimeField + CanonicalSerialize + CanonicalDeserialize + Debug + Display + Send + Sync + 'static
{
    /// Generate a random field element
    fn random<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        <Self as UniformRand>::rand(rng)
    }

    /// Convert from a u64 value
    fn from_u64(val: u64) -> Self {
        Self::from(val)
    }
}

impl FieldLike for Fr {}

/// Errors that can occur in field operations
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// Dimension mismatch in vector operations
    #[error("Dimension mismatch: left has {left} elements, right has {right} elements")]
    DimensionMismatch {
        /// Number of elements in left vector
        left: usize,
        /// Number of elements in right vector
        right: usize,
    },

    /// Encoded element has the wrong byte length
    #[error("Invalid element length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected encoding length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Encoded element is not the canonical representative (>= modulus)
    #[error("Non-canonical field element encoding")]
    NonCanonical,

    /// Underlying arkworks serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}
