//! Canonical byte encodings for field elements.
//!
//! Elements are written as their little-endian canonical representative.
//! Decoding is strict: the byte length must match exactly and the value must
//! be below the modulus, so two distinct byte strings never decode to the
//! same element.

use crate::{FieldError, FieldLike};
use ark_ff::{PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

/// Encoded size of one BLS12-381 scalar field element
pub const ELEMENT_BYTES: usize = 32;

/// Number of message bytes packed into one field element.
///
/// 31 bytes stay below the 255-bit modulus, so packing is injective.
pub const PACKED_CHUNK_BYTES: usize = 31;

/// Encode a field element as canonical little-endian bytes
pub fn to_canonical_bytes<F: FieldLike>(value: &F) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    // Writing into a Vec cannot fail
    let _ = value.serialize_compressed(&mut bytes);
    bytes
}

/// Decode a field element from its canonical little-endian bytes
pub fn from_canonical_bytes<F: FieldLike>(bytes: &[u8]) -> Result<F, FieldError> {
    let expected = F::zero().compressed_size();
    if bytes.len() != expected {
        return Err(FieldError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }

    F::deserialize_compressed(bytes).map_err(|_| FieldError::NonCanonical)
}

/// Number of field elements needed to pack `len` message bytes
pub fn num_packed_elements(len: usize) -> usize {
    (len + PACKED_CHUNK_BYTES - 1) / PACKED_CHUNK_BYTES
}

/// Pack arbitrary bytes into field elements, 31 bytes per element.
///
/// The final chunk is interpreted as-is (implicitly zero-padded in the high
/// bytes); callers that need length binding must fix the message length in
/// the circuit shape.
pub fn pack_bytes<F: PrimeField>(bytes: &[u8]) -> Vec<F> {
    bytes
        .chunks(PACKED_CHUNK_BYTES)
        .map(F::from_le_bytes_mod_order)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::F;
    use ark_ff::{BigInteger, PrimeField};
    use proptest::prelude::*;

    #[test]
    fn test_known_encoding() {
        let bytes = to_canonical_bytes(&F::from(258u64));
        assert_eq!(bytes.len(), ELEMENT_BYTES);
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 1);
        assert!(bytes[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = from_canonical_bytes::<F>(&[0u8; 31]).unwrap_err();
        assert!(matches!(err, FieldError::InvalidLength { expected: 32, actual: 31 }));
    }

    #[test]
    fn test_rejects_modulus() {
        let modulus = F::MODULUS.to_bytes_le();
        let err = from_canonical_bytes::<F>(&modulus).unwrap_err();
        assert!(matches!(err, FieldError::NonCanonical));
    }

    #[test]
    fn test_pack_bytes_chunking() {
        let message = vec![0xabu8; 70];
        let packed = pack_bytes::<F>(&message);
        assert_eq!(packed.len(), 3);
        assert_eq!(num_packed_elements(70), 3);
        assert_eq!(num_packed_elements(62), 2);
        assert_eq!(num_packed_elements(0), 0);
        // Last chunk holds the remaining 8 bytes
        assert_eq!(packed[2], F::from_le_bytes_mod_order(&[0xab; 8]));
    }

    proptest! {
        #[test]
        fn prop_canonical_bytes_decode(value in any::<u64>(), shift in 0u32..4) {
            let mut element = F::from(value);
            for _ in 0..shift {
                element = element * element + F::from(7u64);
            }
            let bytes = to_canonical_bytes(&element);
            prop_assert_eq!(from_canonical_bytes::<F>(&bytes).unwrap(), element);
        }

        #[test]
        fn prop_packing_is_injective(a in proptest::collection::vec(any::<u8>(), 31), b in proptest::collection::vec(any::<u8>(), 31)) {
            let pa = pack_bytes::<F>(&a);
            let pb = pack_bytes::<F>(&b);
            prop_assert_eq!(pa == pb, a == b);
        }
    }
}
