//! Versioned binary envelope for keys, proofs, public inputs and circuits.
//!
//! Layout (little-endian):
//!
//! | field        | size |
//! |--------------|------|
//! | magic `ZKPE` | 4    |
//! | version      | 2    |
//! | scheme id    | 1    |
//! | curve id     | 1    |
//! | artifact     | 1    |
//! | circuit id   | 32   |
//! | payload len  | 8    |
//! | payload      | len  |
//!
//! Group elements inside payloads use arkworks compressed encoding and are
//! checked for curve and subgroup membership when decoded.

use crate::{Proof, ProofEngineError, PublicInputs};
use ark_bls12_381::{Fr, G1Affine, G2Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::sync::Arc;
use zkp_r1cs::{CircuitDescriptor, R1CSError, CIRCUIT_ID_BYTES};
use zkp_setup::{ProvingKey, VerifyingKey};

/// Envelope magic
pub const MAGIC: [u8; 4] = *b"ZKPE";
/// Current envelope format version
pub const FORMAT_VERSION: u16 = 1;
/// Scheme id for Groth16
pub const SCHEME_GROTH16: u8 = 1;
/// Curve id for BLS12-381
pub const CURVE_BLS12_381: u8 = 1;
/// Size of the fixed envelope header
pub const HEADER_BYTES: usize = 4 + 2 + 1 + 1 + 1 + CIRCUIT_ID_BYTES + 8;

/// What an envelope carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    /// Groth16 proving key
    ProvingKey = 1,
    /// Groth16 verifying key
    VerifyingKey = 2,
    /// Groth16 proof
    Proof = 3,
    /// Public input vector
    PublicInputs = 4,
    /// Circuit descriptor
    Circuit = 5,
}

impl TryFrom<u8> for ArtifactKind {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ArtifactKind::ProvingKey),
            2 => Ok(ArtifactKind::VerifyingKey),
            3 => Ok(ArtifactKind::Proof),
            4 => Ok(ArtifactKind::PublicInputs),
            5 => Ok(ArtifactKind::Circuit),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

/// Envelope-level decoding failures
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Reading from the buffer failed (usually truncation)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrong magic bytes
    #[error("Not a zkp artifact (bad magic)")]
    BadMagic,

    /// Unknown format version
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// Unknown proof scheme
    #[error("Unsupported scheme id {0}")]
    UnsupportedScheme(u8),

    /// Unknown curve
    #[error("Unsupported curve id {0}")]
    UnsupportedCurve(u8),

    /// Unknown artifact kind
    #[error("Unknown artifact kind {0}")]
    UnknownKind(u8),

    /// Artifact is of a different kind than requested
    #[error("Expected {expected:?} artifact, found {actual:?}")]
    WrongKind {
        /// Requested kind
        expected: ArtifactKind,
        /// Kind in the header
        actual: ArtifactKind,
    },

    /// Declared payload length disagrees with the buffer
    #[error("Payload length {declared} does not match the {actual} bytes present")]
    LengthMismatch {
        /// Length in the header
        declared: u64,
        /// Bytes after the header
        actual: usize,
    },

    /// Bytes left over after the payload was decoded
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// Header circuit id disagrees with the payload or the expected circuit
    #[error("Artifact belongs to a different circuit")]
    CircuitIdMismatch,

    /// Point or field element decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Embedded circuit failed to decode
    #[error("Circuit error: {0}")]
    Circuit(#[from] R1CSError),

    /// Payload decoded but is internally inconsistent
    #[error("Inconsistent payload: {0}")]
    Inconsistent(String),
}

/// Decoded envelope header plus raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Circuit the artifact belongs to
    pub circuit_id: [u8; CIRCUIT_ID_BYTES],
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Serialize header and payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_BYTES + self.payload.len());
        // Writing into a Vec cannot fail
        let _ = self.write(&mut bytes);
        bytes
    }

    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u8(SCHEME_GROTH16)?;
        writer.write_u8(CURVE_BLS12_381)?;
        writer.write_u8(self.kind as u8)?;
        writer.write_all(&self.circuit_id)?;
        writer.write_u64::<LittleEndian>(self.payload.len() as u64)?;
        writer.write_all(&self.payload)
    }

    /// Parse and check every header field
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = bytes;

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = reader.read_u16::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let scheme = reader.read_u8()?;
        if scheme != SCHEME_GROTH16 {
            return Err(CodecError::UnsupportedScheme(scheme));
        }
        let curve = reader.read_u8()?;
        if curve != CURVE_BLS12_381 {
            return Err(CodecError::UnsupportedCurve(curve));
        }
        let kind = ArtifactKind::try_from(reader.read_u8()?)?;
        let mut circuit_id = [0u8; CIRCUIT_ID_BYTES];
        reader.read_exact(&mut circuit_id)?;

        let declared = reader.read_u64::<LittleEndian>()?;
        if declared != reader.len() as u64 {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: reader.len(),
            });
        }

        Ok(Self {
            kind,
            circuit_id,
            payload: reader.to_vec(),
        })
    }

    /// Parse and require a specific artifact kind
    pub fn from_bytes_expecting(bytes: &[u8], expected: ArtifactKind) -> Result<Self, CodecError> {
        let envelope = Self::from_bytes(bytes)?;
        if envelope.kind != expected {
            return Err(CodecError::WrongKind {
                expected,
                actual: envelope.kind,
            });
        }
        Ok(envelope)
    }
}

fn finish(reader: &[u8]) -> Result<(), CodecError> {
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes(reader.len()));
    }
    Ok(())
}

fn write_g1_vec(points: &[G1Affine], out: &mut Vec<u8>) -> Result<(), SerializationError> {
    (points.len() as u64).serialize_compressed(&mut *out)?;
    for point in points {
        point.serialize_compressed(&mut *out)?;
    }
    Ok(())
}

fn write_g2_vec(points: &[G2Affine], out: &mut Vec<u8>) -> Result<(), SerializationError> {
    (points.len() as u64).serialize_compressed(&mut *out)?;
    for point in points {
        point.serialize_compressed(&mut *out)?;
    }
    Ok(())
}

fn read_vec<T: CanonicalDeserialize>(reader: &mut &[u8]) -> Result<Vec<T>, CodecError> {
    let len = u64::deserialize_compressed(&mut *reader)?;
    let mut points = Vec::new();
    for _ in 0..len {
        points.push(T::deserialize_compressed(&mut *reader)?);
    }
    Ok(points)
}

fn proving_key_payload(pk: &ProvingKey) -> Result<Vec<u8>, SerializationError> {
    let mut out = Vec::new();
    let circuit = pk.circuit.to_bytes();
    (circuit.len() as u64).serialize_compressed(&mut out)?;
    out.extend_from_slice(&circuit);
    (pk.domain_size as u64).serialize_compressed(&mut out)?;
    pk.alpha_g1.serialize_compressed(&mut out)?;
    pk.beta_g1.serialize_compressed(&mut out)?;
    pk.beta_g2.serialize_compressed(&mut out)?;
    pk.delta_g1.serialize_compressed(&mut out)?;
    pk.delta_g2.serialize_compressed(&mut out)?;
    write_g1_vec(&pk.a_query, &mut out)?;
    write_g1_vec(&pk.b_g1_query, &mut out)?;
    write_g2_vec(&pk.b_g2_query, &mut out)?;
    write_g1_vec(&pk.h_query, &mut out)?;
    write_g1_vec(&pk.l_query, &mut out)?;
    Ok(out)
}

fn verifying_key_payload(vk: &VerifyingKey) -> Result<Vec<u8>, SerializationError> {
    let mut out = Vec::new();
    (vk.num_public_inputs as u64).serialize_compressed(&mut out)?;
    vk.alpha_g1.serialize_compressed(&mut out)?;
    vk.beta_g2.serialize_compressed(&mut out)?;
    vk.gamma_g2.serialize_compressed(&mut out)?;
    vk.delta_g2.serialize_compressed(&mut out)?;
    write_g1_vec(&vk.gamma_abc_g1, &mut out)?;
    Ok(out)
}

fn to_usize(value: u64) -> Result<usize, CodecError> {
    usize::try_from(value).map_err(|_| CodecError::Inconsistent(format!("{value} overflows usize")))
}

/// Encode a proving key, embedding its circuit
pub fn encode_proving_key(pk: &ProvingKey) -> Result<Vec<u8>, ProofEngineError> {
    let payload =
        proving_key_payload(pk).map_err(|e| ProofEngineError::MalformedKey(e.to_string()))?;
    Ok(Envelope {
        kind: ArtifactKind::ProvingKey,
        circuit_id: pk.circuit_id,
        payload,
    }
    .to_bytes())
}

fn decode_proving_key_inner(bytes: &[u8]) -> Result<ProvingKey, CodecError> {
    let envelope = Envelope::from_bytes_expecting(bytes, ArtifactKind::ProvingKey)?;
    let mut reader = envelope.payload.as_slice();

    let circuit_len = to_usize(u64::deserialize_compressed(&mut reader)?)?;
    if circuit_len > reader.len() {
        return Err(CodecError::Inconsistent("circuit length exceeds payload".to_string()));
    }
    let (circuit_bytes, rest) = reader.split_at(circuit_len);
    let circuit = CircuitDescriptor::<Fr>::from_bytes(circuit_bytes)?;
    reader = rest;
    if circuit.circuit_id() != envelope.circuit_id {
        return Err(CodecError::CircuitIdMismatch);
    }

    let domain_size = to_usize(u64::deserialize_compressed(&mut reader)?)?;
    let pk = ProvingKey {
        circuit: Arc::new(circuit),
        circuit_id: envelope.circuit_id,
        domain_size,
        alpha_g1: G1Affine::deserialize_compressed(&mut reader)?,
        beta_g1: G1Affine::deserialize_compressed(&mut reader)?,
        beta_g2: G2Affine::deserialize_compressed(&mut reader)?,
        delta_g1: G1Affine::deserialize_compressed(&mut reader)?,
        delta_g2: G2Affine::deserialize_compressed(&mut reader)?,
        a_query: read_vec(&mut reader)?,
        b_g1_query: read_vec(&mut reader)?,
        b_g2_query: read_vec(&mut reader)?,
        h_query: read_vec(&mut reader)?,
        l_query: read_vec(&mut reader)?,
    };
    finish(reader)?;
    pk.check_shape()
        .map_err(|e| CodecError::Inconsistent(e.to_string()))?;
    Ok(pk)
}

/// Decode a proving key; any failure is [`ProofEngineError::MalformedKey`]
pub fn decode_proving_key(bytes: &[u8]) -> Result<ProvingKey, ProofEngineError> {
    decode_proving_key_inner(bytes).map_err(|e| ProofEngineError::MalformedKey(e.to_string()))
}

/// Encode a verifying key
pub fn encode_verifying_key(vk: &VerifyingKey) -> Result<Vec<u8>, ProofEngineError> {
    let payload =
        verifying_key_payload(vk).map_err(|e| ProofEngineError::MalformedKey(e.to_string()))?;
    Ok(Envelope {
        kind: ArtifactKind::VerifyingKey,
        circuit_id: vk.circuit_id,
        payload,
    }
    .to_bytes())
}

fn decode_verifying_key_inner(bytes: &[u8]) -> Result<VerifyingKey, CodecError> {
    let envelope = Envelope::from_bytes_expecting(bytes, ArtifactKind::VerifyingKey)?;
    let mut reader = envelope.payload.as_slice();

    let vk = VerifyingKey {
        circuit_id: envelope.circuit_id,
        num_public_inputs: to_usize(u64::deserialize_compressed(&mut reader)?)?,
        alpha_g1: G1Affine::deserialize_compressed(&mut reader)?,
        beta_g2: G2Affine::deserialize_compressed(&mut reader)?,
        gamma_g2: G2Affine::deserialize_compressed(&mut reader)?,
        delta_g2: G2Affine::deserialize_compressed(&mut reader)?,
        gamma_abc_g1: read_vec(&mut reader)?,
    };
    finish(reader)?;
    vk.check_shape()
        .map_err(|e| CodecError::Inconsistent(e.to_string()))?;
    Ok(vk)
}

/// Decode a verifying key; any failure is [`ProofEngineError::MalformedKey`]
pub fn decode_verifying_key(bytes: &[u8]) -> Result<VerifyingKey, ProofEngineError> {
    decode_verifying_key_inner(bytes).map_err(|e| ProofEngineError::MalformedKey(e.to_string()))
}

/// Encode a proof bound to `circuit_id`
pub fn encode_proof(proof: &Proof, circuit_id: &[u8; CIRCUIT_ID_BYTES]) -> Result<Vec<u8>, ProofEngineError> {
    let mut payload = Vec::with_capacity(proof.compressed_size());
    proof
        .serialize_compressed(&mut payload)
        .map_err(|e| ProofEngineError::MalformedProof(e.to_string()))?;
    Ok(Envelope {
        kind: ArtifactKind::Proof,
        circuit_id: *circuit_id,
        payload,
    }
    .to_bytes())
}

fn decode_proof_inner(bytes: &[u8], vk: &VerifyingKey) -> Result<Proof, CodecError> {
    let envelope = Envelope::from_bytes_expecting(bytes, ArtifactKind::Proof)?;
    if !vk.is_for_circuit(&envelope.circuit_id) {
        return Err(CodecError::CircuitIdMismatch);
    }
    let mut reader = envelope.payload.as_slice();
    let proof = Proof::deserialize_compressed(&mut reader)?;
    finish(reader)?;
    Ok(proof)
}

/// Decode a proof for `vk`.
///
/// A proof produced for a different circuit is rejected as
/// [`ProofEngineError::MalformedProof`].
pub fn decode_proof(bytes: &[u8], vk: &VerifyingKey) -> Result<Proof, ProofEngineError> {
    decode_proof_inner(bytes, vk).map_err(|e| ProofEngineError::MalformedProof(e.to_string()))
}

/// Encode public inputs bound to `circuit_id`
pub fn encode_public_inputs(inputs: &PublicInputs, circuit_id: &[u8; CIRCUIT_ID_BYTES]) -> Vec<u8> {
    Envelope {
        kind: ArtifactKind::PublicInputs,
        circuit_id: *circuit_id,
        payload: inputs.to_bytes(),
    }
    .to_bytes()
}

/// Decode public inputs; returns them with the circuit id they were bound to
pub fn decode_public_inputs(bytes: &[u8]) -> Result<(PublicInputs, [u8; CIRCUIT_ID_BYTES]), ProofEngineError> {
    let envelope = Envelope::from_bytes_expecting(bytes, ArtifactKind::PublicInputs)
        .map_err(|e| ProofEngineError::MalformedInputs(e.to_string()))?;
    let inputs = PublicInputs::from_bytes(&envelope.payload)?;
    Ok((inputs, envelope.circuit_id))
}

/// Encode a circuit descriptor
pub fn encode_circuit(circuit: &CircuitDescriptor<Fr>) -> Vec<u8> {
    Envelope {
        kind: ArtifactKind::Circuit,
        circuit_id: circuit.circuit_id(),
        payload: circuit.to_bytes(),
    }
    .to_bytes()
}

/// Decode a circuit descriptor; any failure is [`ProofEngineError::InvalidCircuit`]
pub fn decode_circuit(bytes: &[u8]) -> Result<CircuitDescriptor<Fr>, ProofEngineError> {
    let decode = || -> Result<CircuitDescriptor<Fr>, CodecError> {
        let envelope = Envelope::from_bytes_expecting(bytes, ArtifactKind::Circuit)?;
        let circuit = CircuitDescriptor::from_bytes(&envelope.payload)?;
        if circuit.circuit_id() != envelope.circuit_id {
            return Err(CodecError::CircuitIdMismatch);
        }
        Ok(circuit)
    };
    decode().map_err(|e| ProofEngineError::InvalidCircuit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Prover, Witness};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use zkp_r1cs::circuits::{MultiplyCircuit, PreimageCircuit};
    use zkp_setup::{generate_setup, Cancellation, SetupRandomness};

    fn keys() -> (ProvingKey, VerifyingKey) {
        let circuit = CircuitDescriptor::compile(&MultiplyCircuit::<Fr>::shape()).unwrap();
        generate_setup(
            Arc::new(circuit),
            SetupRandomness::UntrustedSeed([21u8; 32]),
            &Cancellation::new(),
        )
        .unwrap()
    }

    fn proof(pk: &ProvingKey) -> Proof {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let witness = Witness::new(vec![Fr::from(2u64), Fr::from(9u64)]);
        let public = PublicInputs::new(vec![Fr::from(18u64)]);
        Prover::prove(pk, &witness, &public, &mut rng).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let (_, vk) = keys();
        let bytes = encode_verifying_key(&vk).unwrap();
        assert_eq!(&bytes[..4], b"ZKPE");
        assert_eq!(&bytes[4..6], &1u16.to_le_bytes());
        assert_eq!(bytes[6], SCHEME_GROTH16);
        assert_eq!(bytes[7], CURVE_BLS12_381);
        assert_eq!(bytes[8], ArtifactKind::VerifyingKey as u8);
        assert_eq!(&bytes[9..41], &vk.circuit_id);
        let declared = u64::from_le_bytes(bytes[41..49].try_into().unwrap());
        assert_eq!(declared as usize, bytes.len() - HEADER_BYTES);
    }

    #[test]
    fn test_keys_survive_encoding() {
        let (pk, vk) = keys();
        let decoded_pk = decode_proving_key(&encode_proving_key(&pk).unwrap()).unwrap();
        let decoded_vk = decode_verifying_key(&encode_verifying_key(&vk).unwrap()).unwrap();
        assert_eq!(decoded_pk, pk);
        assert_eq!(decoded_vk, vk);
    }

    #[test]
    fn test_header_checks() {
        let (_, vk) = keys();
        let good = encode_verifying_key(&vk).unwrap();

        let mut bad_magic = good.clone();
        bad_magic[0] = b'X';
        assert!(matches!(Envelope::from_bytes(&bad_magic), Err(CodecError::BadMagic)));

        let mut bad_version = good.clone();
        bad_version[4] = 2;
        assert!(matches!(
            Envelope::from_bytes(&bad_version),
            Err(CodecError::UnsupportedVersion(2))
        ));

        let mut bad_curve = good.clone();
        bad_curve[7] = 9;
        assert!(matches!(
            Envelope::from_bytes(&bad_curve),
            Err(CodecError::UnsupportedCurve(9))
        ));

        let mut trailing = good.clone();
        trailing.push(0);
        assert!(matches!(
            Envelope::from_bytes(&trailing),
            Err(CodecError::LengthMismatch { .. })
        ));

        assert!(matches!(
            Envelope::from_bytes(&good[..20]),
            Err(CodecError::Io(_))
        ));

        assert!(matches!(
            decode_proving_key(&good),
            Err(ProofEngineError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_crafted_counts_are_rejected() {
        let (pk, vk) = keys();

        // Circuit header inside the proving key payload, after its length prefix
        let counts = HEADER_BYTES + 8;
        let mut huge_public = encode_proving_key(&pk).unwrap();
        huge_public[counts..counts + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            decode_proving_key(&huge_public),
            Err(ProofEngineError::MalformedKey(_))
        ));

        let mut huge_variables = encode_proving_key(&pk).unwrap();
        huge_variables[counts + 8..counts + 16].copy_from_slice(&(1u64 << 62).to_le_bytes());
        assert!(matches!(
            decode_proving_key(&huge_variables),
            Err(ProofEngineError::MalformedKey(_))
        ));

        let mut circuit = encode_circuit(&pk.circuit);
        circuit[HEADER_BYTES + 8..HEADER_BYTES + 16].copy_from_slice(&(1u64 << 62).to_le_bytes());
        assert!(matches!(
            decode_circuit(&circuit),
            Err(ProofEngineError::InvalidCircuit(_))
        ));

        let mut vk_bytes = encode_verifying_key(&vk).unwrap();
        vk_bytes[HEADER_BYTES..HEADER_BYTES + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            decode_verifying_key(&vk_bytes),
            Err(ProofEngineError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_proof_is_bound_to_circuit() {
        let (pk, vk) = keys();
        let proof = proof(&pk);
        let bytes = encode_proof(&proof, &pk.circuit_id).unwrap();
        assert_eq!(decode_proof(&bytes, &vk).unwrap(), proof);

        let other = CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(4)).unwrap();
        let (_, other_vk) = generate_setup(
            Arc::new(other),
            SetupRandomness::UntrustedSeed([22u8; 32]),
            &Cancellation::new(),
        )
        .unwrap();
        assert!(matches!(
            decode_proof(&bytes, &other_vk),
            Err(ProofEngineError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_corrupted_proof_point() {
        let (pk, vk) = keys();
        let mut bytes = encode_proof(&proof(&pk), &pk.circuit_id).unwrap();
        // Flip bits inside the compressed x-coordinate of A
        bytes[HEADER_BYTES + 3] ^= 0xff;
        bytes[HEADER_BYTES + 4] ^= 0xff;
        bytes[HEADER_BYTES + 5] ^= 0xff;
        match decode_proof(&bytes, &vk) {
            Err(ProofEngineError::MalformedProof(_)) => {}
            Ok(decoded) => {
                let public = PublicInputs::new(vec![Fr::from(18u64)]);
                assert!(!crate::Verifier::verify(&vk, &decoded, &public).unwrap());
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_public_inputs_and_circuit_envelopes() {
        let circuit = CircuitDescriptor::compile(&MultiplyCircuit::<Fr>::shape()).unwrap();
        let inputs = PublicInputs::new(vec![Fr::from(18u64)]);
        let bytes = encode_public_inputs(&inputs, &circuit.circuit_id());
        let (decoded, id) = decode_public_inputs(&bytes).unwrap();
        assert_eq!(decoded, inputs);
        assert_eq!(id, circuit.circuit_id());

        let encoded = encode_circuit(&circuit);
        assert_eq!(decode_circuit(&encoded).unwrap(), circuit);
        assert!(matches!(
            decode_circuit(&bytes),
            Err(ProofEngineError::InvalidCircuit(_))
        ));
    }
}
