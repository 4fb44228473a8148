//! JSON rendering of proofs for transport as text

use crate::codec::{CURVE_BLS12_381, SCHEME_GROTH16};
use crate::{Proof, ProofEngineError, PublicInputs};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};
use zkp_r1cs::CIRCUIT_ID_BYTES;

/// Proof plus its public inputs, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofJson {
    /// Proof system name
    pub scheme: String,
    /// Curve name
    pub curve: String,
    /// Hex circuit id
    pub circuit_id: String,
    /// Hex compressed proof points
    pub proof: String,
    /// Hex canonical public input bytes
    pub public_inputs: String,
}

const SCHEME_NAME: &str = "groth16";
const CURVE_NAME: &str = "bls12-381";

/// Render a proof and its public inputs as a JSON string
pub fn proof_to_json(
    proof: &Proof,
    public_inputs: &PublicInputs,
    circuit_id: &[u8; CIRCUIT_ID_BYTES],
) -> Result<String, ProofEngineError> {
    let mut proof_bytes = Vec::with_capacity(proof.compressed_size());
    proof
        .serialize_compressed(&mut proof_bytes)
        .map_err(|e| ProofEngineError::MalformedProof(e.to_string()))?;

    let rendered = ProofJson {
        scheme: SCHEME_NAME.to_string(),
        curve: CURVE_NAME.to_string(),
        circuit_id: hex::encode(circuit_id),
        proof: hex::encode(proof_bytes),
        public_inputs: hex::encode(public_inputs.to_bytes()),
    };
    serde_json::to_string_pretty(&rendered).map_err(|e| ProofEngineError::MalformedProof(e.to_string()))
}

/// Parse a JSON proof produced by [`proof_to_json`]
pub fn proof_from_json(
    json: &str,
) -> Result<(Proof, PublicInputs, [u8; CIRCUIT_ID_BYTES]), ProofEngineError> {
    let malformed = |msg: String| ProofEngineError::MalformedProof(msg);
    let parsed: ProofJson = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

    if parsed.scheme != SCHEME_NAME || parsed.curve != CURVE_NAME {
        return Err(malformed(format!(
            "unsupported scheme {}/{} (ids {}/{})",
            parsed.scheme, parsed.curve, SCHEME_GROTH16, CURVE_BLS12_381
        )));
    }

    let id_bytes = hex::decode(&parsed.circuit_id).map_err(|e| malformed(e.to_string()))?;
    let circuit_id: [u8; CIRCUIT_ID_BYTES] = id_bytes
        .try_into()
        .map_err(|_| malformed("circuit id must be 32 bytes".to_string()))?;

    let proof_bytes = hex::decode(&parsed.proof).map_err(|e| malformed(e.to_string()))?;
    let mut reader = proof_bytes.as_slice();
    let proof = Proof::deserialize_compressed(&mut reader).map_err(|e| malformed(e.to_string()))?;
    if !reader.is_empty() {
        return Err(malformed(format!("{} trailing proof bytes", reader.len())));
    }

    let input_bytes = hex::decode(&parsed.public_inputs)
        .map_err(|e| ProofEngineError::MalformedInputs(e.to_string()))?;
    let public_inputs = PublicInputs::from_bytes(&input_bytes)?;

    Ok((proof, public_inputs, circuit_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Prover, Witness};
    use ark_bls12_381::Fr;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;
    use zkp_r1cs::circuits::MultiplyCircuit;
    use zkp_r1cs::CircuitDescriptor;
    use zkp_setup::{generate_setup, Cancellation, SetupRandomness};

    #[test]
    fn test_json_export() {
        let circuit = CircuitDescriptor::compile(&MultiplyCircuit::<Fr>::shape()).unwrap();
        let (pk, _) = generate_setup(
            Arc::new(circuit),
            SetupRandomness::UntrustedSeed([3u8; 32]),
            &Cancellation::new(),
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let public = PublicInputs::new(vec![Fr::from(12u64)]);
        let proof = Prover::prove(
            &pk,
            &Witness::new(vec![Fr::from(3u64), Fr::from(4u64)]),
            &public,
            &mut rng,
        )
        .unwrap();

        let json = proof_to_json(&proof, &public, &pk.circuit_id).unwrap();
        assert!(json.contains("\"scheme\": \"groth16\""));
        let (decoded, inputs, id) = proof_from_json(&json).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(inputs, public);
        assert_eq!(id, pk.circuit_id);

        let tampered = json.replace("groth16", "plonk");
        assert!(matches!(
            proof_from_json(&tampered),
            Err(ProofEngineError::MalformedProof(_))
        ));
        assert!(proof_from_json("{not json").is_err());
    }
}
