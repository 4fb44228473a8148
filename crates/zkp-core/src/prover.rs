//! Groth16 prover

use crate::{Proof, ProofEngineError, PublicInputs, Witness};
use ark_bls12_381::{Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{CurveGroup, VariableBaseMSM};
use ark_std::UniformRand;
use rand::{CryptoRng, RngCore};
use std::time::Instant;
use zeroize::Zeroizing;
use zkp_qap::QAP;
use zkp_setup::{short_id, Cancellation, ProvingKey};

/// Groth16 prover
pub struct Prover;

impl Prover {
    /// Generate a proof that `witness` and `public_inputs` satisfy the key's circuit
    pub fn prove<R: RngCore + CryptoRng + ?Sized>(
        pk: &ProvingKey,
        witness: &Witness,
        public_inputs: &PublicInputs,
        rng: &mut R,
    ) -> Result<Proof, ProofEngineError> {
        Self::prove_with_cancellation(pk, witness, public_inputs, rng, &Cancellation::new())
    }

    /// [`Prover::prove`] with a cancellation token polled between phases
    pub fn prove_with_cancellation<R: RngCore + CryptoRng + ?Sized>(
        pk: &ProvingKey,
        witness: &Witness,
        public_inputs: &PublicInputs,
        rng: &mut R,
        cancel: &Cancellation,
    ) -> Result<Proof, ProofEngineError> {
        let span = tracing::debug_span!("prove", circuit = %short_id(&pk.circuit_id));
        let _guard = span.enter();
        let started = Instant::now();

        pk.check_shape()
            .map_err(|e| ProofEngineError::KeyMismatch(e.to_string()))?;
        let circuit = &pk.circuit;

        if public_inputs.len() != circuit.num_public_inputs() {
            return Err(ProofEngineError::MalformedInputs(format!(
                "expected {} public inputs, got {}",
                circuit.num_public_inputs(),
                public_inputs.len()
            )));
        }
        if witness.len() != circuit.num_private_inputs() {
            return Err(ProofEngineError::WitnessInvalid(format!(
                "expected {} private values, got {}",
                circuit.num_private_inputs(),
                witness.len()
            )));
        }

        let assignment = Zeroizing::new(
            circuit.full_assignment(public_inputs.values(), witness.values())?,
        );
        circuit
            .is_satisfied(&assignment)
            .map_err(|e| ProofEngineError::WitnessInvalid(e.to_string()))?;
        cancel.checkpoint("quotient")?;

        let qap = QAP::from_descriptor(circuit)
            .map_err(|e| ProofEngineError::KeyMismatch(e.to_string()))?;
        let h = Zeroizing::new(
            qap.compute_quotient(circuit, &assignment)
                .map_err(|e| ProofEngineError::WitnessInvalid(e.to_string()))?,
        );
        cancel.checkpoint("multi-scalar multiplication")?;

        let r = Zeroizing::new(Fr::rand(rng));
        let s = Zeroizing::new(Fr::rand(rng));
        let private = &assignment[1 + circuit.num_public_inputs()..];

        let a = G1Projective::from(pk.alpha_g1) + msm_g1(&pk.a_query, &assignment)? + pk.delta_g1 * *r;
        let b_g2 = G2Projective::from(pk.beta_g2) + msm_g2(&pk.b_g2_query, &assignment)? + pk.delta_g2 * *s;
        let b_g1 = G1Projective::from(pk.beta_g1) + msm_g1(&pk.b_g1_query, &assignment)? + pk.delta_g1 * *s;
        cancel.checkpoint("c assembly")?;

        let c = msm_g1(&pk.l_query, private)? + msm_g1(&pk.h_query, &h)? + a * *s + b_g1 * *r
            - pk.delta_g1 * (*r * *s);

        let affine = G1Projective::normalize_batch(&[a, c]);
        let proof = Proof {
            a: affine[0],
            b: b_g2.into_affine(),
            c: affine[1],
        };

        tracing::debug!(
            constraints = circuit.num_constraints(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proof generated"
        );
        Ok(proof)
    }
}

/// Variable-base MSM over every scalar, zero or not
pub(crate) fn msm_g1(bases: &[G1Affine], scalars: &[Fr]) -> Result<G1Projective, ProofEngineError> {
    G1Projective::msm(bases, scalars).map_err(|len| {
        ProofEngineError::KeyMismatch(format!(
            "G1 query of {} points against {} scalars (msm stopped at {len})",
            bases.len(),
            scalars.len()
        ))
    })
}

fn msm_g2(bases: &[G2Affine], scalars: &[Fr]) -> Result<G2Projective, ProofEngineError> {
    G2Projective::msm(bases, scalars).map_err(|len| {
        ProofEngineError::KeyMismatch(format!(
            "G2 query of {} points against {} scalars (msm stopped at {len})",
            bases.len(),
            scalars.len()
        ))
    })
}
