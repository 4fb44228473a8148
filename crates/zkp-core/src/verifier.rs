//! Groth16 verifier and batch verification

use crate::prover::msm_g1;
use crate::{Proof, ProofEngineError, PublicInputs};
use ark_bls12_381::{Bls12_381, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ec::CurveGroup;
use ark_ff::Zero;
use ark_std::UniformRand;
use rand::{CryptoRng, RngCore};
use zkp_setup::{short_id, VerifyingKey};

type G2Prepared = <Bls12_381 as Pairing>::G2Prepared;

/// Verifying key with the fixed pairing terms precomputed
#[derive(Debug, Clone)]
pub struct PreparedVerifyingKey {
    /// The underlying verifying key
    pub vk: VerifyingKey,
    alpha_g1_beta_g2: PairingOutput<Bls12_381>,
    gamma_g2_neg: G2Prepared,
    delta_g2_neg: G2Prepared,
}

impl PreparedVerifyingKey {
    /// Precompute `e(α, β)` and the negated `γ`, `δ`
    pub fn new(vk: VerifyingKey) -> Result<Self, ProofEngineError> {
        vk.check_shape()
            .map_err(|e| ProofEngineError::MalformedKey(e.to_string()))?;
        let alpha_g1_beta_g2 = Bls12_381::pairing(vk.alpha_g1, vk.beta_g2);
        let gamma_g2_neg = G2Prepared::from(-vk.gamma_g2);
        let delta_g2_neg = G2Prepared::from(-vk.delta_g2);
        Ok(Self {
            vk,
            alpha_g1_beta_g2,
            gamma_g2_neg,
            delta_g2_neg,
        })
    }
}

/// Groth16 verifier
pub struct Verifier;

impl Verifier {
    /// Check `e(A, B) = e(α, β) · e(IC, γ) · e(C, δ)`.
    ///
    /// Returns `Ok(false)` for a well-formed proof that does not verify and an
    /// error only for inputs that cannot be checked at all.
    pub fn verify(
        vk: &VerifyingKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProofEngineError> {
        vk.check_shape()
            .map_err(|e| ProofEngineError::MalformedKey(e.to_string()))?;
        check_inputs(vk, public_inputs)?;
        check_proof_points(proof)?;

        let ic = input_commitment(vk, public_inputs)?;
        let result = Bls12_381::multi_pairing(
            [proof.a, -vk.alpha_g1, -ic.into_affine(), -proof.c],
            [proof.b, vk.beta_g2, vk.gamma_g2, vk.delta_g2],
        );

        let valid = result.is_zero();
        tracing::debug!(circuit = %short_id(&vk.circuit_id), valid, "proof verified");
        Ok(valid)
    }

    /// [`Verifier::verify`] against a prepared key
    pub fn verify_prepared(
        pvk: &PreparedVerifyingKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProofEngineError> {
        check_inputs(&pvk.vk, public_inputs)?;
        check_proof_points(proof)?;

        let ic = input_commitment(&pvk.vk, public_inputs)?.into_affine();
        let g1: [G1Affine; 3] = [proof.a, ic, proof.c];
        let g2: [G2Prepared; 3] = [
            proof.b.into(),
            pvk.gamma_g2_neg.clone(),
            pvk.delta_g2_neg.clone(),
        ];
        Ok(Bls12_381::multi_pairing(g1, g2) == pvk.alpha_g1_beta_g2)
    }
}

/// Verifies many proofs for one key with a single multi-pairing.
///
/// Each proof is weighted by a fresh random scalar `ρ_i`:
/// `Π e(ρ_i A_i, B_i) = e(Σρ_i · α, β) · e(Σ ρ_i IC_i, γ) · e(Σ ρ_i C_i, δ)`.
/// A batch containing any invalid proof fails except with negligible
/// probability.
pub struct BatchVerifier;

impl BatchVerifier {
    /// Verify a batch of `(proof, public inputs)` pairs
    pub fn verify_batch<R: RngCore + CryptoRng + ?Sized>(
        vk: &VerifyingKey,
        items: &[(Proof, PublicInputs)],
        rng: &mut R,
    ) -> Result<bool, ProofEngineError> {
        vk.check_shape()
            .map_err(|e| ProofEngineError::MalformedKey(e.to_string()))?;
        if items.is_empty() {
            return Ok(true);
        }

        let mut g1_terms: Vec<G1Projective> = Vec::with_capacity(items.len() + 3);
        let mut g2_terms: Vec<G2Affine> = Vec::with_capacity(items.len() + 3);
        let mut rho_sum = Fr::zero();
        let mut ic_acc = G1Projective::zero();
        let mut c_acc = G1Projective::zero();

        for (proof, public_inputs) in items {
            check_inputs(vk, public_inputs)?;
            check_proof_points(proof)?;

            let rho = Fr::rand(rng);
            rho_sum += rho;
            ic_acc += input_commitment(vk, public_inputs)? * rho;
            c_acc += proof.c * rho;
            g1_terms.push(proof.a * rho);
            g2_terms.push(proof.b);
        }

        g1_terms.extend([-(vk.alpha_g1 * rho_sum), -ic_acc, -c_acc]);
        g2_terms.extend([vk.beta_g2, vk.gamma_g2, vk.delta_g2]);

        let g1_affine = G1Projective::normalize_batch(&g1_terms);
        let valid = Bls12_381::multi_pairing(g1_affine, g2_terms).is_zero();
        tracing::debug!(batch = items.len(), valid, "batch verified");
        Ok(valid)
    }
}

fn check_inputs(vk: &VerifyingKey, public_inputs: &PublicInputs) -> Result<(), ProofEngineError> {
    if public_inputs.len() != vk.num_public_inputs {
        return Err(ProofEngineError::MalformedInputs(format!(
            "expected {} public inputs, got {}",
            vk.num_public_inputs,
            public_inputs.len()
        )));
    }
    Ok(())
}

/// Reject points that are off-curve or outside the prime-order subgroup
fn check_proof_points(proof: &Proof) -> Result<(), ProofEngineError> {
    let g1_ok = |p: &G1Affine| p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve();
    if !g1_ok(&proof.a) {
        return Err(ProofEngineError::MalformedProof("A is not a valid G1 point".to_string()));
    }
    if !(proof.b.is_on_curve() && proof.b.is_in_correct_subgroup_assuming_on_curve()) {
        return Err(ProofEngineError::MalformedProof("B is not a valid G2 point".to_string()));
    }
    if !g1_ok(&proof.c) {
        return Err(ProofEngineError::MalformedProof("C is not a valid G1 point".to_string()));
    }
    Ok(())
}

/// `IC = γ_abc[0] + Σ x_i · γ_abc[i+1]`
fn input_commitment(vk: &VerifyingKey, public_inputs: &PublicInputs) -> Result<G1Projective, ProofEngineError> {
    let tail = msm_g1(&vk.gamma_abc_g1[1..], public_inputs.values())
        .map_err(|e| ProofEngineError::MalformedKey(e.to_string()))?;
    Ok(tail + vk.gamma_abc_g1[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Prover, Witness};
    use ark_ec::AffineRepr;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;
    use zkp_r1cs::circuits::MultiplyCircuit;
    use zkp_r1cs::CircuitDescriptor;
    use zkp_setup::{generate_setup, Cancellation, ProvingKey, SetupRandomness};

    fn fixture() -> (ProvingKey, VerifyingKey, ChaCha20Rng) {
        let circuit = CircuitDescriptor::compile(&MultiplyCircuit::<Fr>::shape()).unwrap();
        let (pk, vk) = generate_setup(
            Arc::new(circuit),
            SetupRandomness::UntrustedSeed([11u8; 32]),
            &Cancellation::new(),
        )
        .unwrap();
        (pk, vk, ChaCha20Rng::seed_from_u64(99))
    }

    fn prove(pk: &ProvingKey, x: u64, y: u64, rng: &mut ChaCha20Rng) -> (Proof, PublicInputs) {
        let witness = Witness::new(vec![Fr::from(x), Fr::from(y)]);
        let public = PublicInputs::new(vec![Fr::from(x * y)]);
        (Prover::prove(pk, &witness, &public, rng).unwrap(), public)
    }

    #[test]
    fn test_wrong_public_input_is_false() {
        let (pk, vk, mut rng) = fixture();
        let (proof, _) = prove(&pk, 3, 4, &mut rng);
        let wrong = PublicInputs::new(vec![Fr::from(13u64)]);
        assert!(!Verifier::verify(&vk, &proof, &wrong).unwrap());
    }

    #[test]
    fn test_input_count_is_checked() {
        let (pk, vk, mut rng) = fixture();
        let (proof, _) = prove(&pk, 3, 4, &mut rng);
        let err = Verifier::verify(&vk, &proof, &PublicInputs::default()).unwrap_err();
        assert!(matches!(err, ProofEngineError::MalformedInputs(_)));
    }

    #[test]
    fn test_swapped_points_are_false() {
        let (pk, vk, mut rng) = fixture();
        let (proof, public) = prove(&pk, 3, 4, &mut rng);
        let forged = Proof {
            a: proof.c,
            b: proof.b,
            c: proof.a,
        };
        assert!(!Verifier::verify(&vk, &forged, &public).unwrap());

        let identity = Proof {
            a: G1Affine::zero(),
            b: proof.b,
            c: proof.c,
        };
        assert!(!Verifier::verify(&vk, &identity, &public).unwrap());
    }

    #[test]
    fn test_off_curve_point_is_malformed() {
        let (pk, vk, mut rng) = fixture();
        let (proof, public) = prove(&pk, 3, 4, &mut rng);
        let bogus = G1Affine::new_unchecked(proof.a.x, proof.a.y + proof.a.y);
        let malformed = Proof { a: bogus, ..proof };
        let err = Verifier::verify(&vk, &malformed, &public).unwrap_err();
        assert!(matches!(err, ProofEngineError::MalformedProof(_)));
    }

    #[test]
    fn test_prepared_matches_plain() {
        let (pk, vk, mut rng) = fixture();
        let pvk = PreparedVerifyingKey::new(vk.clone()).unwrap();
        let (proof, public) = prove(&pk, 6, 7, &mut rng);
        assert!(Verifier::verify_prepared(&pvk, &proof, &public).unwrap());

        let wrong = PublicInputs::new(vec![Fr::from(41u64)]);
        assert!(!Verifier::verify_prepared(&pvk, &proof, &wrong).unwrap());
    }

    #[test]
    fn test_batch_verification() {
        let (pk, vk, mut rng) = fixture();
        let mut items: Vec<(Proof, PublicInputs)> =
            (1..=4).map(|i| prove(&pk, i, i + 1, &mut rng)).collect();
        assert!(BatchVerifier::verify_batch(&vk, &items, &mut rng).unwrap());
        assert!(BatchVerifier::verify_batch(&vk, &[], &mut rng).unwrap());

        items[2].1 = PublicInputs::new(vec![Fr::from(1000u64)]);
        assert!(!BatchVerifier::verify_batch(&vk, &items, &mut rng).unwrap());
    }
}
