//! Proof system interface.
//!
//! `ProofSystem` is the seam between callers holding circuits and a
//! concrete scheme. Implementations are `Send + Sync` so a single instance
//! can serve concurrent provers and verifiers.

use crate::{Proof, ProofEngineError, Prover, PublicInputs, Verifier, Witness};
use ark_bls12_381::Fr;
use rand::rngs::OsRng;
use std::sync::Arc;
use zkp_r1cs::CircuitDescriptor;
use zkp_setup::{generate_setup, Cancellation, ProvingKey, SetupRandomness, VerifyingKey};

/// Setup, prove and verify for one proof scheme
pub trait ProofSystem: Send + Sync {
    /// Proof produced by this system
    type Proof: Send + Sync;
    /// Key used to prove
    type ProvingKey: Send + Sync;
    /// Key used to verify
    type VerifyingKey: Clone + Send + Sync;

    /// Scheme name
    fn name(&self) -> &'static str;

    /// Run setup for `circuit`
    fn setup(
        &self,
        circuit: Arc<CircuitDescriptor<Fr>>,
        randomness: SetupRandomness,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), ProofEngineError>;

    /// Prove that `witness` and `public_inputs` satisfy the key's circuit
    fn prove(
        &self,
        pk: &Self::ProvingKey,
        witness: &Witness,
        public_inputs: &PublicInputs,
    ) -> Result<Self::Proof, ProofEngineError>;

    /// Check a proof against public inputs
    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProofEngineError>;
}

/// Groth16 over BLS12-381, proving with OS randomness
#[derive(Debug, Clone, Default)]
pub struct Groth16 {
    cancel: Cancellation,
}

impl Groth16 {
    /// Create a Groth16 instance with a fresh cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Groth16 instance whose setup and proving observe `cancel`
    pub fn with_cancellation(cancel: Cancellation) -> Self {
        Self { cancel }
    }

    /// Token observed by this instance
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }
}

impl ProofSystem for Groth16 {
    type Proof = Proof;
    type ProvingKey = ProvingKey;
    type VerifyingKey = VerifyingKey;

    fn name(&self) -> &'static str {
        "groth16"
    }

    fn setup(
        &self,
        circuit: Arc<CircuitDescriptor<Fr>>,
        randomness: SetupRandomness,
    ) -> Result<(ProvingKey, VerifyingKey), ProofEngineError> {
        Ok(generate_setup(circuit, randomness, &self.cancel)?)
    }

    fn prove(
        &self,
        pk: &ProvingKey,
        witness: &Witness,
        public_inputs: &PublicInputs,
    ) -> Result<Proof, ProofEngineError> {
        Prover::prove_with_cancellation(pk, witness, public_inputs, &mut OsRng, &self.cancel)
    }

    fn verify(
        &self,
        vk: &VerifyingKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProofEngineError> {
        Verifier::verify(vk, proof, public_inputs)
    }
}
