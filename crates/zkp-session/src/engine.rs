//! Base-case and chain-case proof sessions booted together.
//!
//! The base case proves knowledge of a message whose digest is public. The
//! chain case proves knowledge of a message linking a public previous digest
//! to a public current digest, so each link of a chain carries its own proof.

use crate::{EngineConfig, ProofSession, SessionError};
use ark_bls12_381::Fr;
use std::time::Instant;
use zkp_core::zkp_r1cs::circuits::{chain_digest, message_digest, HashChainCircuit, PreimageCircuit};
use zkp_core::zkp_r1cs::CircuitDescriptor;
use zkp_core::ProofEngineError;

/// Booted base-case and chain-case sessions
#[derive(Debug)]
pub struct ProofEngine {
    config: EngineConfig,
    base: ProofSession,
    normal: ProofSession,
}

impl ProofEngine {
    /// Boot both sessions, reading stored keys where present
    pub fn boot(config: EngineConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let started = Instant::now();

        tracing::info!(message_len = config.base_message_len, "booting base case proof system");
        let base_circuit = CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(config.base_message_len))
            .map_err(ProofEngineError::from)?;
        let base = ProofSession::boot(
            &config.key_dir,
            &config.base_prefix,
            base_circuit,
            config.setup_randomness(&config.base_prefix)?,
        )?;

        tracing::info!(message_len = config.normal_message_len, "booting chain case proof system");
        let normal_circuit =
            CircuitDescriptor::compile(&HashChainCircuit::<Fr>::shape(config.normal_message_len))
                .map_err(ProofEngineError::from)?;
        let normal = ProofSession::boot(
            &config.key_dir,
            &config.normal_prefix,
            normal_circuit,
            config.setup_randomness(&config.normal_prefix)?,
        )?;

        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "proof system booted");
        Ok(Self { config, base, normal })
    }

    /// Configuration the engine was booted with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Base-case session
    pub fn base(&self) -> &ProofSession {
        &self.base
    }

    /// Chain-case session
    pub fn normal(&self) -> &ProofSession {
        &self.normal
    }

    /// Prove knowledge of `message` for its digest; returns the JSON proof and the digest
    pub fn prove_base(&self, message: &[u8]) -> Result<(String, Fr), ProofEngineError> {
        self.check_len(message, self.config.base_message_len)?;
        let json = self.base.prove_json(&PreimageCircuit::new(message.to_vec()))?;
        Ok((json, message_digest(message)))
    }

    /// Prove that `message` links `prev_digest` to the next digest; returns the
    /// JSON proof and the next digest
    pub fn prove_normal(&self, prev_digest: Fr, message: &[u8]) -> Result<(String, Fr), ProofEngineError> {
        self.check_len(message, self.config.normal_message_len)?;
        let json = self
            .normal
            .prove_json(&HashChainCircuit::new(prev_digest, message.to_vec()))?;
        Ok((json, chain_digest(prev_digest, message)))
    }

    /// Verify a base-case JSON proof
    pub fn verify_base(&self, json: &str) -> Result<bool, ProofEngineError> {
        self.base.verify_json(json)
    }

    /// Verify a chain-case JSON proof
    pub fn verify_normal(&self, json: &str) -> Result<bool, ProofEngineError> {
        self.normal.verify_json(json)
    }

    fn check_len(&self, message: &[u8], expected: usize) -> Result<(), ProofEngineError> {
        if message.len() != expected {
            return Err(ProofEngineError::WitnessInvalid(format!(
                "message is {} bytes, circuit expects {expected}",
                message.len()
            )));
        }
        Ok(())
    }
}
