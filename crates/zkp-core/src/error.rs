//! Error taxonomy of the proof engine

use zkp_r1cs::R1CSError;
use zkp_setup::{Cancelled, SetupError};

/// Errors surfaced by setup, proving, verification and artifact decoding
#[derive(Debug, thiserror::Error)]
pub enum ProofEngineError {
    /// Circuit descriptor is malformed or cannot be compiled
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Setup could not complete
    #[error("Setup failed: {0}")]
    SetupFailed(#[source] SetupError),

    /// Witness has the wrong size or does not satisfy the circuit
    #[error("Invalid witness: {0}")]
    WitnessInvalid(String),

    /// Proving key does not match its circuit
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// Proof bytes or points are structurally invalid
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Public inputs have the wrong count or a non-canonical encoding
    #[error("Malformed public inputs: {0}")]
    MalformedInputs(String),

    /// Key artifact cannot be decoded or is internally inconsistent
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// Operation was cancelled through its token
    #[error("Cancelled during {phase}")]
    Cancelled {
        /// Phase that was about to start
        phase: &'static str,
    },
}

impl From<SetupError> for ProofEngineError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::Cancelled(cancelled) => cancelled.into(),
            other => ProofEngineError::SetupFailed(other),
        }
    }
}

impl From<Cancelled> for ProofEngineError {
    fn from(err: Cancelled) -> Self {
        ProofEngineError::Cancelled { phase: err.phase }
    }
}

impl From<R1CSError> for ProofEngineError {
    fn from(err: R1CSError) -> Self {
        if err.is_structural() {
            ProofEngineError::InvalidCircuit(err.to_string())
        } else {
            ProofEngineError::WitnessInvalid(err.to_string())
        }
    }
}

/// Result alias for engine operations
pub type Result<T, E = ProofEngineError> = std::result::Result<T, E>;
