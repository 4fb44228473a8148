//! Groth16 proof engine over BLS12-381.
//!
//! The engine runs a one-time setup for a fixed circuit, then proves and
//! verifies any number of times:
//!
//! ```text
//! CircuitDescriptor -> generate_setup -> (ProvingKey, VerifyingKey)
//!                                           |              |
//!                                    Prover::prove   Verifier::verify
//! ```
//!
//! Keys are immutable and can be shared across threads behind an `Arc`;
//! proving and verification never mutate them.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use ark_bls12_381::{G1Affine, G2Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

pub mod codec;
pub mod error;
pub mod export;
pub mod prover;
pub mod system;
pub mod verifier;
pub mod witness;

pub use error::{ProofEngineError, Result};
pub use export::{proof_from_json, proof_to_json, ProofJson};
pub use prover::Prover;
pub use system::{Groth16, ProofSystem};
pub use verifier::{BatchVerifier, PreparedVerifyingKey, Verifier};
pub use witness::{assign, PublicInputs, Witness};

pub use zkp_setup::{
    generate_setup, short_id, Cancellation, Cancelled, ProvingKey, SetupRandomness, VerifyingKey,
};

pub use zkp_field;
pub use zkp_qap;
pub use zkp_r1cs;
pub use zkp_setup;

/// A Groth16 proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Proof {
    /// π_A in G1
    pub a: G1Affine,
    /// π_B in G2
    pub b: G2Affine,
    /// π_C in G1
    pub c: G1Affine,
}
