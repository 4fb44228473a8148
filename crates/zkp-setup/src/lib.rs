//! Circuit-specific Groth16 setup for the zkp proof engine.
//!
//! [`generate_setup`] samples the toxic waste, evaluates the circuit's QAP at
//! the secret point and publishes the result in the exponent as a
//! [`ProvingKey`] / [`VerifyingKey`] pair. Setup runs once per circuit and
//! never caches; persisting keys is up to the caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cancellation;
pub mod keys;
pub mod randomness;
pub mod toxic_waste;

pub use cancellation::{Cancellation, Cancelled};
pub use keys::{KeyShapeError, ProvingKey, VerifyingKey};
pub use randomness::{SetupRandomness, SetupRng};
pub use toxic_waste::{powers_of_tau, SecureDestroy, ToxicWaste};
pub use zkp_qap;
pub use zkp_r1cs;

use ark_bls12_381::{Fr, G1Projective, G2Projective};
use ark_ec::{CurveGroup, Group};
use ark_ff::Field;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use zeroize::{Zeroize, Zeroizing};
use zkp_qap::{QAPError, QAPEvaluation, QAP};
use zkp_r1cs::CircuitDescriptor;

/// Errors that can occur during setup
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The randomness source failed or produced unusable values
    #[error("Randomness source failed: {0}")]
    Randomness(String),

    /// The circuit does not fit an evaluation domain
    #[error("Circuit cannot be reduced to a QAP: {0}")]
    Qap(#[from] QAPError),

    /// A secret that must be invertible was zero
    #[error("Degenerate toxic waste: {0} is zero")]
    Degenerate(&'static str),

    /// Setup was cancelled
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Short hex prefix of a circuit id for log fields
pub fn short_id(circuit_id: &[u8]) -> String {
    hex::encode(&circuit_id[..circuit_id.len().min(8)])
}

/// Run the Groth16 setup for `circuit`.
///
/// The randomness source is consumed and the toxic waste is zeroed before
/// this function returns, on success and on failure alike.
pub fn generate_setup(
    circuit: Arc<CircuitDescriptor<Fr>>,
    randomness: SetupRandomness,
    cancel: &Cancellation,
) -> Result<(ProvingKey, VerifyingKey), SetupError> {
    let span = tracing::info_span!("setup", circuit = %short_id(&circuit.circuit_id()));
    let _guard = span.enter();
    let started = Instant::now();

    if !randomness.is_trusted() {
        tracing::warn!("setup uses a public seed; the resulting keys are not secure");
    }

    let qap = QAP::from_descriptor(&circuit)?;
    cancel.checkpoint("sampling")?;

    let toxic = {
        let mut rng = randomness.into_rng();
        ToxicWaste::sample(rng.as_mut(), &qap.domain)?
    };
    cancel.checkpoint("qap evaluation")?;

    let eval = qap.evaluate_at(&circuit, toxic.tau)?;
    let keys = build_keys(circuit, &qap, &eval, &toxic, cancel)?;
    drop(toxic);

    tracing::info!(
        constraints = qap.num_constraints,
        domain_size = qap.domain_size(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "setup complete"
    );
    Ok(keys)
}

fn build_keys(
    circuit: Arc<CircuitDescriptor<Fr>>,
    qap: &QAP<Fr>,
    eval: &QAPEvaluation<Fr>,
    toxic: &ToxicWaste,
    cancel: &Cancellation,
) -> Result<(ProvingKey, VerifyingKey), SetupError> {
    let g1 = G1Projective::generator();
    let g2 = G2Projective::generator();
    let num_public = circuit.num_public_inputs();
    let domain_size = qap.domain_size();

    // Every scalar below is derived from the secrets and wiped on drop
    let gamma_inv = Zeroizing::new(toxic.gamma.inverse().ok_or(SetupError::Degenerate("gamma"))?);
    let delta_inv = Zeroizing::new(toxic.delta.inverse().ok_or(SetupError::Degenerate("delta"))?);

    let abc: Zeroizing<Vec<Fr>> = Zeroizing::new(
        eval.a
            .par_iter()
            .zip(eval.b.par_iter())
            .zip(eval.c.par_iter())
            .map(|((a, b), c)| toxic.beta * a + toxic.alpha * b + c)
            .collect(),
    );
    let gamma_abc: Zeroizing<Vec<Fr>> =
        Zeroizing::new(abc[..=num_public].iter().map(|v| *v * *gamma_inv).collect());
    let l: Zeroizing<Vec<Fr>> =
        Zeroizing::new(abc[num_public + 1..].iter().map(|v| *v * *delta_inv).collect());

    let z_over_delta = Zeroizing::new(eval.z * *delta_inv);
    let mut powers = powers_of_tau(toxic.tau, domain_size - 1);
    let h: Zeroizing<Vec<Fr>> = Zeroizing::new(powers.iter().map(|p| *p * *z_over_delta).collect());
    powers.zeroize();

    cancel.checkpoint("a and b queries")?;
    let a_query = batch_mul(g1, &eval.a[..]);
    let b_g1_query = batch_mul(g1, &eval.b[..]);
    let b_g2_query = batch_mul(g2, &eval.b[..]);

    cancel.checkpoint("h and l queries")?;
    let h_query = batch_mul(g1, &h[..]);
    let l_query = batch_mul(g1, &l[..]);
    let gamma_abc_g1 = batch_mul(g1, &gamma_abc[..]);

    let alpha_g1 = (g1 * toxic.alpha).into_affine();
    let beta_g2 = (g2 * toxic.beta).into_affine();
    let delta_g2 = (g2 * toxic.delta).into_affine();
    let circuit_id = circuit.circuit_id();

    let verifying_key = VerifyingKey {
        circuit_id,
        num_public_inputs: num_public,
        alpha_g1,
        beta_g2,
        gamma_g2: (g2 * toxic.gamma).into_affine(),
        delta_g2,
        gamma_abc_g1,
    };
    let proving_key = ProvingKey {
        circuit,
        circuit_id,
        domain_size,
        alpha_g1,
        beta_g1: (g1 * toxic.beta).into_affine(),
        beta_g2,
        delta_g1: (g1 * toxic.delta).into_affine(),
        delta_g2,
        a_query,
        b_g1_query,
        b_g2_query,
        h_query,
        l_query,
    };

    Ok((proving_key, verifying_key))
}

/// Multiply a fixed base by many scalars and normalize in one batch
fn batch_mul<G: CurveGroup>(base: G, scalars: &[G::ScalarField]) -> Vec<G::Affine> {
    let projective: Vec<G> = scalars.par_iter().map(|s| base * *s).collect();
    G::normalize_batch(&projective)
}
