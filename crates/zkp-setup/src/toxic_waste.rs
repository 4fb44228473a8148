//! Toxic waste sampling and destruction

use crate::randomness::SetupRng;
use crate::SetupError;
use ark_bls12_381::Fr;
use ark_ff::{PrimeField, Zero};
use ark_poly::{EvaluationDomain, Radix2EvaluationDomain};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Attempts per secret before the randomness source is declared exhausted
const MAX_SAMPLE_ATTEMPTS: usize = 16;

/// Secure handling of setup secrets
pub trait SecureDestroy {
    /// Overwrite the secrets with zero
    fn secure_destroy(&mut self);

    /// Check if the secrets have been destroyed
    fn is_destroyed(&self) -> bool;
}

/// The setup secrets `(τ, α, β, γ, δ)`.
///
/// Zeroed on drop. Knowledge of these values allows forging proofs for the
/// circuit.
pub struct ToxicWaste {
    pub(crate) tau: Fr,
    pub(crate) alpha: Fr,
    pub(crate) beta: Fr,
    pub(crate) gamma: Fr,
    pub(crate) delta: Fr,
}

impl ToxicWaste {
    /// Sample non-zero secrets with `τ` outside the evaluation domain
    pub fn sample(
        rng: &mut dyn SetupRng,
        domain: &Radix2EvaluationDomain<Fr>,
    ) -> Result<Self, SetupError> {
        let mut tau = sample_nonzero(rng, "tau")?;
        let mut attempts = 1;
        while domain.evaluate_vanishing_polynomial(tau).is_zero() {
            if attempts == MAX_SAMPLE_ATTEMPTS {
                return Err(SetupError::Randomness(
                    "tau repeatedly landed in the evaluation domain".to_string(),
                ));
            }
            tau = sample_nonzero(rng, "tau")?;
            attempts += 1;
        }

        Ok(Self {
            tau,
            alpha: sample_nonzero(rng, "alpha")?,
            beta: sample_nonzero(rng, "beta")?,
            gamma: sample_nonzero(rng, "gamma")?,
            delta: sample_nonzero(rng, "delta")?,
        })
    }
}

impl SecureDestroy for ToxicWaste {
    fn secure_destroy(&mut self) {
        self.tau.zeroize();
        self.alpha.zeroize();
        self.beta.zeroize();
        self.gamma.zeroize();
        self.delta.zeroize();
    }

    fn is_destroyed(&self) -> bool {
        self.tau.is_zero()
            && self.alpha.is_zero()
            && self.beta.is_zero()
            && self.gamma.is_zero()
            && self.delta.is_zero()
    }
}

impl Zeroize for ToxicWaste {
    fn zeroize(&mut self) {
        self.secure_destroy();
    }
}

impl Drop for ToxicWaste {
    fn drop(&mut self) {
        self.secure_destroy();
    }
}

impl ZeroizeOnDrop for ToxicWaste {}

/// Draw a uniformly distributed non-zero scalar.
///
/// 64 bytes are reduced mod r so the bias is negligible.
fn sample_nonzero(rng: &mut dyn SetupRng, name: &'static str) -> Result<Fr, SetupError> {
    let mut bytes = [0u8; 64];
    for _ in 0..MAX_SAMPLE_ATTEMPTS {
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| SetupError::Randomness(e.to_string()))?;
        let value = Fr::from_le_bytes_mod_order(&bytes);
        bytes.zeroize();
        if !value.is_zero() {
            return Ok(value);
        }
    }
    Err(SetupError::Randomness(format!(
        "source produced no usable value for {name}"
    )))
}

/// Powers `[1, τ, τ², ..., τ^(count-1)]`
pub fn powers_of_tau(tau: Fr, count: usize) -> Vec<Fr> {
    let mut powers = Vec::with_capacity(count);
    let mut current = Fr::from(1u64);
    for _ in 0..count {
        powers.push(current);
        current *= tau;
    }
    powers
}
