//! Randomness sources for setup

use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore};
use std::fmt;

/// Cryptographically secure RNG that can be moved into a setup
pub trait SetupRng: RngCore + CryptoRng + Send {}

impl<T: RngCore + CryptoRng + Send> SetupRng for T {}

/// Where setup draws its toxic waste from.
///
/// The source is consumed by [`crate::generate_setup`] and dropped once the
/// secrets are sampled.
pub enum SetupRandomness {
    /// Operating system entropy
    System,
    /// Deterministic ChaCha20 stream from a public seed.
    ///
    /// Anyone who knows the seed can forge proofs. Only for tests and demos.
    UntrustedSeed([u8; 32]),
    /// Caller-supplied CSPRNG
    Custom(Box<dyn SetupRng>),
}

impl SetupRandomness {
    /// Wrap a caller-supplied CSPRNG
    pub fn custom<R: SetupRng + 'static>(rng: R) -> Self {
        SetupRandomness::Custom(Box::new(rng))
    }

    /// Whether the source keeps the toxic waste secret
    pub fn is_trusted(&self) -> bool {
        !matches!(self, SetupRandomness::UntrustedSeed(_))
    }

    pub(crate) fn into_rng(self) -> Box<dyn SetupRng> {
        match self {
            SetupRandomness::System => Box::new(OsRng),
            SetupRandomness::UntrustedSeed(seed) => Box::new(ChaCha20Rng::from_seed(seed)),
            SetupRandomness::Custom(rng) => rng,
        }
    }
}

impl fmt::Debug for SetupRandomness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupRandomness::System => write!(f, "System"),
            SetupRandomness::UntrustedSeed(_) => write!(f, "UntrustedSeed(..)"),
            SetupRandomness::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = SetupRandomness::UntrustedSeed([3u8; 32]).into_rng();
        let mut b = SetupRandomness::UntrustedSeed([3u8; 32]).into_rng();
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_trust_and_debug() {
        assert!(SetupRandomness::System.is_trusted());
        assert!(SetupRandomness::custom(ChaCha20Rng::seed_from_u64(1)).is_trusted());
        let seeded = SetupRandomness::UntrustedSeed([9u8; 32]);
        assert!(!seeded.is_trusted());
        assert_eq!(format!("{:?}", seeded), "UntrustedSeed(..)");
    }
}
