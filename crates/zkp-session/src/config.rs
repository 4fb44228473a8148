//! Engine configuration

use crate::SessionError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use zkp_core::SetupRandomness;

/// Message length of the base-case circuit, in bytes
pub const DEFAULT_BASE_MESSAGE_LEN: usize = 191;
/// Message length of the chain-case circuit, in bytes
pub const DEFAULT_NORMAL_MESSAGE_LEN: usize = 191;

/// Where keys live and which circuits to boot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory holding key files
    pub key_dir: PathBuf,
    /// File prefix for base-case keys
    pub base_prefix: String,
    /// File prefix for chain-case keys
    pub normal_prefix: String,
    /// Message length of the base-case circuit
    pub base_message_len: usize,
    /// Message length of the chain-case circuit
    pub normal_message_len: usize,
    /// Hex seed for a reproducible, insecure setup. OS entropy when absent.
    pub setup_seed: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("."),
            base_prefix: "base_".to_string(),
            normal_prefix: "norm_".to_string(),
            base_message_len: DEFAULT_BASE_MESSAGE_LEN,
            normal_message_len: DEFAULT_NORMAL_MESSAGE_LEN,
            setup_seed: None,
        }
    }
}

impl EngineConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = fs::read_to_string(path).map_err(|e| SessionError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Parse and validate JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Check lengths, prefixes and seed
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.base_message_len == 0 || self.normal_message_len == 0 {
            return Err(SessionError::Config("message lengths must be positive".to_string()));
        }
        for prefix in [&self.base_prefix, &self.normal_prefix] {
            if prefix.is_empty() || prefix.contains(['/', '\\']) {
                return Err(SessionError::Config(format!("invalid key prefix {prefix:?}")));
            }
        }
        if self.base_prefix == self.normal_prefix {
            return Err(SessionError::Config("key prefixes must differ".to_string()));
        }
        self.seed_bytes()?;
        Ok(())
    }

    /// Randomness for the setup of the circuit stored under `prefix`.
    ///
    /// With a seed, each prefix gets its own seed `SHA-256(seed || prefix)`.
    pub fn setup_randomness(&self, prefix: &str) -> Result<SetupRandomness, SessionError> {
        Ok(match self.seed_bytes()? {
            Some(seed) => {
                let mut hasher = Sha256::new();
                hasher.update(seed);
                hasher.update(prefix.as_bytes());
                SetupRandomness::UntrustedSeed(hasher.finalize().into())
            }
            None => SetupRandomness::System,
        })
    }

    fn seed_bytes(&self) -> Result<Option<[u8; 32]>, SessionError> {
        let Some(seed) = &self.setup_seed else {
            return Ok(None);
        };
        let bytes = hex::decode(seed).map_err(|e| SessionError::Config(format!("setup seed: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SessionError::Config("setup seed must be 32 bytes of hex".to_string()))?;
        Ok(Some(seed))
    }
}
