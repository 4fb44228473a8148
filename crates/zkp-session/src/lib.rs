//! Proof sessions for the zkp proof engine.
//!
//! A [`ProofSession`] owns the key pair of one circuit and boots it once:
//! keys are read from disk when present and generated and written otherwise.
//! [`ProofEngine`] boots the base-case and chain-case sessions from an
//! [`EngineConfig`].
//!
//! Sessions crossing an ownership boundary are tracked in a [`HandleTable`]:
//! callers hold opaque [`ProofHandle`]s, take and drop references explicitly,
//! and the session is released when the last reference goes away.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod handle;
pub mod session;

pub use config::EngineConfig;
pub use engine::ProofEngine;
pub use handle::{HandleError, HandleTable, ProofHandle, Release};
pub use session::{ProofSession, SessionTable};

use std::path::PathBuf;
use zkp_core::ProofEngineError;

/// Errors from session boot, persistence and handle tracking
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing a key file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Engine operation failed
    #[error(transparent)]
    Engine(#[from] ProofEngineError),

    /// Configuration is unreadable or invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Handle integrity violation or poisoned table
    #[error(transparent)]
    Handle(#[from] HandleError),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}
