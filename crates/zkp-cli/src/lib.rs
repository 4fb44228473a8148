//! Command handlers for the `zkp` tool.
//!
//! Two circuits are served: the base case (knowledge of a message with a
//! public digest) and the chain case (knowledge of a message linking a
//! previous digest to the next one). Keys live under the configured key
//! directory with the `base_` and `norm_` prefixes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use anyhow::{bail, Context, Result};
use ark_bls12_381::Fr;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use zkp_core::zkp_r1cs::circuits::{chain_digest, message_digest, HashChainCircuit, PreimageCircuit};
use zkp_core::zkp_r1cs::CircuitDescriptor;
use zkp_core::{short_id, Cancellation};
use zkp_field::{from_canonical_bytes, to_canonical_bytes};
use zkp_session::{EngineConfig, ProofEngine, ProofSession};

/// zk proof engine: one-time setup, then prove and verify
#[derive(Parser, Debug)]
#[command(name = "zkp", version, about)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Key directory, overriding the configuration
    #[arg(long, global = true)]
    pub key_dir: Option<PathBuf>,

    /// 32-byte hex seed for a reproducible, insecure setup
    #[arg(long, global = true)]
    pub seed: Option<String>,
}

/// Which circuit a command applies to
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitKind {
    /// Message with a public digest
    Base,
    /// Message linking a previous digest to the next
    Normal,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run setup for one circuit and write its keys, replacing stored ones
    Setup {
        /// Circuit to set up
        #[arg(short, long, value_enum)]
        circuit: CircuitKind,
    },
    /// Load or create the keys of both circuits
    Boot,
    /// Prove a message and write the JSON proof
    Prove {
        /// Circuit to prove
        #[arg(short, long, value_enum)]
        circuit: CircuitKind,

        /// Message as hex
        #[arg(short, long)]
        message: String,

        /// Previous digest as hex (chain case only)
        #[arg(short, long)]
        prev: Option<String>,

        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify a JSON proof; exits non-zero when it does not verify
    Verify {
        /// Circuit the proof is for
        #[arg(short, long, value_enum)]
        circuit: CircuitKind,

        /// JSON proof file
        #[arg(short, long)]
        proof: PathBuf,
    },
    /// Print the digest of a message
    Digest {
        /// Message as hex
        #[arg(short, long)]
        message: String,

        /// Previous digest as hex, for a chain digest
        #[arg(short, long)]
        prev: Option<String>,
    },
}

/// Merge the configuration file with command-line overrides
pub fn load_config(global: &GlobalArgs) -> Result<EngineConfig> {
    let mut config = match &global.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &global.key_dir {
        config.key_dir = dir.clone();
    }
    if let Some(seed) = &global.seed {
        config.setup_seed = Some(seed.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Hex encoding of a field element
pub fn digest_to_hex(digest: &Fr) -> String {
    hex::encode(to_canonical_bytes(digest))
}

/// Parse a hex field element
pub fn digest_from_hex(text: &str) -> Result<Fr> {
    let bytes = hex::decode(text.trim()).context("digest is not hex")?;
    Ok(from_canonical_bytes(&bytes)?)
}

fn circuit_for(kind: CircuitKind, config: &EngineConfig) -> Result<(String, CircuitDescriptor<Fr>)> {
    Ok(match kind {
        CircuitKind::Base => (
            config.base_prefix.clone(),
            CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(config.base_message_len))?,
        ),
        CircuitKind::Normal => (
            config.normal_prefix.clone(),
            CircuitDescriptor::compile(&HashChainCircuit::<Fr>::shape(config.normal_message_len))?,
        ),
    })
}

fn setup(kind: CircuitKind, config: &EngineConfig) -> Result<ProofSession> {
    let (prefix, circuit) = circuit_for(kind, config)?;
    let session = ProofSession::setup(
        &prefix,
        circuit,
        config.setup_randomness(&prefix)?,
        &Cancellation::new(),
    )?;
    session.write_keys(&config.key_dir)?;
    Ok(session)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// Run one command; returns whether it succeeded in the domain sense
/// (a proof that does not verify yields `Ok(false)`)
pub fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli.global)?;

    match cli.command {
        Commands::Setup { circuit } => {
            let session = setup(circuit, &config)?;
            println!("{}", hex::encode(session.circuit_id()));
        }
        Commands::Boot => {
            let engine = ProofEngine::boot(config)?;
            println!("base   {}", short_id(&engine.base().circuit_id()));
            println!("normal {}", short_id(&engine.normal().circuit_id()));
        }
        Commands::Prove {
            circuit,
            message,
            prev,
            output,
        } => {
            let message = hex::decode(message.trim()).context("message is not hex")?;
            let engine = ProofEngine::boot(config)?;
            let (json, digest) = match (circuit, prev) {
                (CircuitKind::Base, None) => engine.prove_base(&message)?,
                (CircuitKind::Normal, Some(prev)) => engine.prove_normal(digest_from_hex(&prev)?, &message)?,
                (CircuitKind::Base, Some(_)) => bail!("--prev only applies to the normal circuit"),
                (CircuitKind::Normal, None) => bail!("the normal circuit needs --prev"),
            };
            write_output(output.as_deref(), &json)?;
            tracing::info!(digest = %digest_to_hex(&digest), "proof written");
        }
        Commands::Verify { circuit, proof } => {
            let json = fs::read_to_string(&proof)
                .with_context(|| format!("reading {}", proof.display()))?;
            let engine = ProofEngine::boot(config)?;
            let valid = match circuit {
                CircuitKind::Base => engine.verify_base(&json)?,
                CircuitKind::Normal => engine.verify_normal(&json)?,
            };
            println!("{}", if valid { "valid" } else { "invalid" });
            return Ok(valid);
        }
        Commands::Digest { message, prev } => {
            let message = hex::decode(message.trim()).context("message is not hex")?;
            let digest = match prev {
                Some(prev) => chain_digest(digest_from_hex(&prev)?, &message),
                None => message_digest::<Fr>(&message),
            };
            println!("{}", digest_to_hex(&digest));
        }
    }
    Ok(true)
}
