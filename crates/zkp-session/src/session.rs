//! Proof session: one circuit, its key pair, booted once

use crate::{HandleTable, SessionError};
use ark_bls12_381::Fr;
use rand::rngs::OsRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use zkp_core::codec::{
    decode_proving_key, decode_verifying_key, encode_circuit, encode_proving_key,
    encode_verifying_key,
};
use zkp_core::zkp_r1cs::{Circuit, CircuitDescriptor, CIRCUIT_ID_BYTES};
use zkp_core::{
    assign, generate_setup, proof_from_json, proof_to_json, short_id, Cancellation,
    PreparedVerifyingKey, Proof, ProofEngineError, Prover, ProvingKey, PublicInputs,
    SetupRandomness, Verifier, VerifyingKey,
};

/// Table of sessions handed out across an ownership boundary
pub type SessionTable = HandleTable<ProofSession>;

/// Key pair of one circuit, ready to prove and verify
pub struct ProofSession {
    prefix: String,
    pk: Arc<ProvingKey>,
    prepared: PreparedVerifyingKey,
}

impl std::fmt::Debug for ProofSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofSession")
            .field("prefix", &self.prefix)
            .field("circuit", &short_id(&self.pk.circuit_id))
            .finish()
    }
}

fn key_path(dir: &Path, prefix: &str, name: &str) -> PathBuf {
    dir.join(format!("{prefix}{name}"))
}

impl ProofSession {
    /// Wrap a key pair produced by one setup
    pub fn from_keys(prefix: &str, pk: ProvingKey, vk: VerifyingKey) -> Result<Self, SessionError> {
        if !vk.is_for_circuit(&pk.circuit_id) {
            return Err(ProofEngineError::KeyMismatch(
                "proving and verifying keys belong to different circuits".to_string(),
            )
            .into());
        }
        Ok(Self {
            prefix: prefix.to_string(),
            pk: Arc::new(pk),
            prepared: PreparedVerifyingKey::new(vk)?,
        })
    }

    /// Run setup for `circuit`
    pub fn setup(
        prefix: &str,
        circuit: CircuitDescriptor<Fr>,
        randomness: SetupRandomness,
        cancel: &Cancellation,
    ) -> Result<Self, SessionError> {
        let (pk, vk) = generate_setup(Arc::new(circuit), randomness, cancel)
            .map_err(ProofEngineError::from)?;
        Self::from_keys(prefix, pk, vk)
    }

    /// Load keys from `dir` if `<prefix>pk.bin` exists, else run setup and
    /// write them.
    ///
    /// Stored keys for a different circuit are refused with `KeyMismatch`.
    pub fn boot(
        dir: &Path,
        prefix: &str,
        circuit: CircuitDescriptor<Fr>,
        randomness: SetupRandomness,
    ) -> Result<Self, SessionError> {
        let span = tracing::info_span!("boot", prefix);
        let _guard = span.enter();

        if key_path(dir, prefix, "pk.bin").exists() {
            let session = Self::read_keys(dir, prefix)?;
            if session.circuit_id() != circuit.circuit_id() {
                return Err(ProofEngineError::KeyMismatch(format!(
                    "stored keys are for circuit {}, expected {}",
                    short_id(&session.circuit_id()),
                    short_id(&circuit.circuit_id())
                ))
                .into());
            }
            return Ok(session);
        }

        tracing::info!("no stored keys, running setup");
        let session = Self::setup(prefix, circuit, randomness, &Cancellation::new())?;
        session.write_keys(dir)?;
        Ok(session)
    }

    /// Write `<prefix>vk.bin`, `<prefix>ccs.bin` and `<prefix>pk.bin`.
    ///
    /// Each file is replaced atomically and `pk.bin` goes last, so an
    /// interrupted write leaves no proving key and the next boot reruns setup.
    pub fn write_keys(&self, dir: &Path) -> Result<(), SessionError> {
        fs::create_dir_all(dir).map_err(|e| SessionError::io(dir, e))?;

        let vk_bytes = encode_verifying_key(self.verifying_key())?;
        timed_write(&key_path(dir, &self.prefix, "vk.bin"), &vk_bytes, "verifying key")?;

        let ccs_bytes = encode_circuit(&self.pk.circuit);
        timed_write(&key_path(dir, &self.prefix, "ccs.bin"), &ccs_bytes, "circuit")?;

        let pk_bytes = encode_proving_key(&self.pk)?;
        timed_write(&key_path(dir, &self.prefix, "pk.bin"), &pk_bytes, "proving key")?;
        Ok(())
    }

    /// Read `<prefix>vk.bin` and `<prefix>pk.bin`
    pub fn read_keys(dir: &Path, prefix: &str) -> Result<Self, SessionError> {
        let vk_bytes = timed_read(&key_path(dir, prefix, "vk.bin"), "verifying key")?;
        let vk = decode_verifying_key(&vk_bytes)?;
        let pk_bytes = timed_read(&key_path(dir, prefix, "pk.bin"), "proving key")?;
        let pk = decode_proving_key(&pk_bytes)?;
        Self::from_keys(prefix, pk, vk)
    }

    /// File prefix of this session
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Circuit id of the key pair
    pub fn circuit_id(&self) -> [u8; CIRCUIT_ID_BYTES] {
        self.pk.circuit_id
    }

    /// Circuit the keys were generated for
    pub fn circuit(&self) -> &CircuitDescriptor<Fr> {
        &self.pk.circuit
    }

    /// Shared proving key
    pub fn proving_key(&self) -> &Arc<ProvingKey> {
        &self.pk
    }

    /// Verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.prepared.vk
    }

    /// Assign `circuit` and prove it with OS randomness
    pub fn prove<C: Circuit<Fr> + ?Sized>(&self, circuit: &C) -> Result<(Proof, PublicInputs), ProofEngineError> {
        let (witness, public_inputs) = assign(&self.pk.circuit, circuit)?;
        let proof = Prover::prove(&self.pk, &witness, &public_inputs, &mut OsRng)?;
        Ok((proof, public_inputs))
    }

    /// [`ProofSession::prove`] rendered as JSON
    pub fn prove_json<C: Circuit<Fr> + ?Sized>(&self, circuit: &C) -> Result<String, ProofEngineError> {
        let (proof, public_inputs) = self.prove(circuit)?;
        proof_to_json(&proof, &public_inputs, &self.pk.circuit_id)
    }

    /// Verify a proof against this session's verifying key
    pub fn verify(&self, proof: &Proof, public_inputs: &PublicInputs) -> Result<bool, ProofEngineError> {
        Verifier::verify_prepared(&self.prepared, proof, public_inputs)
    }

    /// Verify a JSON proof; proofs for another circuit are `MalformedProof`
    pub fn verify_json(&self, json: &str) -> Result<bool, ProofEngineError> {
        let (proof, public_inputs, circuit_id) = proof_from_json(json)?;
        if !self.prepared.vk.is_for_circuit(&circuit_id) {
            return Err(ProofEngineError::MalformedProof(format!(
                "proof is for circuit {}, key is for {}",
                short_id(&circuit_id),
                short_id(&self.pk.circuit_id)
            )));
        }
        self.verify(&proof, &public_inputs)
    }
}

fn timed_write(path: &Path, bytes: &[u8], what: &'static str) -> Result<(), SessionError> {
    let started = Instant::now();
    write_atomic(path, bytes)?;
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "exported {what}"
    );
    Ok(())
}

/// Write to a temporary file next to `path`, sync, then rename over it
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SessionError> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(|e| SessionError::io(dir, e))?;
    file.write_all(bytes).map_err(|e| SessionError::io(file.path(), e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| SessionError::io(file.path(), e))?;
    file.persist(path).map_err(|e| SessionError::io(path, e.error))?;
    Ok(())
}

fn timed_read(path: &Path, what: &'static str) -> Result<Vec<u8>, SessionError> {
    let started = Instant::now();
    let bytes = fs::read(path).map_err(|e| SessionError::io(path, e))?;
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "imported {what}"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkp_core::zkp_r1cs::circuits::{MultiplyCircuit, PreimageCircuit};

    fn multiply() -> CircuitDescriptor<Fr> {
        CircuitDescriptor::compile(&MultiplyCircuit::<Fr>::shape()).unwrap()
    }

    #[test]
    fn test_boot_writes_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let first = ProofSession::boot(
            dir.path(),
            "base_",
            multiply(),
            SetupRandomness::UntrustedSeed([1u8; 32]),
        )
        .unwrap();
        for name in ["base_pk.bin", "base_vk.bin", "base_ccs.bin"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }

        // A different seed would produce different keys, so equality shows they were read
        let second = ProofSession::boot(
            dir.path(),
            "base_",
            multiply(),
            SetupRandomness::UntrustedSeed([2u8; 32]),
        )
        .unwrap();
        assert_eq!(second.verifying_key(), first.verifying_key());

        let (proof, public) = first
            .prove(&MultiplyCircuit::new(Fr::from(4u64), Fr::from(5u64)))
            .unwrap();
        assert!(second.verify(&proof, &public).unwrap());
    }

    #[test]
    fn test_write_keys_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let session =
            ProofSession::setup("w_", multiply(), SetupRandomness::UntrustedSeed([9u8; 32]), &Cancellation::new())
                .unwrap();
        session.write_keys(dir.path()).unwrap();
        // Rewriting replaces the files in place
        session.write_keys(dir.path()).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["w_ccs.bin", "w_pk.bin", "w_vk.bin"]);

        let reread = ProofSession::read_keys(dir.path(), "w_").unwrap();
        assert_eq!(reread.verifying_key(), session.verifying_key());
    }

    #[test]
    fn test_interrupted_write_reruns_setup() {
        let dir = tempfile::tempdir().unwrap();
        let first =
            ProofSession::boot(dir.path(), "i_", multiply(), SetupRandomness::UntrustedSeed([10u8; 32])).unwrap();

        // A crash before the proving key lands leaves a stray temp file and no pk.bin
        fs::remove_file(dir.path().join("i_pk.bin")).unwrap();
        fs::write(dir.path().join(".tmpPartial"), b"ZKPE").unwrap();

        let second =
            ProofSession::boot(dir.path(), "i_", multiply(), SetupRandomness::UntrustedSeed([11u8; 32])).unwrap();
        assert_ne!(second.verifying_key(), first.verifying_key());
        let reread = ProofSession::read_keys(dir.path(), "i_").unwrap();
        assert_eq!(reread.verifying_key(), second.verifying_key());
    }

    #[test]
    fn test_boot_refuses_keys_for_other_circuit() {
        let dir = tempfile::tempdir().unwrap();
        ProofSession::boot(dir.path(), "x_", multiply(), SetupRandomness::UntrustedSeed([3u8; 32])).unwrap();

        let other = CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(4)).unwrap();
        let err = ProofSession::boot(dir.path(), "x_", other, SetupRandomness::System).unwrap_err();
        assert!(matches!(err, SessionError::Engine(ProofEngineError::KeyMismatch(_))));
    }

    #[test]
    fn test_corrupt_key_file() {
        let dir = tempfile::tempdir().unwrap();
        ProofSession::boot(dir.path(), "c_", multiply(), SetupRandomness::UntrustedSeed([4u8; 32])).unwrap();
        let path = dir.path().join("c_vk.bin");
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 1);
        fs::write(&path, bytes).unwrap();

        let err = ProofSession::read_keys(dir.path(), "c_").unwrap_err();
        assert!(matches!(err, SessionError::Engine(ProofEngineError::MalformedKey(_))));
    }

    #[test]
    fn test_json_proofs_are_bound_to_session() {
        let a = ProofSession::setup("a_", multiply(), SetupRandomness::UntrustedSeed([5u8; 32]), &Cancellation::new()).unwrap();
        let b = ProofSession::setup(
            "b_",
            CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(4)).unwrap(),
            SetupRandomness::UntrustedSeed([6u8; 32]),
            &Cancellation::new(),
        )
        .unwrap();

        let json = a
            .prove_json(&MultiplyCircuit::new(Fr::from(3u64), Fr::from(3u64)))
            .unwrap();
        assert!(a.verify_json(&json).unwrap());
        assert!(matches!(b.verify_json(&json), Err(ProofEngineError::MalformedProof(_))));
    }

    #[test]
    fn test_mismatched_key_pair() {
        let a = ProofSession::setup("a_", multiply(), SetupRandomness::UntrustedSeed([7u8; 32]), &Cancellation::new()).unwrap();
        let b = ProofSession::setup(
            "b_",
            CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(4)).unwrap(),
            SetupRandomness::UntrustedSeed([8u8; 32]),
            &Cancellation::new(),
        )
        .unwrap();
        let err = ProofSession::from_keys("m_", (**a.proving_key()).clone(), b.verifying_key().clone()).unwrap_err();
        assert!(matches!(err, SessionError::Engine(ProofEngineError::KeyMismatch(_))));
    }
}
