//! Stock circuits
//!
//! * [`MultiplyCircuit`]: knowledge of a factorisation `x * y = product`.
//! * [`PreimageCircuit`]: knowledge of a message whose MiMC digest is public.
//! * [`HashChainCircuit`]: knowledge of a message linking a public previous
//!   digest to a public current digest, `curr = MiMC(prev || message)`.
//!
//! Messages are packed 31 bytes per field element. The number of packed
//! blocks follows from the fixed message length and is bound by the circuit
//! id.

use crate::gadgets::Mimc;
use crate::{Circuit, ConstraintSystem, LinearCombination, R1CSError};
use zkp_field::{num_packed_elements, pack_bytes, FieldLike};

/// Proves knowledge of `x` and `y` with `x * y` equal to the public product
#[derive(Debug, Clone)]
pub struct MultiplyCircuit<F: FieldLike> {
    x: Option<F>,
    y: Option<F>,
}

impl<F: FieldLike> MultiplyCircuit<F> {
    /// Instance with witness values
    pub fn new(x: F, y: F) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    /// Shape-only instance
    pub fn shape() -> Self {
        Self { x: None, y: None }
    }
}

impl<F: FieldLike> Circuit<F> for MultiplyCircuit<F> {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn num_public_inputs(&self) -> usize {
        1
    }

    fn public_inputs(&self) -> Option<Vec<F>> {
        Some(vec![self.x? * self.y?])
    }

    fn synthesize(&self, cs: &mut ConstraintSystem<F>) -> Result<(), R1CSError> {
        let product = cs.public_input(0)?;
        let x = cs.allocate_variable(self.x)?;
        let y = cs.allocate_variable(self.y)?;
        cs.enforce_multiplication(x.into(), y.into(), product.into());
        Ok(())
    }
}

/// MiMC digest of a byte message as computed by [`PreimageCircuit`]
pub fn message_digest<F: FieldLike>(message: &[u8]) -> F {
    Mimc::new().hash(&pack_bytes(message))
}

/// Digest linking `prev` and `message` as computed by [`HashChainCircuit`]
pub fn chain_digest<F: FieldLike>(prev: F, message: &[u8]) -> F {
    let mut blocks = Vec::with_capacity(1 + num_packed_elements(message.len()));
    blocks.push(prev);
    blocks.extend(pack_bytes::<F>(message));
    Mimc::new().hash(&blocks)
}

fn check_message_len(message_len: usize, message: Option<&[u8]>) -> Result<(), R1CSError> {
    if message_len == 0 {
        return Err(R1CSError::InvalidParameter(
            "message length must be positive".to_string(),
        ));
    }
    match message {
        Some(m) if m.len() != message_len => Err(R1CSError::InvalidParameter(format!(
            "message is {} bytes, circuit expects {}",
            m.len(),
            message_len
        ))),
        _ => Ok(()),
    }
}

fn allocate_message<F: FieldLike>(
    cs: &mut ConstraintSystem<F>,
    message_len: usize,
    message: Option<&[u8]>,
) -> Result<Vec<LinearCombination<F>>, R1CSError> {
    let packed = message.map(pack_bytes::<F>);
    (0..num_packed_elements(message_len))
        .map(|i| {
            let value = packed.as_ref().and_then(|blocks| blocks.get(i).copied());
            cs.allocate_variable(value).map(LinearCombination::from)
        })
        .collect()
}

/// Proves knowledge of a `message_len`-byte message hashing to a public digest
#[derive(Debug, Clone)]
pub struct PreimageCircuit {
    message_len: usize,
    message: Option<Vec<u8>>,
}

impl PreimageCircuit {
    /// Instance with the message as witness
    pub fn new(message: Vec<u8>) -> Self {
        Self {
            message_len: message.len(),
            message: Some(message),
        }
    }

    /// Shape-only instance for messages of `message_len` bytes
    pub fn shape(message_len: usize) -> Self {
        Self {
            message_len,
            message: None,
        }
    }

    /// Fixed message length
    pub fn message_len(&self) -> usize {
        self.message_len
    }
}

impl<F: FieldLike> Circuit<F> for PreimageCircuit {
    fn name(&self) -> &'static str {
        "preimage"
    }

    fn num_public_inputs(&self) -> usize {
        1
    }

    fn public_inputs(&self) -> Option<Vec<F>> {
        self.message.as_deref().map(|m| vec![message_digest(m)])
    }

    fn synthesize(&self, cs: &mut ConstraintSystem<F>) -> Result<(), R1CSError> {
        check_message_len(self.message_len, self.message.as_deref())?;
        let digest = cs.public_input(0)?;
        let blocks = allocate_message(cs, self.message_len, self.message.as_deref())?;
        let computed = Mimc::new().hash_gadget(cs, &blocks)?;
        cs.enforce_equal(computed, digest.into());
        Ok(())
    }
}

/// Proves knowledge of a message linking public digests `[prev, curr]`
#[derive(Debug, Clone)]
pub struct HashChainCircuit<F: FieldLike> {
    message_len: usize,
    prev_digest: Option<F>,
    message: Option<Vec<u8>>,
}

impl<F: FieldLike> HashChainCircuit<F> {
    /// Instance extending `prev_digest` with `message`
    pub fn new(prev_digest: F, message: Vec<u8>) -> Self {
        Self {
            message_len: message.len(),
            prev_digest: Some(prev_digest),
            message: Some(message),
        }
    }

    /// Shape-only instance for messages of `message_len` bytes
    pub fn shape(message_len: usize) -> Self {
        Self {
            message_len,
            prev_digest: None,
            message: None,
        }
    }

    /// Fixed message length
    pub fn message_len(&self) -> usize {
        self.message_len
    }
}

impl<F: FieldLike> Circuit<F> for HashChainCircuit<F> {
    fn name(&self) -> &'static str {
        "hash-chain"
    }

    fn num_public_inputs(&self) -> usize {
        2
    }

    fn public_inputs(&self) -> Option<Vec<F>> {
        let prev = self.prev_digest?;
        let message = self.message.as_deref()?;
        Some(vec![prev, chain_digest(prev, message)])
    }

    fn synthesize(&self, cs: &mut ConstraintSystem<F>) -> Result<(), R1CSError> {
        check_message_len(self.message_len, self.message.as_deref())?;
        let prev = cs.public_input(0)?;
        let curr = cs.public_input(1)?;

        let mut blocks = vec![LinearCombination::from_variable(prev)];
        blocks.extend(allocate_message(cs, self.message_len, self.message.as_deref())?);
        let computed = Mimc::new().hash_gadget(cs, &blocks)?;
        cs.enforce_equal(computed, curr.into());
        Ok(())
    }
}
