use crate::{Amount, Error, KeyPair, Result, Sha256, UtxoId};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::convert::{TryFrom, TryInto};
use std::fmt::{Display, Formatter};

const PUBLIC_KEY_BYTE_COUNT: usize = 32;

/// A double SHA-256 hash of the transaction data.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize)]
pub struct TransactionId(Sha256);

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TransactionId {
    pub const fn new(data: Sha256) -> Self {
        Self(data)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(Sha256::from_hex(s)?))
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// The position of an output within the transaction that created it, the first one is 0.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize)]
pub struct OutputIndex(u32);

impl Display for OutputIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OutputIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

/// An Ed25519 public key that owns transaction outputs.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKey([u8; PUBLIC_KEY_BYTE_COUNT]);

impl PublicKey {
    pub const fn new(bytes: [u8; PUBLIC_KEY_BYTE_COUNT]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let raw: [u8; PUBLIC_KEY_BYTE_COUNT] =
            bytes.try_into().map_err(|_| Error::InvalidLength {
                expected: PUBLIC_KEY_BYTE_COUNT,
                actual,
            })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_BYTE_COUNT] {
        &self.0
    }

    /// Decodes the key as a curve point. Not every 32-byte string is a valid key.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        Ok(VerifyingKey::from_bytes(&self.0)?)
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    // A pointer to the transaction containing the UTXO to be spent.
    utxo_id: TransactionId,
    // The number of the UTXO to be spent, the first one is 0.
    output_index: OutputIndex,
    // Signature by the owner of the referenced output over the signing message of this input.
    signature: Vec<u8>,
}

impl Display for TransactionInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.utxo_id, self.output_index)
    }
}

impl TransactionInput {
    pub fn new(utxo_id: TransactionId, output_index: OutputIndex) -> Self {
        Self {
            utxo_id,
            output_index,
            signature: Vec::new(),
        }
    }

    pub fn utxo_id(&self) -> &TransactionId {
        &self.utxo_id
    }

    pub fn output_index(&self) -> &OutputIndex {
        &self.output_index
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Identity of the unspent output this input claims.
    pub fn utxo(&self) -> UtxoId {
        UtxoId::new(self.utxo_id, self.output_index)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    owner: PublicKey,
    amount: Amount,
}

impl Display for TransactionOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.amount, self.owner)
    }
}

impl TransactionOutput {
    pub fn new(owner: PublicKey, amount: Amount) -> Self {
        Self { owner, amount }
    }

    pub fn owner(&self) -> &PublicKey {
        &self.owner
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// The part of a transaction committed to by the signature of a single input.
#[derive(Serialize)]
struct SigningPayload<'a> {
    utxo_id: &'a TransactionId,
    output_index: &'a OutputIndex,
    outputs: &'a [TransactionOutput],
}

/// Everything that contributes to the transaction id, signatures included.
#[derive(Serialize)]
struct TransactionPayload<'a> {
    inputs: &'a [TransactionInput],
    outputs: &'a [TransactionOutput],
}

fn signing_message(
    inputs: &[TransactionInput],
    outputs: &[TransactionOutput],
    index: usize,
) -> Result<Vec<u8>> {
    let input = inputs.get(index).ok_or(Error::InputIndexOutOfRange {
        index,
        len: inputs.len(),
    })?;
    let payload = SigningPayload {
        utxo_id: &input.utxo_id,
        output_index: &input.output_index,
        outputs,
    };
    Ok(bincode::serialize(&payload)?)
}

/// An immutable transaction. Use [`TransactionBuilder`] to create and sign one.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Transaction {
    id: TransactionId,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn inputs(&self) -> &Vec<TransactionInput> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Vec<TransactionOutput> {
        &self.outputs
    }

    /// The bytes the owner of the output claimed by input `index` must sign: the claimed
    /// output reference followed by every output of this transaction.
    pub fn signing_message(&self, index: usize) -> Result<Vec<u8>> {
        signing_message(&self.inputs, &self.outputs, index)
    }

    /// The identity the output at `index` receives once this transaction is accepted.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit into an [`OutputIndex`]. Built transactions have at
    /// most `u32::MAX + 1` outputs, so every position of an existing output fits.
    pub fn output_utxo(&self, index: usize) -> UtxoId {
        match u32::try_from(index) {
            Ok(index) => UtxoId::new(self.id, OutputIndex::new(index)),
            Err(_) => panic!("Output index: {} does not fit into 32 bits", index),
        }
    }

    pub fn output_total(&self) -> i128 {
        Amount::total(self.outputs.iter().map(TransactionOutput::amount))
    }

    fn hash_transaction_data(
        inputs: &[TransactionInput],
        outputs: &[TransactionOutput],
    ) -> Result<TransactionId> {
        let data = bincode::serialize(&TransactionPayload { inputs, outputs })?;
        Ok(TransactionId(Sha256::double_digest(&data)))
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] -> [{}]",
            self.id,
            self.inputs
                .iter()
                .map(TransactionInput::to_string)
                .collect::<Vec<String>>()
                .join(", "),
            self.outputs
                .iter()
                .map(TransactionOutput::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

/// Assembles a transaction. Inputs are signed after all outputs are added, because every
/// signing message commits to the full list of outputs.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, utxo_id: TransactionId, output_index: OutputIndex) -> Self {
        self.inputs.push(TransactionInput::new(utxo_id, output_index));
        self
    }

    /// Adds an input claiming the given unspent output.
    pub fn spend(self, utxo: &UtxoId) -> Self {
        self.input(*utxo.transaction_id(), *utxo.output_index())
    }

    pub fn output(mut self, owner: PublicKey, amount: Amount) -> Self {
        self.outputs.push(TransactionOutput::new(owner, amount));
        self
    }

    pub fn signing_message(&self, index: usize) -> Result<Vec<u8>> {
        signing_message(&self.inputs, &self.outputs, index)
    }

    /// Attaches an externally produced signature to input `index`.
    pub fn signature(mut self, index: usize, signature: Vec<u8>) -> Result<Self> {
        let len = self.inputs.len();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(Error::InputIndexOutOfRange { index, len })?;
        input.signature = signature;
        Ok(self)
    }

    /// Signs input `index` with the given key pair.
    pub fn sign(self, index: usize, key_pair: &KeyPair) -> Result<Self> {
        let message = self.signing_message(index)?;
        let signature = key_pair.sign(&message);
        self.signature(index, signature)
    }

    pub fn build(self) -> Result<Transaction> {
        if self.outputs.len() as u64 > u32::MAX as u64 + 1 {
            return Err(Error::TooManyOutputs(self.outputs.len()));
        }
        let id = Transaction::hash_transaction_data(&self.inputs, &self.outputs)?;
        Ok(Transaction {
            id,
            inputs: self.inputs,
            outputs: self.outputs,
        })
    }
}
