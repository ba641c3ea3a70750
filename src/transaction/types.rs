/// Transaction types for AevumChain
use crate::crypto::{self, PublicKey, Signer};
use crate::error::ChainError;
use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point value type; exact sums keep the input/output balance check exact.
pub type Amount = I32F32;

/// Identifier shared by every reward-minting transaction.
pub const COINBASE_ID: &str = "0";

/// A value record owned by `recipient`. The id is a content hash of the other
/// three fields and is refreshed by every setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    id: String,
    recipient: PublicKey,
    value: Amount,
    parent_transaction_id: String,
}

impl TransactionOutput {
    pub fn new(recipient: PublicKey, value: Amount, parent_transaction_id: impl Into<String>) -> Self {
        let mut output = TransactionOutput {
            id: String::new(),
            recipient,
            value,
            parent_transaction_id: parent_transaction_id.into(),
        };
        output.id = output.compute_id();
        output
    }

    fn compute_id(&self) -> String {
        crypto::digest(format!(
            "{}{}{}",
            self.recipient.encode(),
            self.value,
            self.parent_transaction_id
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recipient(&self) -> &PublicKey {
        &self.recipient
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn parent_transaction_id(&self) -> &str {
        &self.parent_transaction_id
    }

    pub fn is_mine(&self, public_key: &PublicKey) -> bool {
        &self.recipient == public_key
    }

    pub fn set_recipient(&mut self, recipient: PublicKey) {
        self.recipient = recipient;
        self.id = self.compute_id();
    }

    pub fn set_value(&mut self, value: Amount) {
        self.value = value;
        self.id = self.compute_id();
    }

    pub fn set_parent_transaction_id(&mut self, parent_transaction_id: impl Into<String>) {
        self.parent_transaction_id = parent_transaction_id.into();
        self.id = self.compute_id();
    }
}

/// Reference to a prior output; `utxo` is filled in when the spending
/// transaction is settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub output_id: String,
    #[serde(default)]
    pub utxo: Option<TransactionOutput>,
}

impl TransactionInput {
    pub fn new(output_id: impl Into<String>) -> Self {
        TransactionInput {
            output_id: output_id.into(),
            utxo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<String>,
    pub sender: PublicKey,
    pub recipient: PublicKey,
    pub value: Amount,
    pub signature: Option<Vec<u8>>,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new(
        sender: PublicKey,
        recipient: PublicKey,
        value: Amount,
        inputs: Vec<TransactionInput>,
    ) -> Self {
        Transaction {
            id: None,
            sender,
            recipient,
            value,
            signature: None,
            inputs,
            outputs: Vec::new(),
        }
    }

    /// Builds a signed reward transaction paying `value` to `miner`.
    ///
    /// The transaction id is the coinbase sentinel; `salt` keeps the output id
    /// unique when the same miner is rewarded the same value twice.
    pub fn coinbase(
        issuer: &dyn Signer,
        miner: PublicKey,
        value: Amount,
        salt: &str,
    ) -> Result<Self, ChainError> {
        let mut tx = Transaction::new(issuer.public_key(), miner.clone(), value, Vec::new());
        tx.sign(issuer)?;
        tx.id = Some(COINBASE_ID.to_string());
        let parent = format!("{}:{}", COINBASE_ID, salt);
        tx.outputs.push(TransactionOutput::new(miner, value, parent));
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.id.as_deref() == Some(COINBASE_ID)
    }

    /// The payload covered by the signature: sender, recipient and value.
    pub fn signable_message(&self) -> Vec<u8> {
        format!(
            "{}{}{}",
            self.sender.encode(),
            self.recipient.encode(),
            self.value
        )
        .into_bytes()
    }

    pub fn sign(&mut self, signer: &dyn Signer) -> Result<(), ChainError> {
        let message = self.signable_message();
        self.signature = Some(signer.sign(&message)?);
        Ok(())
    }

    pub fn verify_signature(&self) -> bool {
        crypto::verify(
            &self.sender,
            &self.signable_message(),
            self.signature.as_deref(),
        )
    }

    /// Sum of the resolved inputs; unresolved inputs count as nothing.
    pub fn inputs_value(&self) -> Amount {
        self.inputs
            .iter()
            .filter_map(|input| input.utxo.as_ref())
            .map(|utxo| utxo.value())
            .sum()
    }

    pub fn outputs_value(&self) -> Amount {
        self.outputs.iter().map(|output| output.value()).sum()
    }

    /// Sequence-derived id: two identical payloads at different positions get
    /// different ids.
    pub(crate) fn derive_id(&self, sequence: u64) -> String {
        crypto::digest(format!(
            "{}{}{}{}",
            self.sender.encode(),
            self.recipient.encode(),
            self.value,
            sequence
        ))
    }
}
