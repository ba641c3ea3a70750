use crate::crypto::PublicKey;
use crate::transaction::{Amount, TransactionOutput};
use std::collections::HashMap;

/// All currently spendable outputs, keyed by output id.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UtxoSet {
    outputs: HashMap<String, TransactionOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, output: TransactionOutput) {
        self.outputs.insert(output.id().to_string(), output);
    }

    pub fn get(&self, id: &str) -> Option<&TransactionOutput> {
        self.outputs.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<TransactionOutput> {
        self.outputs.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.outputs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionOutput> {
        self.outputs.values()
    }

    /// Outputs owned by `owner`, sorted by id so callers select inputs
    /// deterministically.
    pub fn owned_by(&self, owner: &PublicKey) -> Vec<&TransactionOutput> {
        let mut owned: Vec<_> = self.iter().filter(|o| o.is_mine(owner)).collect();
        owned.sort_by(|a, b| a.id().cmp(b.id()));
        owned
    }

    pub fn balance_of(&self, owner: &PublicKey) -> Amount {
        self.iter()
            .filter(|o| o.is_mine(owner))
            .map(|o| o.value())
            .sum()
    }
}

/// The settlement context: the UTXO set, the transaction sequence counter and
/// the minimum-transfer floor. Passed by `&mut` to every operation that settles.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ledger {
    pub utxos: UtxoSet,
    sequence: u64,
    min_transaction: Amount,
}

impl Ledger {
    pub fn new(min_transaction: Amount) -> Self {
        Ledger {
            utxos: UtxoSet::new(),
            sequence: 0,
            min_transaction,
        }
    }

    pub fn min_transaction(&self) -> Amount {
        self.min_transaction
    }

    /// Next value of the monotonic transaction counter.
    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn balance_of(&self, owner: &PublicKey) -> Amount {
        self.utxos.balance_of(owner)
    }
}
