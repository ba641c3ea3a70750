/// Settlement of a transaction against the live ledger
use crate::blockchain::Ledger;
use crate::error::ChainError;
use crate::transaction::types::{Amount, Transaction, TransactionOutput};
use std::collections::HashSet;
use tracing::{debug, warn};

impl Transaction {
    /// Settles this transaction against `ledger`.
    ///
    /// On success the transaction carries an id, its resolved inputs and two
    /// outputs (payment, then change), and the ledger has swapped the consumed
    /// outputs for the new ones. On error neither the ledger nor the
    /// transaction has changed.
    pub fn process(&mut self, ledger: &mut Ledger) -> Result<(), ChainError> {
        if !self.verify_signature() {
            warn!("Transaction signature failed to verify");
            return Err(ChainError::InvalidSignature);
        }
        if self.value < Amount::ZERO {
            warn!(value = %self.value, "Transaction value is negative");
            return Err(ChainError::NegativeValue(self.value));
        }

        let mut resolved = Vec::with_capacity(self.inputs.len());
        let mut seen = HashSet::new();
        for input in &self.inputs {
            let spendable = if seen.insert(input.output_id.as_str()) {
                ledger.utxos.get(&input.output_id)
            } else {
                None
            };
            match spendable {
                Some(output) => resolved.push(output.clone()),
                None => {
                    warn!(output_id = %input.output_id, "Referenced input is not spendable");
                    return Err(ChainError::UnresolvedInput(input.output_id.clone()));
                }
            }
        }

        let inputs_value: Amount = resolved.iter().map(|o| o.value()).sum();
        if self.id.is_none() && inputs_value < ledger.min_transaction() {
            warn!(%inputs_value, "Transaction inputs too small");
            return Err(ChainError::BelowMinimumTransfer {
                total: inputs_value,
                minimum: ledger.min_transaction(),
            });
        }

        let change = inputs_value - self.value;
        let id = match &self.id {
            Some(id) => id.clone(),
            None => {
                let sequence = ledger.next_sequence();
                self.derive_id(sequence)
            }
        };

        for (input, output) in self.inputs.iter_mut().zip(resolved) {
            input.utxo = Some(output);
        }
        self.outputs = vec![
            TransactionOutput::new(self.recipient.clone(), self.value, id.clone()),
            TransactionOutput::new(self.sender.clone(), change, id.clone()),
        ];
        self.id = Some(id);

        for output in &self.outputs {
            ledger.utxos.put(output.clone());
        }
        for input in &self.inputs {
            ledger.utxos.remove(&input.output_id);
        }

        debug!(
            id = self.id.as_deref().unwrap_or_default(),
            value = %self.value,
            %change,
            "Transaction settled"
        );
        Ok(())
    }

    /// Undoes a successful [`process`](Self::process): drops the produced
    /// outputs and restores the consumed ones. Transactions settled after this
    /// one must be reverted first.
    pub(crate) fn revert(&self, ledger: &mut Ledger) {
        for output in &self.outputs {
            ledger.utxos.remove(output.id());
        }
        for input in &self.inputs {
            if let Some(utxo) = &input.utxo {
                ledger.utxos.put(utxo.clone());
            }
        }
        debug!(id = self.id.as_deref().unwrap_or_default(), "Transaction settlement reverted");
    }
}
