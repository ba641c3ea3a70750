//! Wallet operations and UTXO selection

use crate::blockchain::UtxoSet;
use crate::crypto::{KeyPair, PublicKey, Signer};
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction, TransactionInput};
use tracing::warn;

/// A named keypair that reads the ledger to find its spendable outputs.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub name: Option<String>,
    keypair: KeyPair,
}

impl Wallet {
    pub fn new(name: Option<String>) -> Result<Self, ChainError> {
        Ok(Wallet {
            name,
            keypair: KeyPair::generate()?,
        })
    }

    pub fn from_keypair(name: Option<String>, keypair: KeyPair) -> Self {
        Wallet { name, keypair }
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("wallet")
    }

    pub fn balance(&self, utxos: &UtxoSet) -> Amount {
        utxos.balance_of(&self.public_key())
    }

    /// Builds and signs a transfer of `value` to `recipient`.
    ///
    /// Inputs are gathered in ascending output-id order until they cover
    /// `value`. The ledger is only read; the transaction still has to be
    /// settled by adding it to a block.
    pub fn send_funds(
        &self,
        utxos: &UtxoSet,
        recipient: &PublicKey,
        value: Amount,
    ) -> Result<Transaction, ChainError> {
        let owner = self.public_key();
        let balance = utxos.balance_of(&owner);
        if balance < value {
            warn!(wallet = self.label(), %balance, requested = %value, "Not enough funds to send transaction");
            return Err(ChainError::InsufficientFunds {
                balance,
                requested: value,
            });
        }

        let mut gathered = Amount::from_num(0);
        let mut inputs = Vec::new();
        for output in utxos.owned_by(&owner) {
            gathered += output.value();
            inputs.push(TransactionInput::new(output.id()));
            if gathered >= value {
                break;
            }
        }

        let mut transaction = Transaction::new(owner, recipient.clone(), value, inputs);
        transaction.sign(&self.keypair)?;
        Ok(transaction)
    }
}

impl Signer for Wallet {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ChainError> {
        self.keypair.sign(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Ledger;
    use crate::transaction::TransactionOutput;

    fn funded(wallet: &Wallet, values: &[f64]) -> Ledger {
        let mut ledger = Ledger::new(Amount::from_num(0.1));
        for (i, value) in values.iter().enumerate() {
            ledger.utxos.put(TransactionOutput::new(
                wallet.public_key(),
                Amount::from_num(*value),
                format!("seed{}", i),
            ));
        }
        ledger
    }

    #[test]
    fn test_wallets_have_distinct_keys() {
        let alice = Wallet::new(Some("alice".to_string())).unwrap();
        let bob = Wallet::new(Some("bob".to_string())).unwrap();
        assert_ne!(alice.public_key(), bob.public_key());
        assert_eq!(alice.label(), "alice");
    }

    #[test]
    fn test_balance_reads_ledger() {
        let alice = Wallet::new(None).unwrap();
        let ledger = funded(&alice, &[10.0, 2.5]);
        assert_eq!(alice.balance(&ledger.utxos), Amount::from_num(12.5));
    }

    #[test]
    fn test_send_funds_insufficient() {
        let alice = Wallet::new(None).unwrap();
        let bob = Wallet::new(None).unwrap();
        let ledger = funded(&alice, &[10.0]);

        let result = alice.send_funds(&ledger.utxos, &bob.public_key(), Amount::from_num(1000));
        assert_eq!(
            result,
            Err(ChainError::InsufficientFunds {
                balance: Amount::from_num(10),
                requested: Amount::from_num(1000),
            })
        );
    }

    #[test]
    fn test_send_funds_gathers_enough_inputs() {
        let alice = Wallet::new(None).unwrap();
        let bob = Wallet::new(None).unwrap();
        let mut ledger = funded(&alice, &[5.0, 5.0, 5.0]);

        let mut tx = alice
            .send_funds(&ledger.utxos, &bob.public_key(), Amount::from_num(8))
            .unwrap();
        assert_eq!(tx.inputs.len(), 2);
        assert!(tx.verify_signature());
        // Building the transaction does not touch the ledger.
        assert_eq!(ledger.utxos.len(), 3);

        tx.process(&mut ledger).unwrap();
        assert_eq!(alice.balance(&ledger.utxos), Amount::from_num(7));
        assert_eq!(bob.balance(&ledger.utxos), Amount::from_num(8));
    }
}
