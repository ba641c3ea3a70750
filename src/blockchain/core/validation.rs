use crate::error::ChainError;
use crate::miner::{hash_target, meets_difficulty};
use crate::transaction::Transaction;
use tracing::debug;

use super::chain::Block;
use super::merkle::OddLeafPolicy;
use super::state::UtxoSet;

fn invalid(height: usize, reason: impl Into<String>) -> ChainError {
    ChainError::InvalidChain {
        height,
        reason: reason.into(),
    }
}

/// Replays `blocks` from block 1 against a fresh UTXO snapshot seeded only with
/// the genesis transaction's first output. Block 0 is trusted.
///
/// The first violated invariant is returned; nothing is repaired or skipped.
pub fn validate_chain(
    blocks: &[Block],
    genesis_transaction: &Transaction,
    difficulty: usize,
    policy: OddLeafPolicy,
) -> Result<(), ChainError> {
    let target = hash_target(difficulty);
    let mut snapshot = UtxoSet::new();
    let seed = genesis_transaction
        .outputs
        .first()
        .ok_or_else(|| invalid(0, "genesis transaction has no output"))?;
    snapshot.put(seed.clone());

    for (height, pair) in blocks.windows(2).enumerate().map(|(i, w)| (i + 1, w)) {
        let (previous, current) = (&pair[0], &pair[1]);

        if current.hash != current.calculate_hash() {
            return Err(invalid(height, "current hashes not equal"));
        }
        if current.header.previous_hash != previous.hash {
            return Err(invalid(height, "previous hashes not equal"));
        }
        if !meets_difficulty(&current.hash, difficulty) {
            return Err(invalid(
                height,
                format!("block hasn't been mined (target {})", target),
            ));
        }
        if current.header.merkle_root != current.calculate_merkle_root(policy) {
            return Err(invalid(height, "merkle root does not match transactions"));
        }

        for tx in &current.transactions {
            validate_transaction(height, tx, &mut snapshot)?;
        }
        debug!(height, "Block verified");
    }

    Ok(())
}

fn validate_transaction(height: usize, tx: &Transaction, snapshot: &mut UtxoSet) -> Result<(), ChainError> {
    let tx_label = tx.id.as_deref().unwrap_or("<unassigned>");

    if !tx.verify_signature() {
        return Err(invalid(height, format!("signature on transaction {} is invalid", tx_label)));
    }
    if !tx.is_coinbase() && tx.inputs_value() != tx.outputs_value() {
        return Err(invalid(
            height,
            format!("inputs are not equal to outputs on transaction {}", tx_label),
        ));
    }

    if !tx.is_coinbase() {
        for input in &tx.inputs {
            let Some(recorded) = snapshot.get(&input.output_id) else {
                return Err(invalid(
                    height,
                    format!("referenced input {} on transaction {} is missing", input.output_id, tx_label),
                ));
            };
            let resolved_value = input.utxo.as_ref().map(|utxo| utxo.value());
            if resolved_value != Some(recorded.value()) {
                return Err(invalid(
                    height,
                    format!("referenced input {} on transaction {} has an invalid value", input.output_id, tx_label),
                ));
            }
            snapshot.remove(&input.output_id);
        }
    }

    for output in &tx.outputs {
        snapshot.put(output.clone());
    }

    let expected_outputs = if tx.is_coinbase() { 1 } else { 2 };
    if tx.outputs.len() != expected_outputs {
        return Err(invalid(
            height,
            format!(
                "transaction {} has {} outputs, expected {}",
                tx_label,
                tx.outputs.len(),
                expected_outputs
            ),
        ));
    }
    match tx.outputs.first() {
        Some(payment) if payment.recipient() == &tx.recipient => {
            if payment.value() != tx.value {
                return Err(invalid(
                    height,
                    format!("output value on transaction {} does not match the transfer", tx_label),
                ));
            }
        }
        _ => {
            return Err(invalid(
                height,
                format!("output recipient on transaction {} is not correct", tx_label),
            ))
        }
    }
    if !tx.is_coinbase() {
        match tx.outputs.get(1) {
            Some(change) if change.recipient() == &tx.sender => {}
            _ => {
                return Err(invalid(
                    height,
                    format!("change output on transaction {} is not the sender", tx_label),
                ))
            }
        }
    }

    Ok(())
}
