//! Integration tests for the end-to-end ledger scenario

use aevumchain::blockchain::Blockchain;
use aevumchain::config::{load_config, Config};
use aevumchain::crypto::{KeyPair, Signer};
use aevumchain::wallet::Wallet;
use aevumchain::{Amount, ChainError};
use std::io::Write;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Helper to build a cheap-to-mine chain
fn test_chain() -> Result<Blockchain, Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.chain.difficulty = 2;
    Ok(Blockchain::new(&config)?)
}

fn amount(value: i32) -> Amount {
    Amount::from_num(value)
}

#[test]
fn test_reference_scenario() -> TestResult {
    let mut chain = test_chain()?;
    let issuer = KeyPair::generate()?;
    let wallet_a = Wallet::new(Some("A".to_string()))?;
    let wallet_b = Wallet::new(Some("B".to_string()))?;
    let a = wallet_a.public_key();
    let b = wallet_b.public_key();

    chain.bootstrap_genesis(&issuer, &a)?;
    assert_eq!(chain.balance_of(&a), amount(50));
    assert_eq!(chain.balance_of(&b), amount(0));

    // Block 1: A pays B 40; settlement is visible before the block is mined.
    let mut block = chain.next_block()?;
    let tx = wallet_a.send_funds(&chain.ledger.utxos, &b, amount(40))?;
    block.add_transaction(tx, &mut chain.ledger)?;
    assert_eq!(chain.balance_of(&a), amount(10));
    assert_eq!(chain.balance_of(&b), amount(40));
    chain.mint_block(block, &issuer, &a)?;
    assert_eq!(chain.balance_of(&a), amount(60));

    // Block 2: A overdraws and is rejected without touching the ledger.
    let mut block = chain.next_block()?;
    let utxo_count = chain.ledger.utxos.len();
    let result = wallet_a.send_funds(&chain.ledger.utxos, &b, amount(1000));
    assert_eq!(
        result,
        Err(ChainError::InsufficientFunds {
            balance: amount(60),
            requested: amount(1000),
        })
    );
    assert_eq!(chain.ledger.utxos.len(), utxo_count);
    assert!(block.transactions.is_empty());
    chain.mint_block(block, &issuer, &a)?;
    assert_eq!(chain.balance_of(&a), amount(110));
    assert_eq!(chain.balance_of(&b), amount(40));

    // Block 3: B pays A 20 and earns the reward.
    let mut block = chain.next_block()?;
    let tx = wallet_b.send_funds(&chain.ledger().utxos, &a, amount(20))?;
    block.add_transaction(tx, chain.ledger_mut())?;
    chain.mint_block(block, &issuer, &b)?;
    assert_eq!(chain.balance_of(&a), amount(130));
    assert_eq!(chain.balance_of(&b), amount(70));

    assert_eq!(chain.height(), 4);
    assert!(chain.is_valid());
    Ok(())
}

#[test]
fn test_spending_rewards_across_blocks() -> TestResult {
    let mut chain = test_chain()?;
    let issuer = KeyPair::generate()?;
    let miner = Wallet::new(Some("miner".to_string()))?;
    let payee = Wallet::new(None)?;

    chain.bootstrap_genesis(&issuer, &miner.public_key())?;
    for _ in 0..2 {
        let block = chain.next_block()?;
        chain.mint_block(block, &issuer, &miner.public_key())?;
    }
    // Three equal rewards must remain three distinct outputs.
    assert_eq!(chain.ledger.utxos.owned_by(&miner.public_key()).len(), 3);
    assert_eq!(chain.balance_of(&miner.public_key()), amount(150));

    let mut block = chain.next_block()?;
    let tx = miner.send_funds(&chain.ledger.utxos, &payee.public_key(), amount(120))?;
    assert_eq!(tx.inputs.len(), 3);
    block.add_transaction(tx, &mut chain.ledger)?;
    chain.mint_block(block, &issuer, &payee.public_key())?;

    assert_eq!(chain.balance_of(&miner.public_key()), amount(30));
    assert_eq!(chain.balance_of(&payee.public_key()), amount(170));
    assert!(chain.is_valid());
    Ok(())
}

#[test]
fn test_tampering_after_the_fact_is_detected() -> TestResult {
    let mut chain = test_chain()?;
    let issuer = KeyPair::generate()?;
    let wallet_a = Wallet::new(None)?;
    let wallet_b = Wallet::new(None)?;

    chain.bootstrap_genesis(&issuer, &wallet_a.public_key())?;
    let mut block = chain.next_block()?;
    let tx = wallet_a.send_funds(&chain.ledger.utxos, &wallet_b.public_key(), amount(40))?;
    block.add_transaction(tx, &mut chain.ledger)?;
    chain.mint_block(block, &issuer, &wallet_a.public_key())?;
    assert!(chain.is_valid());

    chain.blocks[1].transactions[0].value = amount(45);
    assert!(!chain.is_valid());
    assert!(matches!(
        chain.validate(),
        Err(ChainError::InvalidChain { height: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_configured_chain_from_file() -> TestResult {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        "[chain]\ndifficulty = 1\nminer_reward = 25.0\n\n[merkle]\nodd_leaf = \"duplicate\""
    )?;
    let config = load_config(file.path())?;
    let mut chain = Blockchain::new(&config)?;

    let issuer = KeyPair::generate()?;
    let wallet_a = Wallet::new(None)?;
    let wallet_b = Wallet::new(None)?;
    chain.bootstrap_genesis(&issuer, &wallet_a.public_key())?;
    assert_eq!(chain.balance_of(&wallet_a.public_key()), amount(25));

    let mut block = chain.next_block()?;
    let tx = wallet_a.send_funds(&chain.ledger.utxos, &wallet_b.public_key(), amount(5))?;
    block.add_transaction(tx, &mut chain.ledger)?;
    chain.mint_block(block, &issuer, &wallet_b.public_key())?;

    assert!(chain.blocks.iter().all(|b| b.hash.starts_with('0')));
    assert_eq!(chain.balance_of(&wallet_b.public_key()), amount(30));
    assert!(chain.is_valid());
    Ok(())
}
