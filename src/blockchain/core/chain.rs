use crate::config::Config;
use crate::crypto::{digest, PublicKey, Signer};
use crate::error::ChainError;
use crate::miner::{meets_difficulty, mine_block, CancelToken, MiningOutcome};
use crate::transaction::{Amount, Transaction, TransactionOutput};
use tracing::{info, warn};

use super::merkle::{merkle_root, OddLeafPolicy};
use super::state::Ledger;
use super::validation::validate_chain;

/// Previous-hash value of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub previous_hash: String,
    pub timestamp: u64,
    pub nonce: u64,
    pub merkle_root: String,
}

impl BlockHeader {
    pub fn hash(&self) -> String {
        digest(format!(
            "{}{}{}{}",
            self.previous_hash, self.timestamp, self.nonce, self.merkle_root
        ))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(previous_hash: String) -> Self {
        let header = BlockHeader {
            previous_hash,
            timestamp: u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default(),
            nonce: 0,
            merkle_root: String::new(),
        };
        let hash = header.hash();

        Block {
            header,
            hash,
            transactions: Vec::new(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.header.previous_hash == GENESIS_PREVIOUS_HASH
    }

    pub fn calculate_hash(&self) -> String {
        self.header.hash()
    }

    /// Root over the ids of the contained transactions; an id that has not
    /// been assigned contributes an empty string.
    pub fn calculate_merkle_root(&self, policy: OddLeafPolicy) -> String {
        let ids: Vec<&str> = self
            .transactions
            .iter()
            .map(|tx| tx.id.as_deref().unwrap_or_default())
            .collect();
        merkle_root(&ids, policy)
    }

    /// Adds a transaction, settling it against `ledger` unless this is the
    /// genesis block. A rejected transaction leaves the block unchanged.
    pub fn add_transaction(
        &mut self,
        mut transaction: Transaction,
        ledger: &mut Ledger,
    ) -> Result<(), ChainError> {
        if !self.is_genesis() {
            if let Err(e) = transaction.process(ledger) {
                warn!("Transaction failed to process ({}). Discarded.", e);
                return Err(e);
            }
        }
        self.transactions.push(transaction);
        Ok(())
    }

    /// Unbounded proof-of-work search. Use [`mine_block`] with a
    /// [`CancelToken`] when the search must be stoppable.
    pub fn mine(&mut self, difficulty: usize, policy: OddLeafPolicy) -> Result<MiningOutcome, ChainError> {
        mine_block(self, difficulty, policy, &CancelToken::new(), u64::MAX)
    }
}

/// Parameters fixed for the lifetime of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParams {
    pub difficulty: usize,
    pub miner_reward: Amount,
    pub merkle_policy: OddLeafPolicy,
    pub poll_interval: u64,
}

/// The chain context: blocks, the live ledger and the retained genesis
/// transaction. One value per run, passed by reference.
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub ledger: Ledger,
    pub params: ChainParams,
    genesis_transaction: Option<Transaction>,
    cancel: CancelToken,
}

impl Blockchain {
    pub fn new(config: &Config) -> Result<Self, ChainError> {
        config.validate()?;
        Ok(Blockchain {
            blocks: Vec::new(),
            ledger: Ledger::new(config.chain.min_transaction_amount()?),
            params: ChainParams {
                difficulty: config.chain.difficulty,
                miner_reward: config.chain.miner_reward_amount()?,
                merkle_policy: config.merkle.odd_leaf,
                poll_interval: config.mining.poll_interval,
            },
            genesis_transaction: None,
            cancel: CancelToken::new(),
        })
    }

    /// Token observed by every search this chain runs; cancel it from another
    /// thread to abort the current search. The flag is cleared when that
    /// search ends, so later mints run normally.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn height(&self) -> usize {
        self.blocks.len()
    }

    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn genesis_transaction(&self) -> Option<&Transaction> {
        self.genesis_transaction.as_ref()
    }

    pub fn balance_of(&self, owner: &PublicKey) -> Amount {
        self.ledger.balance_of(owner)
    }

    /// Creates block 0 holding one coinbase that pays the configured reward to
    /// `miner`, seeds the ledger with its output, then mines and appends it.
    pub fn bootstrap_genesis(
        &mut self,
        issuer: &dyn Signer,
        miner: &PublicKey,
    ) -> Result<&Transaction, ChainError> {
        if !self.blocks.is_empty() {
            return Err(ChainError::InvalidBlock(
                "Genesis block can only be created on an empty chain.".to_string(),
            ));
        }

        let mut genesis = Block::new(GENESIS_PREVIOUS_HASH.to_string());
        let coinbase = Transaction::coinbase(
            issuer,
            miner.clone(),
            self.params.miner_reward,
            GENESIS_PREVIOUS_HASH,
        )?;
        genesis.add_transaction(coinbase.clone(), &mut self.ledger)?;
        self.search(&mut genesis)?;
        self.append(genesis)?;

        self.ledger.utxos.put(coinbase.outputs[0].clone());
        info!(miner = %miner.short(), reward = %self.params.miner_reward, "Genesis block created");
        Ok(self.genesis_transaction.insert(coinbase))
    }

    /// A fresh block linked to the current tail.
    pub fn next_block(&self) -> Result<Block, ChainError> {
        let tail = self.tail().ok_or_else(|| {
            ChainError::InvalidBlock("Cannot extend an empty chain; create the genesis block first.".to_string())
        })?;
        Ok(Block::new(tail.hash.clone()))
    }

    /// Mints the block reward to `miner`, mines the block and appends it.
    ///
    /// The coinbase is pushed after the block's settled transactions, so nothing
    /// in the same block can spend it, and it is covered by the Merkle root.
    /// If the block cannot be appended (stale link, cancelled search) the
    /// transfers it settled are reverted, so the ledger never holds outputs
    /// that no block records.
    pub fn mint_block(
        &mut self,
        mut block: Block,
        issuer: &dyn Signer,
        miner: &PublicKey,
    ) -> Result<MiningOutcome, ChainError> {
        if block.is_genesis() {
            return Err(ChainError::InvalidBlock(
                "Use bootstrap_genesis for the genesis block.".to_string(),
            ));
        }

        let (outcome, reward) = match self.seal(&mut block, issuer, miner) {
            Ok(sealed) => sealed,
            Err(e) => {
                self.unsettle(&block);
                warn!("Block not minted ({}). Settled transfers reverted.", e);
                return Err(e);
            }
        };

        self.push_block(block);
        self.ledger.utxos.put(reward);
        info!(
            height = self.height() - 1,
            miner = %miner.short(),
            reward = %self.params.miner_reward,
            "Block reward minted"
        );
        Ok(outcome)
    }

    /// Adds the coinbase and mines `block` until it is ready to append.
    fn seal(
        &self,
        block: &mut Block,
        issuer: &dyn Signer,
        miner: &PublicKey,
    ) -> Result<(MiningOutcome, TransactionOutput), ChainError> {
        self.check_links_to_tail(block)?;

        let coinbase = Transaction::coinbase(
            issuer,
            miner.clone(),
            self.params.miner_reward,
            &block.header.previous_hash,
        )?;
        let reward = coinbase.outputs[0].clone();
        block.transactions.push(coinbase);

        let outcome = self.search(block)?;
        self.check_appendable(block)?;
        Ok((outcome, reward))
    }

    fn search(&self, block: &mut Block) -> Result<MiningOutcome, ChainError> {
        let result = mine_block(
            block,
            self.params.difficulty,
            self.params.merkle_policy,
            &self.cancel,
            self.params.poll_interval,
        );
        self.cancel.reset();
        result
    }

    /// Reverts the transfers `block` settled, newest first.
    fn unsettle(&mut self, block: &Block) {
        for tx in block.transactions.iter().rev().filter(|tx| !tx.is_coinbase()) {
            tx.revert(&mut self.ledger);
        }
    }

    /// Appends an already mined block. The block must link to the current tail
    /// and meet the chain's difficulty.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        self.check_appendable(&block)?;
        self.push_block(block);
        Ok(())
    }

    fn check_appendable(&self, block: &Block) -> Result<(), ChainError> {
        if block.is_genesis() {
            if !self.blocks.is_empty() {
                return Err(ChainError::InvalidBlock(
                    "Genesis block can only be applied to an empty chain.".to_string(),
                ));
            }
        } else {
            self.check_links_to_tail(block)?;
        }

        if block.hash != block.calculate_hash() {
            return Err(ChainError::InvalidBlock(format!(
                "Stored hash {} does not match its header.",
                block.hash
            )));
        }
        if !meets_difficulty(&block.hash, self.params.difficulty) {
            return Err(ChainError::InvalidBlock(
                "Invalid Proof-of-Work: block hash does not meet difficulty target.".to_string(),
            ));
        }
        Ok(())
    }

    fn push_block(&mut self, block: Block) {
        info!(height = self.blocks.len(), hash = %block.hash, transactions = block.transactions.len(), "Block appended");
        self.blocks.push(block);
    }

    fn check_links_to_tail(&self, block: &Block) -> Result<(), ChainError> {
        let tail = self.tail().ok_or_else(|| {
            ChainError::InvalidBlock("Cannot apply non-genesis block; the chain is empty.".to_string())
        })?;
        if block.header.previous_hash != tail.hash {
            return Err(ChainError::InvalidBlock(format!(
                "Invalid previous block hash. Expected {}, but got {}.",
                tail.hash, block.header.previous_hash
            )));
        }
        Ok(())
    }

    /// Replays the whole chain; see [`validate_chain`].
    pub fn validate(&self) -> Result<(), ChainError> {
        let genesis = self.genesis_transaction.as_ref().ok_or_else(|| ChainError::InvalidChain {
            height: 0,
            reason: "no genesis transaction".to_string(),
        })?;
        validate_chain(&self.blocks, genesis, self.params.difficulty, self.params.merkle_policy)
    }

    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Blockchain validation failed: {}", e);
                false
            }
        }
    }
}
