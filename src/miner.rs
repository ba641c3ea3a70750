//! Proof-of-work search over block nonces

use crate::blockchain::{Block, OddLeafPolicy};
use crate::error::ChainError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A hash has SHA-256's 64 hex characters; no more zeros can be demanded.
pub const MAX_DIFFICULTY: usize = 64;

/// Attempts between cancellation checks when the caller does not choose.
pub const DEFAULT_POLL_INTERVAL: u64 = 4096;

/// Shared stop flag for a running search. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clears the flag so the next search can run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningOutcome {
    pub nonce: u64,
    pub attempts: u64,
    pub elapsed: Duration,
}

pub fn hash_target(difficulty: usize) -> String {
    "0".repeat(difficulty)
}

pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Commits the block's Merkle root, then increments the nonce until the hash
/// has `difficulty` leading zeros.
///
/// `cancel` is polled every `poll_interval` attempts (including before the
/// first one); a cancelled search leaves the block with whatever nonce it
/// reached and returns `MiningCancelled`.
pub fn mine_block(
    block: &mut Block,
    difficulty: usize,
    policy: OddLeafPolicy,
    cancel: &CancelToken,
    poll_interval: u64,
) -> Result<MiningOutcome, ChainError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ChainError::Config(format!(
            "difficulty {} exceeds the {} characters of a block hash",
            difficulty, MAX_DIFFICULTY
        )));
    }
    let poll_interval = poll_interval.max(1);

    let start = Instant::now();
    block.header.merkle_root = block.calculate_merkle_root(policy);
    block.hash = block.header.hash();

    let mut attempts: u64 = 0;
    while !meets_difficulty(&block.hash, difficulty) {
        if attempts % poll_interval == 0 {
            if cancel.is_cancelled() {
                return Err(ChainError::MiningCancelled { attempts });
            }
            if attempts > 0 {
                debug!(attempts, nonce = block.header.nonce, "Mining in progress");
            }
        }
        block.header.nonce = block.header.nonce.wrapping_add(1);
        block.hash = block.header.hash();
        attempts += 1;
    }

    let outcome = MiningOutcome {
        nonce: block.header.nonce,
        attempts,
        elapsed: start.elapsed(),
    };
    info!(
        hash = %block.hash,
        nonce = outcome.nonce,
        attempts,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Block mined"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("000abc", 3));
        assert!(!meets_difficulty("00a0bc", 3));
        assert!(meets_difficulty("abc", 0));
        assert!(!meets_difficulty("00", 3));
        assert_eq!(hash_target(4), "0000");
    }

    #[test]
    fn test_mining_postcondition() {
        let mut block = Block::new("prev".to_string());
        let outcome = mine_block(
            &mut block,
            2,
            OddLeafPolicy::Drop,
            &CancelToken::new(),
            DEFAULT_POLL_INTERVAL,
        )
        .unwrap();

        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.header.hash());
        assert_eq!(outcome.nonce, block.header.nonce);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut block = Block::new("prev".to_string());
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = mine_block(&mut block, MAX_DIFFICULTY, OddLeafPolicy::Drop, &cancel, 1);
        assert_eq!(result, Err(ChainError::MiningCancelled { attempts: 0 }));
    }

    #[test]
    fn test_reset_clears_cancellation() {
        let cancel = CancelToken::new();
        let observer = cancel.clone();
        cancel.cancel();
        assert!(observer.is_cancelled());
        observer.reset();
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let mut block = Block::new("prev".to_string());
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let result = mine_block(&mut block, MAX_DIFFICULTY, OddLeafPolicy::Drop, &cancel, 64);
        handle.join().unwrap();
        assert!(matches!(result, Err(ChainError::MiningCancelled { .. })));
    }

    #[test]
    fn test_difficulty_above_hash_length_rejected() {
        let mut block = Block::new("prev".to_string());
        let result = mine_block(
            &mut block,
            MAX_DIFFICULTY + 1,
            OddLeafPolicy::Drop,
            &CancelToken::new(),
            DEFAULT_POLL_INTERVAL,
        );
        assert!(matches!(result, Err(ChainError::Config(_))));
    }
}
