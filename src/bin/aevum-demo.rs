#![forbid(unsafe_code)]
use aevumchain::blockchain::{Block, Blockchain};
use aevumchain::config::load_config;
use aevumchain::crypto::{KeyPair, Signer};
use aevumchain::miner::MiningOutcome;
use aevumchain::wallet::Wallet;
use aevumchain::{Amount, ChainError};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Runs the reference ledger scenario: a genesis reward, two transfers, one
/// rejected overdraft and a full chain validation.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "aevum.toml")]
    config: PathBuf,
    /// Overrides chain.difficulty from the configuration
    #[arg(long)]
    difficulty: Option<usize>,
    /// Print the final chain as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", "❌ Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = load_config(&cli.config)?;
    if let Some(difficulty) = cli.difficulty {
        config.chain.difficulty = difficulty;
    }

    let mut chain = Blockchain::new(&config)?;
    let issuer = KeyPair::generate()?;
    let wallet_a = Wallet::new(Some("wallet A".to_string()))?;
    let wallet_b = Wallet::new(Some("wallet B".to_string()))?;

    println!("{}", "AevumChain demo".bright_cyan().bold());
    println!("{}", "---------------".bright_cyan());
    println!(
        "difficulty {} | reward {} | minimum transfer {}",
        chain.params.difficulty,
        chain.params.miner_reward,
        chain.ledger.min_transaction()
    );
    println!();

    println!("{}", "⛏️  Creating and mining genesis block...".bright_white());
    chain.bootstrap_genesis(&issuer, &wallet_a.public_key())?;
    print_balances(&chain, &wallet_a, &wallet_b);

    let mut block1 = chain.next_block()?;
    transfer(&mut chain, &mut block1, &wallet_a, &wallet_b, 40)?;
    let outcome = chain.mint_block(block1, &issuer, &wallet_a.public_key())?;
    print_mined(&chain, &outcome);
    print_balances(&chain, &wallet_a, &wallet_b);

    let mut block2 = chain.next_block()?;
    transfer(&mut chain, &mut block2, &wallet_a, &wallet_b, 1000)?;
    let outcome = chain.mint_block(block2, &issuer, &wallet_a.public_key())?;
    print_mined(&chain, &outcome);
    print_balances(&chain, &wallet_a, &wallet_b);

    let mut block3 = chain.next_block()?;
    transfer(&mut chain, &mut block3, &wallet_b, &wallet_a, 20)?;
    let outcome = chain.mint_block(block3, &issuer, &wallet_b.public_key())?;
    print_mined(&chain, &outcome);
    print_balances(&chain, &wallet_a, &wallet_b);

    let valid = chain.is_valid();
    if valid {
        println!("{}", "✅ Blockchain is valid".green().bold());
    } else {
        println!("{}", "❌ Blockchain is NOT valid".red().bold());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&chain.blocks)?);
    }
    Ok(valid)
}

/// Builds and settles a transfer into `block`. Rejections are reported and
/// leave the block without the transaction; any other error aborts the run.
fn transfer(
    chain: &mut Blockchain,
    block: &mut Block,
    from: &Wallet,
    to: &Wallet,
    value: i32,
) -> Result<(), ChainError> {
    println!(
        "\n{} {} → {}: {}",
        "💸".bright_white(),
        from.label(),
        to.label(),
        value
    );
    let outcome = from
        .send_funds(&chain.ledger.utxos, &to.public_key(), Amount::from_num(value))
        .and_then(|tx| block.add_transaction(tx, &mut chain.ledger));

    match outcome {
        Ok(()) => {
            println!("   {}", "settled".green());
            Ok(())
        }
        Err(e) if e.is_rejection() => {
            println!("   {} {}", "rejected:".yellow(), e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn print_mined(chain: &Blockchain, outcome: &MiningOutcome) {
    if let Some(tail) = chain.tail() {
        println!(
            "   {} block {} mined: {} (nonce {}, {} attempts, {:?})",
            "⛏️".bright_white(),
            chain.height() - 1,
            tail.hash.bright_yellow(),
            outcome.nonce,
            outcome.attempts,
            outcome.elapsed
        );
    }
}

fn print_balances(chain: &Blockchain, a: &Wallet, b: &Wallet) {
    for wallet in [a, b] {
        println!(
            "   {:<10} {}",
            wallet.label().bright_cyan(),
            chain.balance_of(&wallet.public_key()).to_string().bright_green()
        );
    }
}
