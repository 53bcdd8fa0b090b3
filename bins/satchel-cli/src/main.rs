//! satchel: command-line interface for the Satchel single-address wallet.
//!
//! Wallet state lives in a JSON preferences file under the data directory.
//! Network access goes through the BlockCypher API. Configuration comes
//! from `SATCHEL_*` environment variables; see [`config::Config`].

mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use satchel_core::constants::COIN;
use satchel_core::fee::estimate_fee;
use satchel_core::types::PaymentRequest;
use satchel_ledger::BlockCypher;
use satchel_wallet::{JsonFilePreferences, Wallet, WalletError, allocate};

use crate::config::Config;

/// Single-address Bitcoin wallet.
#[derive(Parser)]
#[command(name = "satchel")]
#[command(version, about = "Single-address Bitcoin wallet")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new random key, replacing any existing one.
    Generate(GenerateArgs),
    /// Replace the wallet key with a WIF private key.
    Import(ImportArgs),
    /// Show the wallet address.
    Address,
    /// Show the cached balance, then the live balance.
    Balance,
    /// List spendable outputs.
    Unspent,
    /// Set, change or remove the wallet password.
    Password,
    /// Pay one or more destinations.
    Send(SendArgs),
    /// Estimate the fee for a transaction shape.
    Fee(FeeArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Overwrite an existing wallet.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct ImportArgs {
    /// WIF private key. If not provided, will prompt securely.
    #[arg(long)]
    wif: Option<String>,
}

#[derive(Args)]
struct SendArgs {
    /// Payments as ADDRESS:SATOSHIS, highest priority first.
    #[arg(required = true, value_parser = parse_payment)]
    payments: Vec<PaymentRequest>,

    /// Show what would be sent without signing or broadcasting.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct FeeArgs {
    /// Number of inputs.
    #[arg(short, long)]
    inputs: usize,

    /// Number of outputs.
    #[arg(short, long, default_value = "2")]
    outputs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Fee(args) = &cli.command {
        return fee(args);
    }

    let config = Config::from_env()?;
    let mut wallet = open_wallet(&config)?;

    match cli.command {
        Commands::Generate(args) => generate(&mut wallet, args).await,
        Commands::Import(args) => import(&mut wallet, args).await,
        Commands::Address => address(&mut wallet).await,
        Commands::Balance => balance(&mut wallet).await,
        Commands::Unspent => unspent(&mut wallet).await,
        Commands::Password => password(&mut wallet).await,
        Commands::Send(args) => send(&mut wallet, args).await,
        Commands::Fee(_) => Ok(()),
    }
}

fn open_wallet(config: &Config) -> Result<Wallet> {
    let prefs = Arc::new(JsonFilePreferences::new(config.preferences_path()));
    let ledger = BlockCypher::new(&config.wallet.api_url(), config.wallet.http_timeout)
        .context("Failed to build HTTP client")?;
    Ok(Wallet::new(config.wallet.clone(), prefs, Arc::new(ledger)))
}

/// Restore the saved wallet, failing with a hint if there is none.
async fn restore(wallet: &mut Wallet) -> Result<()> {
    match wallet.restore().await {
        Err(WalletError::NoAddress) => {
            bail!("No wallet found. Run `satchel generate` or `satchel import` first.")
        }
        other => other.context("Failed to load wallet"),
    }
}

/// Restore if a wallet exists. Returns whether one did.
async fn try_restore(wallet: &mut Wallet) -> Result<bool> {
    match wallet.restore().await {
        Ok(()) => Ok(true),
        Err(WalletError::NoAddress) => Ok(false),
        Err(e) => Err(e).context("Failed to load wallet"),
    }
}

async fn generate(wallet: &mut Wallet, args: GenerateArgs) -> Result<()> {
    if try_restore(wallet).await? && !args.force {
        bail!(
            "A wallet already exists ({}). Use --force to replace it.",
            wallet.address().unwrap_or_default()
        );
    }
    let address = wallet
        .generate_address()
        .await
        .context("Failed to generate wallet")?;

    println!("\n=== WALLET CREATED ===");
    println!("Address: {address}");
    println!("\nThe private key is stored unencrypted. Run `satchel password` to protect it.");
    Ok(())
}

async fn import(wallet: &mut Wallet, args: ImportArgs) -> Result<()> {
    try_restore(wallet).await?;
    let wif = match args.wif {
        Some(wif) => wif,
        None => prompt_password("WIF private key")?,
    };
    let password = if wallet.is_encrypted() {
        prompt_password("Current wallet password")?
    } else {
        String::new()
    };

    let address = wallet
        .import_address(&password, &wif)
        .await
        .context("Failed to import key")?;
    println!("Imported address: {address}");
    Ok(())
}

async fn address(wallet: &mut Wallet) -> Result<()> {
    restore(wallet).await?;
    println!("{}", wallet.address().unwrap_or_default());
    Ok(())
}

async fn balance(wallet: &mut Wallet) -> Result<()> {
    restore(wallet).await?;
    println!("Cached: {}", format_btc(wallet.balance()));
    if let Some(live) = wallet
        .refresh_balance()
        .await
        .context("Failed to fetch balance")?
    {
        println!("Live:   {}", format_btc(live));
    }
    Ok(())
}

async fn unspent(wallet: &mut Wallet) -> Result<()> {
    restore(wallet).await?;
    let outputs = wallet
        .unspent_outputs()
        .await
        .context("Failed to fetch unspent outputs")?;
    if outputs.is_empty() {
        println!("No unspent outputs.");
        return Ok(());
    }
    for utxo in &outputs {
        println!("{}:{}  {}", utxo.tx_hash, utxo.output_index, format_btc(utxo.value));
    }
    let total: u64 = outputs.iter().map(|u| u.value).sum();
    println!("Total: {} in {} outputs", format_btc(total), outputs.len());
    Ok(())
}

async fn password(wallet: &mut Wallet) -> Result<()> {
    restore(wallet).await?;
    let old = if wallet.is_encrypted() {
        prompt_password("Current password")?
    } else {
        String::new()
    };
    if !wallet.validate_password(&old) {
        bail!("Incorrect password");
    }

    let new = prompt_password("New password (empty to remove)")?;
    let confirm = prompt_password("Confirm new password")?;
    if new != confirm {
        bail!("Passwords do not match");
    }

    wallet
        .update_password(&old, &new)
        .await
        .context("Failed to update password")?;
    if new.is_empty() {
        println!("Password removed. The private key is stored unencrypted.");
    } else {
        println!("Password updated.");
    }
    Ok(())
}

async fn send(wallet: &mut Wallet, args: SendArgs) -> Result<()> {
    restore(wallet).await?;

    let plan = wallet
        .plan_send(&args.payments)
        .await
        .context("Failed to plan transaction")?;

    println!("\n=== TRANSACTION ===");
    println!("Inputs: {} ({})", plan.inputs.len(), format_btc(plan.total_inputs()));
    for payment in &plan.payments {
        println!("Pay:    {} to {}", format_btc(payment.amount), payment.address);
    }
    if let Some(change) = &plan.change {
        println!("Change: {}", format_btc(change.amount));
    }
    println!("Fee:    {}", format_btc(plan.fee));
    let skipped = args.payments.len() - plan.payments.len();
    if skipped > 0 {
        println!("Skipped: {skipped} payment(s) (dust or insufficient funds)");
    }

    if args.dry_run {
        let minimal = allocate(&args.payments, &plan.inputs);
        println!(
            "\nA minimal selection would use {} of {} inputs.",
            minimal.selected_inputs.len(),
            plan.inputs.len()
        );
        return Ok(());
    }

    let password = if wallet.is_encrypted() {
        prompt_password("Wallet password")?
    } else {
        String::new()
    };
    let txid = wallet
        .send(args.payments, &password)?
        .await
        .context("Failed to send transaction")?;

    println!("\nTransaction sent: {txid}");
    Ok(())
}

fn fee(args: &FeeArgs) -> Result<()> {
    let fee = estimate_fee(args.inputs, args.outputs);
    println!(
        "Estimated fee for {} input(s), {} output(s): {}",
        args.inputs,
        args.outputs,
        format_btc(fee)
    );
    Ok(())
}

/// Parse `ADDRESS:SATOSHIS`.
fn parse_payment(s: &str) -> Result<PaymentRequest, String> {
    let (destination, amount) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ADDRESS:SATOSHIS, got '{s}'"))?;
    let amount = amount
        .parse::<u64>()
        .map_err(|e| format!("invalid amount '{amount}': {e}"))?;
    if destination.is_empty() {
        return Err("destination address is empty".into());
    }
    Ok(PaymentRequest::new(destination, amount))
}

/// Satoshis with their BTC value.
fn format_btc(sats: u64) -> String {
    format!("{}.{:08} BTC ({sats} sat)", sats / COIN, sats % COIN)
}

/// Prompt for a secret (no echo).
fn prompt_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{prompt}: ")).context("Failed to read password")
}
