use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coin_wallet_core::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "coin-wallet")]
#[command(about = "Coin wallet CLI - balances, history, and promotion pricing")]
#[command(version = "1.0.0")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List coin denominations and their value in QAR
    Catalog,

    /// Show the wallet balance
    Balance,

    /// Show recent transactions, newest first
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Ask the server whether the wallet covers an amount
    Check {
        /// Amount in QAR
        #[arg(short, long)]
        amount: u64,
    },

    /// Price a set of promotion flags
    Quote {
        #[arg(long)]
        featured: bool,

        #[arg(long)]
        boost: bool,
    },

    /// Run toggle, submission, and settlement against an in-process ledger
    Demo,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        if let Some(wallet_error) = e.downcast_ref::<WalletError>() {
            if wallet_error.is_transient() {
                eprintln!("The wallet service could not be reached; try again.");
            } else if !wallet_error.is_recoverable() {
                eprintln!("This client cannot read the wallet; check the configuration or upgrade.");
            }
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = WalletConfig::from_sources(cli.config).await?;

    match cli.command {
        Commands::Catalog => handle_catalog(),
        Commands::Balance => handle_balance(&config).await,
        Commands::Transactions { limit } => handle_transactions(&config, limit).await,
        Commands::Check { amount } => handle_check(&config, amount).await,
        Commands::Quote { featured, boost } => handle_quote(&config, featured, boost),
        Commands::Demo => handle_demo(&config).await,
    }
}

fn handle_catalog() -> Result<()> {
    for denomination in CoinDenomination::ALL {
        println!(
            "{}  {:<9} {}",
            denomination.symbol(),
            denomination.display_name(),
            format_qar(denomination.canonical_value())
        );
    }
    Ok(())
}

fn print_balance(balance: &WalletBalance) {
    if balance.is_empty() {
        println!("(no coins)");
    }
    for (denomination, qty) in balance.iter() {
        println!("{}: {}", denomination, qty);
    }
    println!("Total: {}", format_qar(balance.total_value()));
}

fn print_stats(stats: &WalletStats) {
    println!("Credited: {}", format_qar(stats.total_credited));
    println!("Debited: {}", format_qar(stats.total_debited));
    if stats.reserved > 0 {
        println!("Reserved: {}", format_qar(stats.reserved));
    }
    println!("Completed transactions: {}", stats.completed_transactions);
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("(no transactions)");
    }
    for tx in transactions {
        println!(
            "{}  {:<9} {:>10}  {}",
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.status,
            format_delta(tx.canonical_value_delta),
            tx.description
        );
    }
}

async fn handle_balance(config: &WalletConfig) -> Result<()> {
    let api: Arc<dyn WalletApi> = Arc::new(config.build_client()?);
    let mut store = WalletStore::new(api);
    store.refresh().await.context("fetching wallet balance")?;
    print_balance(store.balance()?);
    if let Some(stats) = store.stats() {
        print_stats(stats);
    }
    Ok(())
}

async fn handle_transactions(config: &WalletConfig, limit: usize) -> Result<()> {
    let client = config.build_client()?;
    let transactions = client
        .get_transactions(limit)
        .await
        .context("fetching transactions")?;
    print_transactions(&transactions);
    Ok(())
}

async fn handle_check(config: &WalletConfig, amount: u64) -> Result<()> {
    let client = config.build_client()?;
    let response = client.check_balance(amount).await.context("checking balance")?;
    if response.confirmed() {
        println!("Sufficient: {} available", format_qar(response.available));
    } else {
        println!(
            "Insufficient: {} required, {} available, {} missing",
            format_qar(response.required),
            format_qar(response.available),
            format_qar(response.missing)
        );
    }
    Ok(())
}

fn handle_quote(config: &WalletConfig, featured: bool, boost: bool) -> Result<()> {
    let calculator = config.build_calculator();
    let flags = PromotionFlags { featured, boost };
    for flag in flags.enabled() {
        println!("{}: {}", flag, format_qar(calculator.cost_of(flag)));
    }
    println!("Total: {}", format_qar(calculator.total_cost(&flags)));
    Ok(())
}

async fn handle_demo(config: &WalletConfig) -> Result<()> {
    let wallet: WalletId = "demo-client".to_string();
    let service = CoinService::default();

    let cart: BTreeMap<CoinDenomination, u64> =
        [(CoinDenomination::GPC, 1), (CoinDenomination::GGC, 1)].into_iter().collect();
    service.purchase_coins(&wallet, cart, generate_idempotency_key("purchase")?, None)?;

    let api: Arc<dyn WalletApi> = Arc::new(LocalWalletApi::new(Arc::clone(service.ledger()), wallet.clone()));
    let mut store = WalletStore::new(api);
    store.refresh().await?;
    println!("Wallet:");
    print_balance(store.balance()?);

    let calculator = config.build_calculator();
    let mut form = PromotionForm::new(calculator.clone());
    for flag in PromotionFlag::ALL {
        match form.handle_promotion_toggle(flag, false, &store) {
            ToggleOutcome::Enabled { required_cost } => {
                println!("Enabled {} (total {})", flag, format_qar(required_cost));
            }
            ToggleOutcome::Disabled { required_cost } => {
                println!("Disabled {} (total {})", flag, format_qar(required_cost));
            }
            ToggleOutcome::Rejected(rejection) => {
                println!("Could not enable {}: {} ({:?})", flag, rejection.error, rejection.action);
            }
        }
    }

    let draft = JobDraft {
        client_id: wallet.clone(),
        title: "Demo job".to_string(),
        description: "Posted by the coin-wallet demo".to_string(),
    };
    let record = JobSubmitter::new(calculator)
        .submit(&mut store, draft, form.flags())
        .await?;
    info!(job = %record.job_id(), cost = record.promotion_cost(), "demo job created");
    println!("Submitted job {} with promotion cost {}", record.job_id(), format_qar(record.promotion_cost()));

    let outcome = service.approve_job(&record)?;
    let again = service.approve_job(&record)?;
    println!(
        "Approved: {:?}, approved again: {}",
        outcome.transaction().map(|tx| tx.status),
        if matches!(again, SettlementOutcome::AlreadySettled(_)) { "no second debit" } else { "-" }
    );

    store.refresh().await?;
    println!("Wallet after settlement:");
    print_balance(store.balance()?);
    println!("History:");
    print_transactions(&store.transactions(10).await?);
    Ok(())
}
