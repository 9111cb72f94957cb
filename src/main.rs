//! Wallet Broker CLI
//!
//! Command-line front end for the account vault, the capability broker, and
//! the web bridge.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wallet_broker::audit::AuditLog;
use wallet_broker::chain::StaticChainConfig;
use wallet_broker::confirmation::{
    AutoConfirmation, ConfirmRequest, ConfirmationFlow, ConsentPrompt, Decision,
};
use wallet_broker::rpc::RpcClient;
use wallet_broker::wallet::{FileSecretStore, KeyVault};
use wallet_broker::{
    CallerIdentity, Capability, CapabilityRequest, Config, Error, ExternalBridge, Result,
    RpcConfig, TransferRequest, WalletServices, WireValue,
};

#[derive(Parser)]
#[command(name = "wallet-broker")]
#[command(about = "Capability-gated wallet broker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Approve every confirmation and consent prompt without asking
    #[arg(short, long, global = true)]
    yes: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the vault account
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Sign a personal message with the active account
    SignMessage {
        /// Message text, or 0x-prefixed hex bytes
        #[arg(short, long)]
        message: String,
    },

    /// Sign and broadcast a legacy transaction
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Amount in wei
        #[arg(long, default_value = "0")]
        value: String,

        /// Calldata (hex encoded)
        #[arg(long)]
        data: Option<String>,

        /// Chain ID (defaults to the configured active chain)
        #[arg(long)]
        chain_id: Option<u64>,

        /// Gas limit override
        #[arg(long)]
        gas_limit: Option<String>,

        /// Gas price override in wei
        #[arg(long)]
        gas_price: Option<String>,

        /// Wait for the transaction to be mined
        #[arg(long)]
        wait: bool,
    },

    /// Look up a transaction receipt
    Receipt {
        /// Transaction hash
        hash: String,

        #[arg(long)]
        chain_id: Option<u64>,
    },

    /// Wait for a transaction to be mined (Ctrl-C to stop)
    Wait {
        /// Transaction hash
        hash: String,

        #[arg(long)]
        chain_id: Option<u64>,

        /// Override the configured timeout (milliseconds)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Override the configured poll interval (milliseconds)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Run one provider call as a web origin
    Bridge {
        /// Calling origin, e.g. https://app.example
        #[arg(long)]
        origin: String,

        /// Wire method, e.g. eth_accounts
        #[arg(long)]
        method: String,

        /// Parameters as a JSON array of strings, numbers, and booleans
        #[arg(long, default_value = "[]")]
        params: String,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Generate a new account, replacing the current one
    Create,

    /// Import a hex private key (falls back to PRIVATE_KEY)
    Import {
        #[arg(long)]
        key: Option<String>,
    },

    /// Print the active address
    Address,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    // Load config
    let config = if let Some(config_path) = &cli.config {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
    } else {
        Config::default()
    };

    let services = build_services(&config, cli.yes)?;
    let cli_caller = CallerIdentity::new("cli", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Account { action } => run_account(&services, action)?,
        Commands::SignMessage { message } => {
            authorize(&services, &cli_caller, Capability::SignMessage).await?;
            let signature = services.broker(cli_caller).sign_message(&message).await?;
            println!("{}", wallet_broker::wallet::signature_hex(&signature));
        }
        Commands::Send {
            to,
            value,
            data,
            chain_id,
            gas_limit,
            gas_price,
            wait,
        } => {
            let chain_id = chain_id.unwrap_or(config.active_chain_id);
            let mut request = TransferRequest::new(cli_caller.clone(), to, value, chain_id);
            request.data = data;
            request.gas_limit = gas_limit;
            request.gas_price = gas_price;

            authorize(&services, &cli_caller, Capability::SendTransaction).await?;
            let tx_hash = services.broker(cli_caller).send_transaction(request).await?;
            println!("{}", tx_hash);

            if wait {
                wait_for(&services, &config, &tx_hash, chain_id, None, None).await?;
            }
        }
        Commands::Receipt { hash, chain_id } => {
            let chain_id = chain_id.unwrap_or(config.active_chain_id);
            match services.rpc.transaction_receipt(chain_id, &hash).await? {
                Some(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
                None => println!("Transaction {} is not mined yet", hash),
            }
        }
        Commands::Wait {
            hash,
            chain_id,
            timeout_ms,
            interval_ms,
        } => {
            let chain_id = chain_id.unwrap_or(config.active_chain_id);
            wait_for(&services, &config, &hash, chain_id, timeout_ms, interval_ms).await?;
        }
        Commands::Bridge {
            origin,
            method,
            params,
        } => {
            let params = WireValue::parse_params(&params)?;
            let caller = CallerIdentity::web_origin(&origin);
            if let Some(capability) = bridge_capability(&method) {
                authorize(&services, &caller, capability).await?;
            }
            let bridge = ExternalBridge::new(origin, services.broker(caller));
            let result = bridge.call(&method, &params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            for chain_id in services.rpc.endpoints().chains() {
                println!("chain {}: configured", chain_id);
            }
        }
    }

    Ok(())
}

fn build_services(config: &Config, auto_approve: bool) -> Result<WalletServices> {
    let endpoints = RpcConfig::from_env();
    let chains = Arc::new(StaticChainConfig::new(endpoints.clone(), config.active_chain_id)?);
    let rpc = RpcClient::http(endpoints)?;
    let store = FileSecretStore::new(config.vault_dir());
    tracing::debug!(dir = %store.dir().display(), "Opening vault");
    let vault = Arc::new(KeyVault::new(Arc::new(store)));

    let services = if auto_approve {
        let auto = Arc::new(AutoConfirmation::approve_all());
        WalletServices::new(vault, rpc, chains, auto.clone()).with_consent(auto)
    } else {
        let prompt = Arc::new(TerminalPrompt);
        WalletServices::new(vault, rpc, chains, prompt.clone()).with_consent(prompt)
    };

    Ok(match &config.audit_log_path {
        Some(path) => services.with_audit_log(AuditLog::new(path)),
        None => services,
    })
}

fn run_account(services: &WalletServices, action: AccountAction) -> Result<()> {
    let address = match action {
        AccountAction::Create => services.vault.create_account()?,
        AccountAction::Import { key } => {
            let key = match key {
                Some(key) => key,
                None => std::env::var("PRIVATE_KEY").map_err(|_| {
                    Error::Config("pass --key or set PRIVATE_KEY".to_string())
                })?,
            };
            services.vault.import_account(key.trim())?
        }
        AccountAction::Address => {
            if !services.vault.has_account()? {
                return Err(Error::Config(
                    "no account yet: run `account create` or `account import`".to_string(),
                ));
            }
            services.vault.active_address()?
        }
    };
    println!("{}", address.to_checksum(None));
    Ok(())
}

/// Ask for consent once per run; the CLI holds no standing grants
async fn authorize(
    services: &WalletServices,
    caller: &CallerIdentity,
    capability: Capability,
) -> Result<()> {
    let request = CapabilityRequest::new(capability);
    match services.consent.decide(caller, &request).await {
        Decision::Approved => {
            services.permissions.grant(&caller.id, capability);
            Ok(())
        }
        Decision::Rejected { reason } => {
            services.permissions.deny(&caller.id, capability);
            Err(Error::PermissionDenied {
                caller: format!("{} ({})", caller.id, reason),
                capability,
            })
        }
    }
}

fn bridge_capability(method: &str) -> Option<Capability> {
    match method {
        "eth_requestAccounts" | "eth_accounts" => Some(Capability::ReadAddress),
        "personal_sign" => Some(Capability::SignMessage),
        "eth_signTypedData_v4" => Some(Capability::SignTypedData),
        "eth_sendTransaction" => Some(Capability::SendTransaction),
        _ => None,
    }
}

async fn wait_for(
    services: &WalletServices,
    config: &Config,
    tx_hash: &str,
    chain_id: u64,
    timeout_ms: Option<u64>,
    interval_ms: Option<u64>,
) -> Result<()> {
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.confirmation.timeout());
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.confirmation.poll_interval());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let result = services
        .rpc
        .wait_for_confirmation(tx_hash, chain_id, timeout, interval, &cancel_rx)
        .await;
    ctrl_c.abort();

    let confirmation = result?;
    println!(
        "Confirmed in block {} (status {})",
        confirmation.block_number,
        confirmation
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    Ok(())
}

/// Asks on the terminal for every confirmation and consent
struct TerminalPrompt;

impl TerminalPrompt {
    async fn ask(text: String) -> Decision {
        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "{}\nApprove? [y/N] ", text);
            let _ = stderr.flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if matches!(line.trim(), "y" | "Y" | "yes") => Decision::Approved,
            Ok(Ok(_)) => Decision::rejected("declined at the terminal"),
            _ => Decision::rejected("no answer from the terminal"),
        }
    }
}

#[async_trait]
impl ConfirmationFlow for TerminalPrompt {
    async fn confirm(&self, request: ConfirmRequest) -> Decision {
        let mut text = format!(
            "\n{} (requested by {}, chain {})",
            request.summary.title, request.caller, request.chain_id
        );
        for (label, value) in &request.summary.fields {
            text.push_str(&format!("\n  {}: {}", label, value));
        }
        for risk in &request.risks {
            text.push_str(&format!("\n  ! {}", risk.message));
        }
        Self::ask(text).await
    }
}

#[async_trait]
impl ConsentPrompt for TerminalPrompt {
    async fn decide(&self, caller: &CallerIdentity, request: &CapabilityRequest) -> Decision {
        let mut text = format!("\n{} asks for {}", caller, request.capability);
        if let Some(reason) = &request.reason {
            text.push_str(&format!(": {}", reason));
        }
        if request.capability.is_signing() {
            text.push_str("\n  (each use will still ask before signing with your key)");
        }
        Self::ask(text).await
    }
}
