mod app;
mod config;
mod core;
mod domain;
mod infrastructure;
mod modules;

use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::app::{App, CatalogAction};
use crate::core::session::{NotificationSink, WalletSession};
use crate::domain::market::Record;
use crate::infrastructure::ethereum::ProviderConfig;
use crate::infrastructure::runtime::{
    MarketConfig, NoticeLevel, RuntimeBridge, RuntimeCommand, RuntimeEvent,
};

#[derive(Debug, Parser)]
#[command(
    name = "stall",
    version,
    about = "Stall: a local-first client for an on-chain book stall"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Stall marketplace contract address
    #[arg(long)]
    stall: Option<String>,

    /// ERC-20 settlement token address
    #[arg(long)]
    token: Option<String>,

    /// Account to sign from (defaults to the node's first account)
    #[arg(long)]
    account: Option<String>,

    /// Confirmations to wait for on every write
    #[arg(long)]
    confirmations: Option<u64>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Print the catalog
    List {
        /// Render as JSON
        #[arg(long)]
        json: bool,
    },
    /// Approve the price and purchase a book
    Buy { index: u64 },
    /// Toggle a book's read flag
    Toggle { index: u64 },
    /// Remove a book from the stall
    Remove { index: u64 },
    /// List a new book for sale
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        image: String,
        /// Price in the settlement token's smallest unit
        #[arg(long)]
        price: String,
    },
    /// Follow the catalog and print changes
    Watch,
}

/// Wallet backed by the connected node's unlocked accounts, optionally
/// pinned to a configured address.
struct NodeWallet {
    account: Mutex<Option<Address>>,
}

impl NodeWallet {
    fn new(fixed: Option<Address>) -> Self {
        Self {
            account: Mutex::new(fixed),
        }
    }

    fn adopt_if_empty(&self, address: Option<Address>) {
        let mut slot = self.account.lock().unwrap();
        if slot.is_none() {
            *slot = address;
        }
    }
}

impl WalletSession for NodeWallet {
    fn address(&self) -> Option<Address> {
        *self.account.lock().unwrap()
    }

    fn prompt_connect(&self) {
        eprintln!(
            "No wallet account available. Unlock an account on the node \
             (e.g. run anvil) or set `account` in config.toml."
        );
    }
}

/// Prints operation lifecycle labels to the terminal.
struct CliSink;

impl NotificationSink for CliSink {
    fn pending(&self, message: &str) {
        println!("… {message}");
    }

    fn success(&self, message: &str) {
        println!("✔ {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("✘ {message}");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load();

    let endpoints = endpoints_from_args_and_config(&args, &config)?;
    let market = market_from_args_and_config(&args, &config)?;
    let account = match args.account.as_deref().or(config.account.as_deref()) {
        Some(value) => Some(parse_address(value)?),
        None => None,
    };

    let wallet = Arc::new(NodeWallet::new(account));
    let runtime = RuntimeBridge::new(endpoints, market)?;
    let mut app = App::new(Arc::clone(&wallet) as Arc<dyn WalletSession>);
    let sink = CliSink;

    match args.command {
        CliCommand::List { json } => run_list(&runtime, &mut app, &wallet, json),
        CliCommand::Buy { index } => {
            run_action(&runtime, &mut app, &wallet, &sink, index, CatalogAction::Buy)
        }
        CliCommand::Toggle { index } => run_action(
            &runtime,
            &mut app,
            &wallet,
            &sink,
            index,
            CatalogAction::ToggleRead,
        ),
        CliCommand::Remove { index } => run_action(
            &runtime,
            &mut app,
            &wallet,
            &sink,
            index,
            CatalogAction::Remove,
        ),
        CliCommand::Add {
            title,
            author,
            image,
            price,
        } => run_add(&runtime, &mut app, &wallet, &sink, title, author, image, price),
        CliCommand::Watch => run_watch(&runtime, &mut app, &wallet),
    }
}

fn run_list(runtime: &RuntimeBridge, app: &mut App, wallet: &NodeWallet, json: bool) -> Result<()> {
    wait_for_catalog(runtime, app, wallet)?;

    if json {
        println!("{}", modules::export::render_json(app.catalog())?);
    } else {
        print_catalog(app);
    }
    Ok(())
}

fn run_action(
    runtime: &RuntimeBridge,
    app: &mut App,
    wallet: &NodeWallet,
    sink: &dyn NotificationSink,
    index: u64,
    action: CatalogAction,
) -> Result<()> {
    wait_for_catalog(runtime, app, wallet)?;

    if index >= app.count {
        bail!("No book at index {index} ({} in the catalog)", app.count);
    }

    let Some(command) = app.request(index, action) else {
        // The wallet gate already printed its instructions.
        process::exit(1);
    };
    if let RuntimeCommand::Operate { intent, .. } = &command {
        sink.pending(intent.kind.pending_message());
    }
    runtime.send(command)?;

    // Pump until this entry settles. No timeout here: confirmation waits
    // are bounded by the node, and ^C aborts the wait without cancelling
    // anything already submitted.
    loop {
        let Some(event) = runtime.recv_timeout(Duration::from_millis(100))? else {
            continue;
        };
        match &event {
            RuntimeEvent::OperationPhase { index: i, label } if *i == index => {
                println!("  {label}");
            }
            RuntimeEvent::OperationSucceeded { index: i, message } if *i == index => {
                sink.success(message);
                return Ok(());
            }
            RuntimeEvent::OperationFailed { index: i, message } if *i == index => {
                sink.error(message);
                process::exit(1);
            }
            RuntimeEvent::Notice { message, level } if *level == NoticeLevel::Error => {
                eprintln!("{message}");
            }
            _ => {}
        }
        app.apply_event(event);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_add(
    runtime: &RuntimeBridge,
    app: &mut App,
    wallet: &NodeWallet,
    sink: &dyn NotificationSink,
    title: String,
    author: String,
    image: String,
    price: String,
) -> Result<()> {
    let price = parse_amount(&price)?;
    wait_for_catalog(runtime, app, wallet)?;

    let Some(command) = app.request_listing(title, author, image, price) else {
        process::exit(1);
    };
    sink.pending("Listing book…");
    runtime.send(command)?;

    loop {
        let Some(event) = runtime.recv_timeout(Duration::from_millis(100))? else {
            continue;
        };
        match &event {
            RuntimeEvent::ListingSettled { message, ok } => {
                if *ok {
                    sink.success(message);
                    return Ok(());
                }
                sink.error(message);
                process::exit(1);
            }
            RuntimeEvent::Notice { message, level } if *level == NoticeLevel::Error => {
                eprintln!("{message}");
            }
            _ => {}
        }
        app.apply_event(event);
    }
}

fn run_watch(runtime: &RuntimeBridge, app: &mut App, wallet: &NodeWallet) -> Result<()> {
    wait_for_catalog(runtime, app, wallet)?;
    print_catalog(app);

    loop {
        let Some(event) = runtime.recv_timeout(Duration::from_millis(200))? else {
            continue;
        };
        match &event {
            RuntimeEvent::CatalogCount { count } if *count != app.count => {
                println!("catalog size: {count}");
            }
            RuntimeEvent::RecordReady {
                index,
                record: Some(record),
            } => {
                if app.records.get(index) != Some(record) {
                    println!("{}", format_record(*index, record));
                }
            }
            RuntimeEvent::Notice { message, level } if *level == NoticeLevel::Error => {
                eprintln!("{message}");
            }
            _ => {}
        }
        app.apply_event(event);
    }
}

/// Pump events until the catalog is fully loaded, adopting the node's
/// first account as the wallet when none is configured.
fn wait_for_catalog(runtime: &RuntimeBridge, app: &mut App, wallet: &NodeWallet) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut seen_count: Option<u64> = None;
    let mut records_seen = 0u64;

    while Instant::now() < deadline {
        let Some(event) = runtime.recv_timeout(Duration::from_millis(100))? else {
            continue;
        };
        match &event {
            RuntimeEvent::Connected { accounts, .. } => {
                wallet.adopt_if_empty(accounts.first().copied());
            }
            RuntimeEvent::CatalogCount { count } => {
                seen_count = Some(*count);
                records_seen = 0;
            }
            RuntimeEvent::RecordReady { .. } => records_seen += 1,
            RuntimeEvent::Notice { message, level } if *level == NoticeLevel::Error => {
                eprintln!("{message}");
            }
            _ => {}
        }
        app.apply_event(event);

        if let Some(count) = seen_count {
            if records_seen >= count {
                return Ok(());
            }
        }
    }

    bail!("Timed out waiting for the catalog")
}

fn print_catalog(app: &App) {
    if app.count == 0 {
        println!("The stall is empty.");
        return;
    }
    println!(
        "{} book(s) on {} ({})",
        app.count, app.endpoint, app.node_kind
    );
    for (index, record) in app.catalog() {
        println!("{}", format_record(index, record));
    }
}

fn format_record(index: u64, record: &Record) -> String {
    let read = if record.read { " [read]" } else { "" };
    format!(
        "#{index}  {} — {}{read}\n     owner {}  price {}  sold {}",
        record.title,
        record.author,
        config::short_addr(&format!("{:?}", record.owner)),
        wei_to_eth(record.price),
        record.sold,
    )
}

/// Convert smallest-unit amounts to a whole-token display value.
/// Display only; every contract call carries the raw integer.
fn wei_to_eth(wei: U256) -> f64 {
    let eth_in_wei = U256::from(1_000_000_000_000_000_000u64);
    let whole = wei / eth_in_wei;
    let frac = wei % eth_in_wei;

    let whole_f64: f64 = whole.to_string().parse().unwrap_or(0.0);
    let frac_f64: f64 = frac.to_string().parse().unwrap_or(0.0);

    whole_f64 + frac_f64 / 1e18
}

fn endpoints_from_args_and_config(
    args: &Args,
    config: &config::Config,
) -> Result<Vec<ProviderConfig>> {
    let mut endpoints = Vec::new();

    if let Some(rpc) = &args.rpc {
        endpoints.push(http_or_ws(rpc));
    }
    if let Some(ws) = &args.ws {
        endpoints.push(ProviderConfig::WebSocket(ws.clone()));
    }
    #[cfg(unix)]
    if let Some(ipc) = &args.ipc {
        endpoints.push(ProviderConfig::Ipc(ipc.clone()));
    }

    for endpoint in &config.endpoints {
        if let Some(rpc) = &endpoint.rpc {
            endpoints.push(http_or_ws(rpc));
        } else if let Some(ipc) = &endpoint.ipc {
            #[cfg(unix)]
            endpoints.push(ProviderConfig::Ipc(PathBuf::from(ipc)));
            #[cfg(not(unix))]
            let _ = ipc;
        }
    }

    if endpoints.is_empty() {
        endpoints.push(ProviderConfig::Http("http://localhost:8545".to_string()));
    }

    Ok(endpoints)
}

fn http_or_ws(url: &str) -> ProviderConfig {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        ProviderConfig::WebSocket(url.to_string())
    } else {
        ProviderConfig::Http(url.to_string())
    }
}

fn market_from_args_and_config(args: &Args, config: &config::Config) -> Result<MarketConfig> {
    let stall = args
        .stall
        .as_deref()
        .or(config.stall.as_deref())
        .context("No stall contract configured. Pass --stall or set `stall` in config.toml")?;
    let token = args
        .token
        .as_deref()
        .or(config.token.as_deref())
        .context("No settlement token configured. Pass --token or set `token` in config.toml")?;

    Ok(MarketConfig {
        stall: parse_address(stall)?,
        token: parse_address(token)?,
        confirmations: args.confirmations.or(config.confirmations).unwrap_or(1),
    })
}

fn parse_address(value: &str) -> Result<Address> {
    config::normalize_address(value)
        .parse::<Address>()
        .map_err(|err| anyhow!("Invalid address '{value}': {err}"))
}

fn parse_amount(value: &str) -> Result<U256> {
    value
        .trim()
        .parse::<U256>()
        .map_err(|err| anyhow!("Invalid amount '{value}': {err}"))
}
