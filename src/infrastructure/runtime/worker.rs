//! Async worker - runs in the Tokio runtime and drives catalog reads and
//! mutating operations against the chain

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::interval;

use crate::core::error::OperationError;
use crate::core::sequencer::run_sequence;
use crate::domain::market::{
    decode_count, decode_record, plan_listing, plan_sequence, ContractGateway, OperationIntent,
    ReadCall, Record,
};
use crate::infrastructure::ethereum::{create_provider, ProviderConfig, StallGateway};
use crate::infrastructure::runtime::bridge::{
    MarketConfig, NoticeLevel, RuntimeCommand, RuntimeEvent,
};

/// An operation task finished and needs settling on the worker loop.
enum SettledOperation {
    Item {
        intent: OperationIntent,
        result: Result<(), OperationError>,
    },
    Listing {
        result: Result<(), OperationError>,
    },
}

/// Run the async worker loop
pub async fn run_async_worker(
    endpoints: Vec<ProviderConfig>,
    market: MarketConfig,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    if endpoints.is_empty() {
        anyhow::bail!("No endpoints configured");
    }

    let mut endpoint_index = 0usize;
    let mut gateway: Option<Arc<dyn ContractGateway>> = None;
    let mut records: HashMap<u64, Record> = HashMap::new();
    let mut known_count: Option<u64> = None;

    // Settled-operation channel from spawned operation tasks
    let (done_tx, mut done_rx) = unbounded_channel::<SettledOperation>();

    // Count re-poll cadence (the catalog's watch mode)
    let mut poll_interval = interval(Duration::from_millis(500));

    loop {
        // Try to connect if not connected
        if gateway.is_none() {
            let config = endpoints[endpoint_index].clone();
            match connect_to_endpoint(config.clone(), market, &evt_tx).await {
                Ok(g) => {
                    match refresh_catalog(g.as_ref(), &mut records, &evt_tx).await {
                        Ok(count) => known_count = Some(count),
                        Err(err) => notice(&evt_tx, format!("Catalog read failed: {:#}", err)),
                    }
                    gateway = Some(g);
                }
                Err(err) => {
                    notice(
                        &evt_tx,
                        format!("Connection failed ({}): {:#}", config.display(), err),
                    );

                    // Try next endpoint if available
                    if endpoints.len() > 1 {
                        endpoint_index = (endpoint_index + 1) % endpoints.len();
                    }

                    tokio::time::sleep(Duration::from_millis(900)).await;
                    continue;
                }
            }
        }

        // Process commands (non-blocking)
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                RuntimeCommand::Shutdown => return Ok(()),

                RuntimeCommand::SwitchEndpoint { index } => {
                    if index >= endpoints.len() {
                        notice(
                            &evt_tx,
                            format!("Invalid endpoint index {} ({} total)", index, endpoints.len()),
                        );
                        continue;
                    }
                    endpoint_index = index;
                    gateway = None;
                    records.clear();
                    known_count = None;
                }

                RuntimeCommand::Refresh => {
                    if let Some(ref g) = gateway {
                        match refresh_catalog(g.as_ref(), &mut records, &evt_tx).await {
                            Ok(count) => known_count = Some(count),
                            Err(err) => notice(&evt_tx, format!("Catalog read failed: {:#}", err)),
                        }
                    }
                }

                RuntimeCommand::Operate { intent, from } => {
                    if let Some(ref g) = gateway {
                        // Operations on different entries may overlap; each
                        // sequence stays strictly ordered internally.
                        let gateway = Arc::clone(g);
                        let record = records.get(&intent.index).cloned();
                        let evt_tx = evt_tx.clone();
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let result =
                                execute_operation(gateway, market, record, intent, from, evt_tx)
                                    .await;
                            let _ = done_tx.send(SettledOperation::Item { intent, result });
                        });
                    }
                }

                RuntimeCommand::ListBook {
                    title,
                    author,
                    image,
                    price,
                    from,
                } => {
                    if let Some(ref g) = gateway {
                        let gateway = Arc::clone(g);
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let sequence =
                                plan_listing(&title, &author, &image, price, from, market.confirmations);
                            let result =
                                run_sequence(gateway.as_ref(), sequence, &mut |_| {}).await;
                            let _ = done_tx.send(SettledOperation::Listing { result });
                        });
                    }
                }
            }
        }

        // Settle finished operations; a confirmed write invalidates the
        // catalog, so refetch before anything else is reported.
        while let Ok(settled) = done_rx.try_recv() {
            let refetch = matches!(
                settled,
                SettledOperation::Item { result: Ok(()), .. }
                    | SettledOperation::Listing { result: Ok(()) }
            );

            match settled {
                SettledOperation::Item { intent, result } => {
                    let event = match result {
                        Ok(()) => RuntimeEvent::OperationSucceeded {
                            index: intent.index,
                            message: intent.kind.success_message().to_string(),
                        },
                        Err(err) => RuntimeEvent::OperationFailed {
                            index: intent.index,
                            message: err.to_string(),
                        },
                    };
                    let _ = evt_tx.send(event);
                }
                SettledOperation::Listing { result } => {
                    let event = match result {
                        Ok(()) => RuntimeEvent::ListingSettled {
                            message: "Book listed successfully".to_string(),
                            ok: true,
                        },
                        Err(err) => RuntimeEvent::ListingSettled {
                            message: err.to_string(),
                            ok: false,
                        },
                    };
                    let _ = evt_tx.send(event);
                }
            }

            if refetch {
                if let Some(ref g) = gateway {
                    match refresh_catalog(g.as_ref(), &mut records, &evt_tx).await {
                        Ok(count) => known_count = Some(count),
                        Err(err) => notice(&evt_tx, format!("Catalog read failed: {:#}", err)),
                    }
                }
            }
        }

        // Re-poll the catalog size; a moved count means entries were
        // added or removed out from under us.
        if let Some(ref g) = gateway {
            poll_interval.tick().await;

            match read_count(g.as_ref()).await {
                Ok(count) => {
                    if known_count != Some(count) {
                        match refresh_catalog(g.as_ref(), &mut records, &evt_tx).await {
                            Ok(count) => known_count = Some(count),
                            Err(err) => notice(&evt_tx, format!("Catalog read failed: {:#}", err)),
                        }
                    }
                }
                Err(err) => {
                    notice(&evt_tx, format!("RPC error: {:#}", err));
                    gateway = None;
                    records.clear();
                    known_count = None;

                    // Try next endpoint
                    if endpoints.len() > 1 {
                        endpoint_index = (endpoint_index + 1) % endpoints.len();
                    }
                    continue;
                }
            }
        }

        // Small yield to prevent busy loop
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Connect to an endpoint and wrap it in a contract gateway
async fn connect_to_endpoint(
    config: ProviderConfig,
    market: MarketConfig,
    evt_tx: &Sender<RuntimeEvent>,
) -> Result<Arc<dyn ContractGateway>> {
    let provider = create_provider(config).await?;

    // Get node info
    let client_version = provider
        .client_version()
        .await
        .context("Failed to get client version")?;
    let node_kind = detect_node_kind(&client_version);
    let accounts = provider.accounts().await.unwrap_or_default();

    let _ = evt_tx.send(RuntimeEvent::Connected {
        endpoint: provider.endpoint_name(),
        node_kind,
        accounts,
    });

    let gateway = StallGateway::new(provider, market.stall, market.token)?;
    Ok(Arc::new(gateway))
}

/// Detect node kind from client version string
fn detect_node_kind(version: &str) -> String {
    let lower = version.to_lowercase();
    if lower.contains("anvil") {
        "anvil".to_string()
    } else if lower.contains("reth") {
        "reth".to_string()
    } else if lower.contains("geth") || lower.contains("go-ethereum") {
        "geth".to_string()
    } else {
        version.to_string()
    }
}

/// Plan and run one mutating operation, reporting phases as events.
async fn execute_operation(
    gateway: Arc<dyn ContractGateway>,
    market: MarketConfig,
    record: Option<Record>,
    intent: OperationIntent,
    from: Address,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<(), OperationError> {
    let sequence = plan_sequence(&intent, record.as_ref(), market.stall, from, market.confirmations);
    let index = intent.index;
    let mut on_phase = move |label: &'static str| {
        let _ = evt_tx.send(RuntimeEvent::OperationPhase {
            index,
            label: label.to_string(),
        });
    };
    run_sequence(gateway.as_ref(), sequence, &mut on_phase).await
}

/// Re-read the whole catalog: count first, then every record in parallel.
/// Every record is replaced, never patched.
async fn refresh_catalog(
    gateway: &dyn ContractGateway,
    records: &mut HashMap<u64, Record>,
    evt_tx: &Sender<RuntimeEvent>,
) -> Result<u64> {
    let count = read_count(gateway).await?;
    let _ = evt_tx.send(RuntimeEvent::CatalogCount { count });

    let fetches = (0..count).map(|index| fetch_record(gateway, index));
    let fetched = futures::future::join_all(fetches).await;

    records.clear();
    for (index, record) in fetched {
        if let Some(record) = &record {
            records.insert(index, record.clone());
        }
        let _ = evt_tx.send(RuntimeEvent::RecordReady { index, record });
    }

    Ok(count)
}

/// Read the catalog size; an unresolved read counts as empty.
async fn read_count(gateway: &dyn ContractGateway) -> Result<u64> {
    let raw = gateway.read(&ReadCall::books_length()).await?;
    Ok(decode_count(raw.as_deref()))
}

/// Read and decode one record. A failed or absent read yields `None`
/// ("not loaded"); the next poll retries it.
async fn fetch_record(gateway: &dyn ContractGateway, index: u64) -> (u64, Option<Record>) {
    match gateway.read(&ReadCall::book(index)).await {
        Ok(raw) => (index, decode_record(raw.as_deref())),
        Err(_) => (index, None),
    }
}

fn notice(evt_tx: &Sender<RuntimeEvent>, message: String) {
    let _ = evt_tx.send(RuntimeEvent::Notice {
        message,
        level: NoticeLevel::Error,
    });
}
