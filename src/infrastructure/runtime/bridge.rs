//! Runtime bridge - connects the synchronous view side with the async
//! Tokio runtime that talks to the chain.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::runtime::Runtime;

use crate::domain::market::{OperationIntent, Record};
use crate::infrastructure::ethereum::ProviderConfig;
use crate::infrastructure::runtime::worker::run_async_worker;

/// Deployed contract addresses and confirmation policy.
#[derive(Debug, Clone, Copy)]
pub struct MarketConfig {
    /// The book stall marketplace contract.
    pub stall: Address,
    /// The ERC-20 settlement token.
    pub token: Address,
    /// Confirmations to wait for on every write.
    pub confirmations: u64,
}

/// Commands sent from the view side to the async worker
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    /// Switch to a different endpoint
    SwitchEndpoint { index: usize },
    /// Invalidate and refetch the whole catalog
    Refresh,
    /// Run a mutating operation on one catalog entry, signed as `from`
    Operate { intent: OperationIntent, from: Address },
    /// List a new book, signed as `from`
    ListBook {
        title: String,
        author: String,
        image: String,
        price: U256,
        from: Address,
    },
    /// Shutdown the worker
    Shutdown,
}

/// Severity of a status notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// Events sent from the async worker to the view side
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Successfully connected to a node
    Connected {
        endpoint: String,
        node_kind: String,
        accounts: Vec<Address>,
    },
    /// Catalog size from the latest count read
    CatalogCount { count: u64 },
    /// One entry's record was re-read; `None` means not loaded
    RecordReady { index: u64, record: Option<Record> },
    /// An operation on an entry moved to a new phase
    OperationPhase { index: u64, label: String },
    /// An operation on an entry settled successfully
    OperationSucceeded { index: u64, message: String },
    /// An operation on an entry settled with a failure
    OperationFailed { index: u64, message: String },
    /// A listing submission settled
    ListingSettled { message: String, ok: bool },
    /// Out-of-band status notice
    Notice { message: String, level: NoticeLevel },
}

/// Bridge between the sync view thread and the async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
}

impl RuntimeBridge {
    /// Create a new runtime bridge with the given endpoints and contracts
    pub fn new(endpoints: Vec<ProviderConfig>, market: MarketConfig) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        // Spawn the worker thread with its own Tokio runtime
        thread::spawn(move || {
            let rt = Runtime::new().expect("Failed to create Tokio runtime");
            rt.block_on(async {
                if let Err(err) = run_async_worker(endpoints, market, cmd_rx, evt_tx.clone()).await {
                    let _ = evt_tx.send(RuntimeEvent::Notice {
                        message: format!("Worker exited: {:#}", err),
                        level: NoticeLevel::Error,
                    });
                }
            });
        });

        Ok(Self { cmd_tx, evt_rx })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Wait up to `timeout` for the next event. `Ok(None)` on timeout;
    /// an error once the worker is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> anyhow::Result<Option<RuntimeEvent>> {
        match self.evt_rx.recv_timeout(timeout) {
            Ok(evt) => Ok(Some(evt)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow::anyhow!("Worker channel closed")),
        }
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        // Try to send shutdown command
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
    }
}
