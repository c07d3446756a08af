//! Contract call descriptions and the gateway contract
//!
//! Calls are named after the stall contract's entry points and carry
//! positional `DynSolValue` arguments; the gateway maps them onto the
//! actual encoded transactions.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

/// Which deployed contract a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// The book stall marketplace contract.
    Stall,
    /// The ERC-20 settlement token the stall charges in.
    SettlementToken,
}

/// A side-effect-free contract read.
#[derive(Debug, Clone)]
pub struct ReadCall {
    pub name: &'static str,
    pub target: CallTarget,
    pub args: Vec<DynSolValue>,
}

impl ReadCall {
    pub fn books_length() -> Self {
        Self {
            name: "getBooksLength",
            target: CallTarget::Stall,
            args: Vec::new(),
        }
    }

    pub fn book(index: u64) -> Self {
        Self {
            name: "getBook",
            target: CallTarget::Stall,
            args: vec![DynSolValue::Uint(U256::from(index), 256)],
        }
    }
}

/// A state-changing contract call, signed as `from`.
#[derive(Debug, Clone)]
pub struct WriteCall {
    pub name: &'static str,
    pub target: CallTarget,
    pub from: Address,
    pub args: Vec<DynSolValue>,
}

impl WriteCall {
    /// Approve the stall to spend exactly `amount` of the settlement token.
    /// The amount is passed through unmodified; no rounding ever happens here.
    pub fn approve(from: Address, spender: Address, amount: U256) -> Self {
        Self {
            name: "approve",
            target: CallTarget::SettlementToken,
            from,
            args: vec![DynSolValue::Address(spender), DynSolValue::Uint(amount, 256)],
        }
    }

    pub fn buy_book(from: Address, index: u64) -> Self {
        Self::stall_call("buyBook", from, vec![DynSolValue::Uint(U256::from(index), 256)])
    }

    pub fn mark_as_read(from: Address, index: u64) -> Self {
        Self::stall_call("markAsRead", from, vec![DynSolValue::Uint(U256::from(index), 256)])
    }

    pub fn mark_as_unread(from: Address, index: u64) -> Self {
        Self::stall_call("markAsUnread", from, vec![DynSolValue::Uint(U256::from(index), 256)])
    }

    pub fn remove_book(from: Address, index: u64) -> Self {
        Self::stall_call("removeBook", from, vec![DynSolValue::Uint(U256::from(index), 256)])
    }

    pub fn add_book(from: Address, title: &str, author: &str, image: &str, price: U256) -> Self {
        Self::stall_call(
            "addBook",
            from,
            vec![
                DynSolValue::String(title.to_string()),
                DynSolValue::String(author.to_string()),
                DynSolValue::String(image.to_string()),
                DynSolValue::Uint(price, 256),
            ],
        )
    }

    fn stall_call(name: &'static str, from: Address, args: Vec<DynSolValue>) -> Self {
        Self {
            name,
            target: CallTarget::Stall,
            from,
            args,
        }
    }
}

/// Receipt summary of a confirmed transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// A submitted transaction awaiting confirmations.
#[async_trait]
pub trait PendingTx: Send {
    fn tx_hash(&self) -> B256;

    /// Resolve once the transaction has been mined at the given depth.
    async fn confirmed(self: Box<Self>, confirmations: u64) -> anyhow::Result<TxOutcome>;
}

/// The deployed contracts, as the rest of the client sees them.
///
/// `read` yields `None` while the record is unresolved or absent (a stale
/// index after a removal reads as "not loaded", never as an error).
#[async_trait]
pub trait ContractGateway: Send + Sync {
    async fn read(&self, call: &ReadCall) -> anyhow::Result<Option<Vec<DynSolValue>>>;

    async fn submit(&self, call: &WriteCall) -> anyhow::Result<Box<dyn PendingTx>>;
}
