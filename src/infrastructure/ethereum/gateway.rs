//! Alloy-backed gateway to the deployed stall and settlement token

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use alloy_dyn_abi::DynSolValue;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::interval;

use crate::domain::market::{
    CallTarget, ContractGateway, PendingTx, ReadCall, TxOutcome, WriteCall,
};
use crate::infrastructure::abi::{FunctionSpec, StallAbi};
use crate::infrastructure::ethereum::EthereumProvider;

/// Receipt poll cadence while waiting for confirmations.
const RECEIPT_POLL: Duration = Duration::from_millis(500);

pub struct StallGateway {
    provider: Arc<dyn EthereumProvider>,
    abi: StallAbi,
    stall: Address,
    token: Address,
}

impl StallGateway {
    pub fn new(provider: Arc<dyn EthereumProvider>, stall: Address, token: Address) -> Result<Self> {
        Ok(Self {
            provider,
            abi: StallAbi::new()?,
            stall,
            token,
        })
    }

    fn resolve(&self, name: &str, target: CallTarget) -> Result<(&FunctionSpec, Address)> {
        let spec = self
            .abi
            .function(name)
            .with_context(|| format!("Unknown contract function '{name}'"))?;
        let address = match target {
            CallTarget::Stall => self.stall,
            CallTarget::SettlementToken => self.token,
        };
        Ok((spec, address))
    }
}

#[async_trait]
impl ContractGateway for StallGateway {
    async fn read(&self, call: &ReadCall) -> Result<Option<Vec<DynSolValue>>> {
        let (spec, to) = self.resolve(call.name, call.target)?;
        let calldata = spec.encode_call(&call.args)?;
        let request = TransactionRequest::default().to(to).input(calldata.into());

        match self.provider.call(request).await {
            Ok(data) if data.is_empty() => Ok(None),
            // Fail closed: undecodable data reads as "not loaded".
            Ok(data) => Ok(spec.decode_return(&data).ok()),
            Err(err) if is_revert(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn submit(&self, call: &WriteCall) -> Result<Box<dyn PendingTx>> {
        let (spec, to) = self.resolve(call.name, call.target)?;
        let calldata = spec.encode_call(&call.args)?;
        let mut request = TransactionRequest::default().to(to).input(calldata.into());
        request.from = Some(call.from);

        let hash = self.provider.send_transaction(request).await?;
        Ok(Box::new(AlloyPendingTx {
            provider: Arc::clone(&self.provider),
            hash,
        }))
    }
}

/// A read that reverts (e.g. an index past the end after a removal) is an
/// absent record, not a transport failure.
fn is_revert(err: &anyhow::Error) -> bool {
    format!("{:#}", err).to_lowercase().contains("revert")
}

struct AlloyPendingTx {
    provider: Arc<dyn EthereumProvider>,
    hash: B256,
}

#[async_trait]
impl PendingTx for AlloyPendingTx {
    fn tx_hash(&self) -> B256 {
        self.hash
    }

    /// Poll for the receipt, then for the head to reach the requested
    /// depth. No timeout here: the node's own limits bound the wait.
    async fn confirmed(self: Box<Self>, confirmations: u64) -> Result<TxOutcome> {
        let mut poll = interval(RECEIPT_POLL);
        let mut mined: Option<TxOutcome> = None;

        loop {
            poll.tick().await;

            if mined.is_none() {
                if let Some(receipt) = self.provider.get_receipt(self.hash).await? {
                    let block_number = receipt
                        .block_number
                        .context("Receipt is missing a block number")?;
                    mined = Some(TxOutcome {
                        tx_hash: self.hash,
                        block_number,
                        success: receipt.status(),
                    });
                }
            }

            if let Some(outcome) = mined {
                if confirmations <= 1 {
                    return Ok(outcome);
                }
                let head = self.provider.block_number().await?;
                if head >= outcome.block_number + confirmations - 1 {
                    return Ok(outcome);
                }
            }
        }
    }
}
