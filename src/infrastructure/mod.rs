//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Alloy-based Ethereum provider and contract gateway
//! - The fixed contract ABI surface (alloy-dyn-abi)
//! - Tokio runtime bridge for async operations

pub mod abi;
pub mod ethereum;
pub mod runtime;
