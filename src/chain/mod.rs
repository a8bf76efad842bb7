//! Everything the harness asks of a chain. [`SimulatedChain`] runs an in-process EVM for tests,
//! [`RpcChain`] talks JSON-RPC to a real network through an HD wallet.

use alloy_primitives::{Address, Bytes, Log, U256};
use std::error::Error as StdError;
use thiserror::Error;

mod evm;
mod rpc;
mod simulated;

pub use rpc::{connect, RpcChain};
pub use simulated::{SimulatedChain, DEFAULT_ACCOUNTS, DEFAULT_ACCOUNT_BALANCE, DEFAULT_GAS_PRICE};

pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// A message call, either sent as a transaction or executed read-only.
#[derive(Debug, Clone)]
pub struct Call {
    pub caller: Address,
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

impl Call {
    pub fn new(caller: Address, to: Address, calldata: impl Into<Bytes>) -> Self {
        Self {
            caller,
            to,
            calldata: calldata.into(),
            value: U256::ZERO,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// A mined, successful transaction.
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    pub gas_used: u64,
    pub output: Bytes,
    pub logs: Vec<Log>,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain exposes no accounts")]
    NoAccounts,
    #[error("transaction reverted after {gas_used} gas (output {output})")]
    Reverted { gas_used: u64, output: Bytes },
    #[error("transaction halted after {gas_used} gas: {reason}")]
    Halted { reason: String, gas_used: u64 },
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("contract creation returned no address")]
    MissingContractAddress,
    #[error("provider error: {0}")]
    Provider(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl ChainError {
    pub fn provider(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Provider(err.into())
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}

/// Every method is a suspension point; implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Chain {
    /// Accounts the chain can sign for, in provider order.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Submits a contract creation and waits until it is mined.
    async fn deploy(&self, from: Address, bytecode: Bytes, gas_limit: u64)
        -> Result<Address, ChainError>;

    /// Submits a state-changing call and waits until it is mined.
    async fn send(&self, call: Call) -> Result<Receipt, ChainError>;

    /// Executes a call against current state without mining it.
    async fn call(&self, call: Call) -> Result<Bytes, ChainError>;

    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn code(&self, address: Address) -> Result<Bytes, ChainError>;
}
