use super::{evm, Call, Chain, ChainError, Receipt};
use alloy_primitives::{keccak256, Address, Bytes, U256};
use revm::{
    primitives::{AccountInfo, BlockEnv, TransactTo, TxEnv},
    InMemoryDB,
};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

pub const DEFAULT_ACCOUNTS: usize = 10;
/// 100 ether in wei.
pub const DEFAULT_ACCOUNT_BALANCE: U256 = U256::from_limbs([0x6BC7_5E2D_6310_0000, 0x5, 0, 0]);
/// 1 gwei.
pub const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;

const BLOCK_GAS_LIMIT: u64 = 30_000_000;
const BLOCK_TIME: u64 = 12;
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// A disposable in-memory chain with pre-funded accounts. Every state-changing transaction is
/// mined in its own block.
pub struct SimulatedChain {
    state: Mutex<State>,
    accounts: Vec<Address>,
    gas_price: U256,
}

struct State {
    db: InMemoryDB,
    block_number: u64,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self::with_funded_accounts(DEFAULT_ACCOUNTS, DEFAULT_ACCOUNT_BALANCE)
    }

    pub fn with_funded_accounts(count: usize, balance: U256) -> Self {
        let mut db = InMemoryDB::default();
        let accounts: Vec<Address> = (0..count as u64).map(account_address).collect();
        for account in &accounts {
            db.insert_account_info(
                *account,
                AccountInfo {
                    balance,
                    ..Default::default()
                },
            );
        }
        debug!(accounts = accounts.len(), %balance, "simulated chain created");

        Self {
            state: Mutex::new(State {
                db,
                block_number: 0,
            }),
            accounts,
            gas_price: U256::from(DEFAULT_GAS_PRICE),
        }
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn gas_price(&self) -> U256 {
        self.gas_price
    }

    pub fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.state()?.block_number)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, ChainError> {
        self.state
            .lock()
            .map_err(|_| ChainError::provider("simulated chain state is poisoned"))
    }

    fn tx(&self, call: &Call) -> TxEnv {
        TxEnv {
            caller: call.caller,
            gas_limit: call.gas_limit,
            gas_price: self.gas_price,
            transact_to: TransactTo::Call(call.to),
            value: call.value,
            data: call.calldata.clone(),
            ..Default::default()
        }
    }
}

impl State {
    /// The block the next transaction would be mined in.
    fn pending_block(&self) -> BlockEnv {
        block_env(self.block_number + 1)
    }

    /// Seals the pending block unless the transaction never got to execute.
    fn seal<T>(&mut self, result: &Result<T, ChainError>) {
        if !matches!(result, Err(ChainError::Rejected(_))) {
            self.block_number += 1;
        }
    }
}

fn block_env(number: u64) -> BlockEnv {
    BlockEnv {
        number: U256::from(number),
        timestamp: U256::from(GENESIS_TIMESTAMP + number * BLOCK_TIME),
        gas_limit: U256::from(BLOCK_GAS_LIMIT),
        prevrandao: Some(keccak256(number.to_be_bytes())),
        ..Default::default()
    }
}

/// Deterministic, precompile-free account addresses.
fn account_address(index: u64) -> Address {
    let seed = [b"lottery-harness/account/".as_slice(), &index.to_be_bytes()].concat();
    Address::from_word(keccak256(seed))
}

impl Chain for SimulatedChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.accounts.clone())
    }

    async fn deploy(
        &self,
        from: Address,
        bytecode: Bytes,
        gas_limit: u64,
    ) -> Result<Address, ChainError> {
        let tx = TxEnv {
            caller: from,
            gas_limit,
            gas_price: self.gas_price,
            data: bytecode,
            ..Default::default()
        };
        let mut state = self.state()?;
        let block = state.pending_block();
        let result = evm::deploy(tx, block, &mut state.db);
        state.seal(&result);
        let address = result?;
        debug!(%from, %address, block = state.block_number, "contract created");
        Ok(address)
    }

    async fn send(&self, call: Call) -> Result<Receipt, ChainError> {
        let tx = self.tx(&call);
        let mut state = self.state()?;
        let block = state.pending_block();
        let result = evm::transact(tx, block, &mut state.db);
        state.seal(&result);
        let result = result?;
        trace!(caller = %call.caller, to = %call.to, ?result, "transaction mined");
        evm::into_receipt(result)
    }

    async fn call(&self, mut call: Call) -> Result<Bytes, ChainError> {
        call.value = U256::ZERO;
        let mut tx = self.tx(&call);
        tx.gas_price = U256::ZERO;
        let mut state = self.state()?;
        let block = block_env(state.block_number);
        let result = evm::simulate(tx, block, &mut state.db)?;
        evm::into_receipt(result).map(|receipt| receipt.output)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        let state = self.state()?;
        Ok(state
            .db
            .accounts
            .get(&address)
            .map(|account| account.info.balance)
            .unwrap_or_default())
    }

    async fn code(&self, address: Address) -> Result<Bytes, ChainError> {
        let state = self.state()?;
        Ok(state
            .db
            .accounts
            .get(&address)
            .and_then(|account| account.info.code.as_ref())
            .map(|code| code.original_bytes())
            .unwrap_or_default())
    }
}
