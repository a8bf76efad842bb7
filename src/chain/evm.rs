use super::{ChainError, Receipt};
use alloy_primitives::{Address, Bytes};
use revm::{
    primitives::{BlockEnv, ExecutionResult, SpecId, TransactTo, TxEnv},
    Evm, InMemoryDB,
};

pub(crate) fn deploy(
    mut tx: TxEnv,
    block: BlockEnv,
    db: &mut InMemoryDB,
) -> Result<Address, ChainError> {
    tx.transact_to = TransactTo::Create;
    let result = transact(tx, block, db)?;

    if let ExecutionResult::Success { output, .. } = result {
        let address = output.address().ok_or(ChainError::MissingContractAddress)?;
        Ok(*address)
    } else {
        Err(failure(result))
    }
}

fn evm(tx: TxEnv, block: BlockEnv, db: &mut InMemoryDB) -> Evm<'_, (), &mut InMemoryDB> {
    Evm::builder()
        .with_db(db)
        .with_spec_id(SpecId::CANCUN)
        .modify_block_env(|env| *env = block)
        .with_tx_env(tx)
        .build()
}

/// Executes `tx` in `block` and commits the resulting state, reverted or not.
pub(crate) fn transact(
    tx: TxEnv,
    block: BlockEnv,
    db: &mut InMemoryDB,
) -> Result<ExecutionResult, ChainError> {
    evm(tx, block, db)
        .transact_commit()
        .map_err(|err| ChainError::Rejected(err.to_string()))
}

/// Executes `tx` and throws the resulting state away.
pub(crate) fn simulate(
    tx: TxEnv,
    block: BlockEnv,
    db: &mut InMemoryDB,
) -> Result<ExecutionResult, ChainError> {
    let result_and_state = evm(tx, block, db)
        .transact()
        .map_err(|err| ChainError::Rejected(err.to_string()))?;
    Ok(result_and_state.result)
}

pub(crate) fn into_receipt(result: ExecutionResult) -> Result<Receipt, ChainError> {
    match result {
        ExecutionResult::Success {
            gas_used,
            output,
            logs,
            ..
        } => Ok(Receipt {
            gas_used,
            output: output.into_data(),
            logs,
        }),
        other => Err(failure(other)),
    }
}

fn failure(result: ExecutionResult) -> ChainError {
    match result {
        ExecutionResult::Revert { gas_used, output } => ChainError::Reverted { gas_used, output },
        ExecutionResult::Halt { reason, gas_used } => ChainError::Halted {
            reason: format!("{reason:?}"),
            gas_used,
        },
        ExecutionResult::Success { gas_used, .. } => ChainError::Halted {
            reason: "unexpected success".to_string(),
            gas_used,
        },
    }
}
