use super::{Call, Chain, ChainError, Receipt};
use crate::config::DeployerConfig;
use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    providers::{Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::{coins_bip39::English, MnemonicBuilder},
    transports::{
        http::{Client, Http},
        Transport,
    },
};
use alloy_primitives::{Address, Bytes, U256};
use std::marker::PhantomData;
use tracing::{debug, info};

/// A JSON-RPC network reached through `provider`, signing with locally derived HD accounts.
pub struct RpcChain<P, T> {
    provider: P,
    accounts: Vec<Address>,
    _transport: PhantomData<T>,
}

impl<P, T> RpcChain<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: P, accounts: Vec<Address>) -> Self {
        Self {
            provider,
            accounts,
            _transport: PhantomData,
        }
    }

    async fn mine(&self, tx: TransactionRequest) -> Result<TransactionReceipt, ChainError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(ChainError::provider)?;
        debug!(hash = %pending.tx_hash(), "transaction submitted");
        let receipt = pending.get_receipt().await.map_err(ChainError::provider)?;

        if !receipt.status() {
            return Err(ChainError::Reverted {
                gas_used: gas_used(&receipt),
                output: Bytes::new(),
            });
        }
        Ok(receipt)
    }
}

/// Connects to `config.endpoint` with a wallet holding the first `config.account_count`
/// accounts derived from the mnemonic.
pub async fn connect(
    config: &DeployerConfig,
) -> Result<RpcChain<impl Provider<Http<Client>, Ethereum>, Http<Client>>, ChainError> {
    let (wallet, accounts) = wallet(&config.mnemonic, config.account_count)?;
    info!(endpoint = %config.endpoint.host_str().unwrap_or("?"), accounts = accounts.len(), "connecting");

    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(config.endpoint.clone());
    Ok(RpcChain::new(provider, accounts))
}

fn wallet(mnemonic: &str, count: u32) -> Result<(EthereumWallet, Vec<Address>), ChainError> {
    let signers = (0..count.max(1))
        .map(|index| {
            MnemonicBuilder::<English>::default()
                .phrase(mnemonic)
                .index(index)?
                .build()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(ChainError::provider)?;

    let accounts: Vec<Address> = signers.iter().map(|signer| signer.address()).collect();
    let mut signers = signers.into_iter();
    let mut wallet = EthereumWallet::new(signers.next().ok_or(ChainError::NoAccounts)?);
    for signer in signers {
        wallet.register_signer(signer);
    }
    Ok((wallet, accounts))
}

fn gas_used(receipt: &TransactionReceipt) -> u64 {
    u64::try_from(receipt.gas_used).unwrap_or(u64::MAX)
}

fn request(call: Call) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(call.caller)
        .with_to(call.to)
        .with_input(call.calldata)
        .with_value(call.value)
        .with_gas_limit(call.gas_limit.into())
}

impl<P, T> Chain for RpcChain<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.accounts.clone())
    }

    async fn deploy(
        &self,
        from: Address,
        bytecode: Bytes,
        gas_limit: u64,
    ) -> Result<Address, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(bytecode)
            .with_gas_limit(gas_limit.into());
        let receipt = self.mine(tx).await?;
        receipt
            .contract_address
            .ok_or(ChainError::MissingContractAddress)
    }

    async fn send(&self, call: Call) -> Result<Receipt, ChainError> {
        let receipt = self.mine(request(call)).await?;
        Ok(Receipt {
            gas_used: gas_used(&receipt),
            output: Bytes::new(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        })
    }

    async fn call(&self, call: Call) -> Result<Bytes, ChainError> {
        self.provider
            .call(&request(call))
            .await
            .map_err(ChainError::provider)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(ChainError::provider)
    }

    async fn code(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(ChainError::provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const PHRASE: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_wallet_derives_accounts_in_order() {
        let (_, accounts) = wallet(PHRASE, 2).unwrap();
        assert_eq!(
            accounts,
            vec![
                address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
                address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            ]
        );
    }

    #[test]
    fn test_wallet_derives_at_least_one_account() {
        let (_, accounts) = wallet(PHRASE, 0).unwrap();
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn test_wallet_rejects_bad_phrase() {
        assert!(wallet("not a real mnemonic", 1).is_err());
    }
}
