use crate::artifact::CompiledArtifact;
use crate::chain::{self, Chain, ChainError};
use crate::config::DeployerConfig;
use alloy_primitives::Address;
use tracing::{debug, info};

/// A deployer over the network and wallet described by `config`.
pub async fn connect(config: &DeployerConfig) -> Result<Deployer<impl Chain>, ChainError> {
    let chain = chain::connect(config).await?;
    Ok(Deployer::new(chain, config.gas_limit))
}

/// Outcome of one contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub deployer: Address,
}

/// Submits contract creations from the first account a chain exposes.
pub struct Deployer<C> {
    chain: C,
    gas_limit: u64,
}

impl<C: Chain> Deployer<C> {
    pub fn new(chain: C, gas_limit: u64) -> Self {
        Self { chain, gas_limit }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Deploys `artifact` once. Not idempotent: every call creates a new instance.
    pub async fn deploy(&self, artifact: &CompiledArtifact) -> Result<Deployment, ChainError> {
        let accounts = self.chain.accounts().await?;
        let deployer = *accounts.first().ok_or(ChainError::NoAccounts)?;
        info!(%deployer, gas_limit = self.gas_limit, "starting deployment");
        debug!(
            interface = %serde_json::to_string(&artifact.abi).unwrap_or_default(),
            bytecode_len = artifact.bytecode.len(),
            "deploying artifact"
        );

        let address = self
            .chain
            .deploy(deployer, artifact.bytecode.clone(), self.gas_limit)
            .await?;
        info!(%address, "contract deployed");

        Ok(Deployment { address, deployer })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chain::SimulatedChain;
    use alloy_primitives::U256;

    #[tokio::test]
    async fn test_deploys_from_first_account() {
        let deployer = Deployer::new(SimulatedChain::new(), 1_000_000);
        let artifact = CompiledArtifact::lottery().unwrap();

        let deployment = deployer.deploy(&artifact).await.unwrap();
        let accounts = deployer.chain().accounts().await.unwrap();
        assert_eq!(deployment.deployer, accounts[0]);
        assert_ne!(deployment.address, Address::ZERO);
        assert!(!deployer.chain().code(deployment.address).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redeploy_creates_new_instance() {
        let deployer = Deployer::new(SimulatedChain::new(), 1_000_000);
        let artifact = CompiledArtifact::lottery().unwrap();

        let first = deployer.deploy(&artifact).await.unwrap();
        let second = deployer.deploy(&artifact).await.unwrap();
        assert_ne!(first.address, second.address);
        assert_eq!(first.deployer, second.deployer);
    }

    #[tokio::test]
    async fn test_insufficient_gas_propagates() {
        let deployer = Deployer::new(SimulatedChain::new(), 60_000);
        let artifact = CompiledArtifact::lottery().unwrap();

        assert!(deployer.deploy(&artifact).await.is_err());
    }

    #[tokio::test]
    async fn test_chain_without_accounts() {
        let deployer = Deployer::new(SimulatedChain::with_funded_accounts(0, U256::ZERO), 1_000_000);
        let artifact = CompiledArtifact::lottery().unwrap();

        let err = deployer.deploy(&artifact).await.unwrap_err();
        assert!(matches!(err, ChainError::NoAccounts));
    }
}
