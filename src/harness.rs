//! Per-scenario setup for integration tests: a fresh simulated chain and a fresh Lottery on it.

use crate::artifact::CompiledArtifact;
use crate::chain::{Chain, SimulatedChain};
use crate::lottery::Lottery;
use alloy_primitives::Address;

pub const DEPLOY_GAS_LIMIT: u64 = 1_000_000;

pub struct Scenario {
    pub chain: SimulatedChain,
    pub accounts: Vec<Address>,
    lottery: Address,
}

impl Scenario {
    /// Spins up a disposable chain and deploys the embedded Lottery artifact from account 0.
    pub async fn setup() -> Result<Self, eyre::Error> {
        Self::setup_with(SimulatedChain::new(), &CompiledArtifact::lottery()?).await
    }

    pub async fn setup_with(
        chain: SimulatedChain,
        artifact: &CompiledArtifact,
    ) -> Result<Self, eyre::Error> {
        let accounts = chain.accounts().await?;
        let admin = *accounts
            .first()
            .ok_or_else(|| eyre::eyre!("simulated chain has no accounts"))?;
        let lottery = Lottery::deploy(&chain, artifact, admin, DEPLOY_GAS_LIMIT)
            .await?
            .address();
        Ok(Self {
            chain,
            accounts,
            lottery,
        })
    }

    /// The deploying account.
    pub fn admin(&self) -> Address {
        self.accounts[0]
    }

    pub fn lottery(&self) -> Lottery<'_, SimulatedChain> {
        Lottery::at(&self.chain, self.lottery)
    }
}
