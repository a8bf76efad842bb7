//! Typed binding for a deployed Lottery instance.
//!
//! The contract is the only authority on who may enter or pick: every operation is sent to the
//! chain as is, and a revert is explained afterwards by reading the contract's own accessors.

use crate::artifact::CompiledArtifact;
use crate::chain::{Call, Chain, ChainError, Receipt, DEFAULT_GAS_LIMIT};
use alloy_json_abi::StateMutability;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use thiserror::Error;
use tracing::{debug, info};

sol! {
    function enterDraw() external payable;
    function fetchPlayers() external view returns (address[] memory players);
    function pickWinner() external;
    function manager() external view returns (address admin);
    function minimumStake() external pure returns (uint256 amount);

    event WinnerPicked(address indexed winner, uint256 amount);
}

#[derive(Debug, Error)]
pub enum LotteryError {
    #[error("interface description is incompatible: {0}")]
    IncompatibleInterface(String),
    #[error("stake of {value} wei is below the minimum of {minimum} wei")]
    InsufficientStake { value: U256, minimum: U256 },
    #[error("{caller} may not pick the winner, only {manager} can")]
    Unauthorized { caller: Address, manager: Address },
    #[error("no players have entered the draw")]
    NoPlayers,
    #[error("winner was paid but no WinnerPicked event was emitted")]
    MissingPayout,
    #[error("malformed contract response: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A settled draw as reported by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub winner: Address,
    pub amount: U256,
    pub gas_used: u64,
}

/// A Lottery instance at `address`, reached through `chain`.
pub struct Lottery<'a, C> {
    chain: &'a C,
    address: Address,
    gas_limit: u64,
}

impl<'a, C: Chain> Lottery<'a, C> {
    /// Checks `artifact` exposes the Lottery entry points, then deploys it from `from`.
    pub async fn deploy(
        chain: &'a C,
        artifact: &CompiledArtifact,
        from: Address,
        gas_limit: u64,
    ) -> Result<Self, LotteryError> {
        check_interface(artifact)?;
        let address = chain
            .deploy(from, artifact.bytecode.clone(), gas_limit)
            .await?;
        debug!(%address, admin = %from, "lottery deployed");
        Ok(Self::at(chain, address))
    }

    /// Binds an existing instance to `chain`.
    pub fn at(chain: &'a C, address: Address) -> Self {
        Self {
            chain,
            address,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn enter_draw(&self, from: Address, value: U256) -> Result<Receipt, LotteryError> {
        let call = self.call(from, enterDrawCall {}.abi_encode()).with_value(value);
        match self.chain.send(call).await {
            Ok(receipt) => {
                debug!(player = %from, %value, "entered draw");
                Ok(receipt)
            }
            Err(err) if err.is_revert() => {
                let minimum = self.minimum_stake().await?;
                if value < minimum {
                    return Err(LotteryError::InsufficientStake { value, minimum });
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Entrants in entry order; an address appears once per entry.
    pub async fn fetch_players(&self, from: Address) -> Result<Vec<Address>, LotteryError> {
        let output = self
            .chain
            .call(self.call(from, fetchPlayersCall {}.abi_encode()))
            .await?;
        Ok(fetchPlayersCall::abi_decode_returns(&output, true)?.players)
    }

    pub async fn pick_winner(&self, from: Address) -> Result<Payout, LotteryError> {
        let receipt = match self
            .chain
            .send(self.call(from, pickWinnerCall {}.abi_encode()))
            .await
        {
            Ok(receipt) => receipt,
            Err(err) if err.is_revert() => return Err(self.explain_pick_revert(from, err).await),
            Err(err) => return Err(err.into()),
        };

        let event = receipt
            .logs
            .iter()
            .filter(|log| log.address == self.address)
            .find(|log| log.topics().first() == Some(&WinnerPicked::SIGNATURE_HASH))
            .ok_or(LotteryError::MissingPayout)?;
        let payout = WinnerPicked::decode_log_data(&event.data, true)?;
        info!(winner = %payout.winner, amount = %payout.amount, "winner picked");

        Ok(Payout {
            winner: payout.winner,
            amount: payout.amount,
            gas_used: receipt.gas_used,
        })
    }

    pub async fn manager(&self) -> Result<Address, LotteryError> {
        let output = self
            .chain
            .call(self.call(Address::ZERO, managerCall {}.abi_encode()))
            .await?;
        Ok(managerCall::abi_decode_returns(&output, true)?.admin)
    }

    pub async fn minimum_stake(&self) -> Result<U256, LotteryError> {
        let output = self
            .chain
            .call(self.call(Address::ZERO, minimumStakeCall {}.abi_encode()))
            .await?;
        Ok(minimumStakeCall::abi_decode_returns(&output, true)?.amount)
    }

    /// Native balance held by the contract, i.e. the current pool.
    pub async fn pool(&self) -> Result<U256, LotteryError> {
        Ok(self.chain.balance(self.address).await?)
    }

    fn call(&self, from: Address, calldata: Vec<u8>) -> Call {
        Call::new(from, self.address, calldata).with_gas_limit(self.gas_limit)
    }

    async fn explain_pick_revert(&self, from: Address, err: ChainError) -> LotteryError {
        match self.manager().await {
            Ok(manager) if manager != from => {
                return LotteryError::Unauthorized {
                    caller: from,
                    manager,
                }
            }
            Err(lookup) => return lookup,
            Ok(_) => {}
        }
        match self.fetch_players(from).await {
            Ok(players) if players.is_empty() => LotteryError::NoPlayers,
            Ok(_) => err.into(),
            Err(lookup) => lookup,
        }
    }
}

/// Every entry point the binding calls must exist with the expected selector; `enterDraw` must
/// accept value.
fn check_interface(artifact: &CompiledArtifact) -> Result<(), LotteryError> {
    let expected = [
        (enterDrawCall::SIGNATURE, enterDrawCall::SELECTOR),
        (fetchPlayersCall::SIGNATURE, fetchPlayersCall::SELECTOR),
        (pickWinnerCall::SIGNATURE, pickWinnerCall::SELECTOR),
        (managerCall::SIGNATURE, managerCall::SELECTOR),
        (minimumStakeCall::SIGNATURE, minimumStakeCall::SELECTOR),
    ];
    for (signature, selector) in expected {
        let name = signature.split('(').next().unwrap_or(signature);
        let function = artifact
            .function(name)
            .ok_or_else(|| LotteryError::IncompatibleInterface(format!("missing `{signature}`")))?;
        if function.selector().0 != selector {
            return Err(LotteryError::IncompatibleInterface(format!(
                "`{name}` does not match `{signature}`"
            )));
        }
    }

    let payable = artifact
        .function("enterDraw")
        .is_some_and(|function| function.state_mutability == StateMutability::Payable);
    if !payable {
        return Err(LotteryError::IncompatibleInterface(
            "`enterDraw` is not payable".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SimulatedChain;
    use alloy_primitives::utils::parse_ether;

    #[test]
    fn test_selectors() {
        assert_eq!(enterDrawCall::SELECTOR, [0x5b, 0xfd, 0x65, 0xbd]);
        assert_eq!(fetchPlayersCall::SELECTOR, [0x10, 0x1d, 0x22, 0x9e]);
        assert_eq!(pickWinnerCall::SELECTOR, [0x5d, 0x49, 0x5a, 0xea]);
    }

    #[test]
    fn test_check_interface_accepts_lottery() {
        check_interface(&CompiledArtifact::lottery().unwrap()).unwrap();
    }

    #[test]
    fn test_check_interface_rejects_other_contracts() {
        let abi = r#"[{"inputs":[],"name":"enterDraw","outputs":[],"stateMutability":"nonpayable","type":"function"}]"#;
        let artifact = CompiledArtifact::from_parts(abi, "6000").unwrap();
        let err = check_interface(&artifact).unwrap_err();
        assert!(err.to_string().contains("fetchPlayers()"), "{err}");

        let mut lottery = CompiledArtifact::lottery().unwrap();
        let enter = lottery.abi.functions.get_mut("enterDraw").unwrap();
        enter[0].state_mutability = StateMutability::NonPayable;
        let err = check_interface(&lottery).unwrap_err();
        assert!(err.to_string().contains("not payable"), "{err}");
    }

    #[tokio::test]
    async fn test_accessors() {
        let chain = SimulatedChain::new();
        let admin = chain.accounts().await.unwrap()[0];
        let artifact = CompiledArtifact::lottery().unwrap();
        let lottery = Lottery::deploy(&chain, &artifact, admin, 1_000_000).await.unwrap();

        assert_eq!(lottery.manager().await.unwrap(), admin);
        assert_eq!(lottery.minimum_stake().await.unwrap(), parse_ether("0.01").unwrap());
        assert_eq!(lottery.pool().await.unwrap(), U256::ZERO);
        assert!(lottery.fetch_players(admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebinding_reaches_same_instance() {
        let chain = SimulatedChain::new();
        let accounts = chain.accounts().await.unwrap();
        let artifact = CompiledArtifact::lottery().unwrap();
        let deployed = Lottery::deploy(&chain, &artifact, accounts[0], 1_000_000)
            .await
            .unwrap();
        deployed
            .enter_draw(accounts[1], parse_ether("0.1").unwrap())
            .await
            .unwrap();

        let rebound = Lottery::at(&chain, deployed.address());
        assert_eq!(rebound.fetch_players(accounts[0]).await.unwrap(), vec![accounts[1]]);
    }

    #[tokio::test]
    async fn test_gas_cap_applies_to_entries() {
        let chain = SimulatedChain::new();
        let accounts = chain.accounts().await.unwrap();
        let artifact = CompiledArtifact::lottery().unwrap();
        let lottery = Lottery::deploy(&chain, &artifact, accounts[0], 1_000_000)
            .await
            .unwrap()
            .with_gas_limit(21_100);

        let err = lottery
            .enter_draw(accounts[1], parse_ether("0.1").unwrap())
            .await
            .unwrap_err();
        assert!(
            matches!(err, LotteryError::Chain(ChainError::Halted { .. })),
            "{err}"
        );
        assert!(lottery.fetch_players(accounts[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_calls_reject_value() {
        let chain = SimulatedChain::new();
        let accounts = chain.accounts().await.unwrap();
        let artifact = CompiledArtifact::lottery().unwrap();
        let lottery = Lottery::deploy(&chain, &artifact, accounts[0], 1_000_000)
            .await
            .unwrap();

        let call = Call::new(accounts[1], lottery.address(), fetchPlayersCall {}.abi_encode())
            .with_value(U256::from(1));
        let err = chain.send(call).await.unwrap_err();
        assert!(err.is_revert(), "{err}");
    }
}
