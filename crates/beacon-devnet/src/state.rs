use std::collections::HashMap;

use beacon_core::error::BeaconError;
use beacon_core::types::{Address, Amount, Timestamp};

use crate::artifacts::ContractKind;
use crate::contracts::grant::{GrantState, ManagedGrantState};
use crate::contracts::operator::OperatorState;
use crate::contracts::registry::RegistryState;
use crate::contracts::service::{ServiceProxyState, ServiceState};
use crate::contracts::staking::{EscrowState, StakingState};
use crate::contracts::token::TokenState;

/// Externally owned account.
#[derive(Clone, Debug, Default)]
pub struct Account {
    pub balance: Amount,
    pub nonce: u64,
}

/// Per-contract storage.
#[derive(Clone, Debug)]
pub enum Storage {
    Library,
    Token(TokenState),
    TokenGrant(GrantState),
    ManagedGrant(ManagedGrantState),
    Registry(RegistryState),
    Escrow(EscrowState),
    Staking(StakingState),
    Service(ServiceState),
    ServiceProxy(ServiceProxyState),
    Operator(OperatorState),
}

/// A deployed contract.
#[derive(Clone, Debug)]
pub struct Instance {
    pub kind: ContractKind,
    pub address: Address,
    pub balance: Amount,
    /// Library addresses woven in at deployment.
    pub libraries: Vec<Address>,
    pub storage: Storage,
}

/// Entire chain state. Cloned to implement atomic transactions and snapshots.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    pub accounts: HashMap<Address, Account>,
    pub contracts: HashMap<Address, Instance>,
    pub block_number: u64,
    pub timestamp: Timestamp,
}

impl WorldState {
    pub fn kind_of(&self, address: &Address) -> Option<ContractKind> {
        self.contracts.get(address).map(|c| c.kind)
    }

    /// Remove a contract for execution; it must be put back with [`put_contract`].
    ///
    /// [`put_contract`]: WorldState::put_contract
    pub fn take_contract(&mut self, address: &Address) -> Result<Instance, BeaconError> {
        self.contracts
            .remove(address)
            .ok_or_else(|| BeaconError::UnknownContract(address.to_string()))
    }

    pub fn put_contract(&mut self, instance: Instance) {
        self.contracts.insert(instance.address, instance);
    }

    pub fn account_mut(&mut self, address: &Address) -> Result<&mut Account, BeaconError> {
        self.accounts
            .get_mut(address)
            .ok_or_else(|| BeaconError::UnknownAccount(address.to_string()))
    }

    /// Ether balance of an account or contract; unknown addresses hold nothing.
    pub fn balance_of(&self, address: &Address) -> Amount {
        if let Some(acc) = self.accounts.get(address) {
            return acc.balance;
        }
        self.contracts.get(address).map(|c| c.balance).unwrap_or(0)
    }

    /// Move `value` wei from an account to a contract.
    pub fn pay_contract(
        &mut self,
        from: &Address,
        to: &Address,
        value: Amount,
    ) -> Result<(), BeaconError> {
        if value == 0 {
            return Ok(());
        }
        let sender = self.account_mut(from)?;
        if sender.balance < value {
            return Err(BeaconError::InsufficientFunds {
                need: value,
                have: sender.balance,
            });
        }
        sender.balance -= value;
        let contract = self
            .contracts
            .get_mut(to)
            .ok_or_else(|| BeaconError::UnknownContract(to.to_string()))?;
        contract.balance += value;
        Ok(())
    }
}
