//! beacon-devnet
//!
//! In-process development chain for provisioning runs and tests. It keeps
//! funded accounts, executes the beacon contract set, and applies every
//! transaction atomically: a revert restores the pre-transaction state and
//! only the sender's nonce advances.
//!
//! State is ephemeral. Snapshots (`snapshot` / `revert_to`) let a test
//! suite share one expensive provisioning run across cases.

pub mod artifacts;
pub mod contracts;
pub mod engine;
pub mod state;

use std::sync::Arc;

use beacon_core::chain::Chain;
use beacon_core::constants::{DEVNET_ACCOUNT_BALANCE, DEVNET_ACCOUNT_COUNT, DEVNET_NETWORK_ID};
use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, Amount, MethodCall, Receipt, Signer, Timestamp};
use beacon_crypto::{code_hash, keccak256, tx_hash};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use artifacts::{builtin_artifacts, ContractKind};

use crate::engine::Msg;
use crate::state::{Account, WorldState};

/// Configuration for a fresh development chain.
#[derive(Debug, Clone)]
pub struct DevnetConfig {
    pub network_id: u64,
    /// Number of pre-funded accounts.
    pub accounts: usize,
    /// Ether balance of each pre-funded account (wei).
    pub account_balance: Amount,
    /// Block timestamp at startup.
    pub start_timestamp: Timestamp,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            network_id: DEVNET_NETWORK_ID,
            accounts: DEVNET_ACCOUNT_COUNT,
            account_balance: DEVNET_ACCOUNT_BALANCE,
            start_timestamp: 1_577_836_800, // 2020-01-01 00:00:00 UTC
        }
    }
}

struct Inner {
    world: WorldState,
    snapshots: Vec<WorldState>,
}

/// Handle to a development chain. Clones share the same chain.
#[derive(Clone)]
pub struct Devnet {
    network_id: u64,
    signers: Arc<Vec<Signer>>,
    inner: Arc<Mutex<Inner>>,
}

/// Deterministic address of pre-funded account `index`.
pub fn devnet_account(index: usize) -> Address {
    let digest = keccak256(format!("beacon-devnet-account-{index}").as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::from_bytes(out)
}

impl Devnet {
    pub fn new(config: DevnetConfig) -> Self {
        let mut world = WorldState {
            timestamp: config.start_timestamp,
            ..Default::default()
        };
        let signers: Vec<Signer> = (0..config.accounts)
            .map(|i| Signer::new(format!("account{i}"), devnet_account(i)))
            .collect();
        for signer in &signers {
            world.accounts.insert(
                signer.address,
                Account {
                    balance: config.account_balance,
                    nonce: 0,
                },
            );
        }
        info!(
            network_id = config.network_id,
            accounts = signers.len(),
            "development chain started"
        );
        Self {
            network_id: config.network_id,
            signers: Arc::new(signers),
            inner: Arc::new(Mutex::new(Inner {
                world,
                snapshots: Vec::new(),
            })),
        }
    }

    /// Pre-funded signers, in account index order.
    pub fn signers(&self) -> &[Signer] {
        &self.signers
    }

    /// Pre-funded signer `index`.
    pub fn signer(&self, index: usize) -> Result<Signer, BeaconError> {
        self.signers
            .get(index)
            .cloned()
            .ok_or_else(|| BeaconError::UnknownAccount(format!("devnet account #{index}")))
    }

    pub async fn timestamp(&self) -> Timestamp {
        self.inner.lock().await.world.timestamp
    }

    pub async fn block_number(&self) -> u64 {
        self.inner.lock().await.world.block_number
    }

    /// Advance the block timestamp by `secs`.
    pub async fn increase_time(&self, secs: u64) {
        let mut inner = self.inner.lock().await;
        inner.world.timestamp = inner.world.timestamp.saturating_add(secs);
        inner.world.block_number += 1;
        debug!(timestamp = inner.world.timestamp, "time advanced");
    }

    /// Kind of contract deployed at `address`, if any.
    pub async fn contract_kind(&self, address: &Address) -> Option<ContractKind> {
        self.inner.lock().await.world.kind_of(address)
    }

    /// Record the current state and return its id.
    pub async fn snapshot(&self) -> u64 {
        let mut inner = self.inner.lock().await;
        let world = inner.world.clone();
        inner.snapshots.push(world);
        (inner.snapshots.len() - 1) as u64
    }

    /// Restore snapshot `id`. The snapshot and every later one are consumed.
    pub async fn revert_to(&self, id: u64) -> Result<(), BeaconError> {
        let mut inner = self.inner.lock().await;
        let index = id as usize;
        if index >= inner.snapshots.len() {
            return Err(BeaconError::UnknownSnapshot(id));
        }
        inner.snapshots.truncate(index + 1);
        if let Some(world) = inner.snapshots.pop() {
            inner.world = world;
        }
        debug!(snapshot = id, "reverted to snapshot");
        Ok(())
    }

    /// Run `apply` atomically for `signer`: on error the world is restored,
    /// and in either case the signer's nonce advances.
    async fn transact<T>(
        &self,
        signer: &Signer,
        apply: impl FnOnce(&mut WorldState, u64) -> Result<T, BeaconError>,
    ) -> Result<(T, u64, u64), BeaconError> {
        let mut inner = self.inner.lock().await;
        let nonce = inner.world.account_mut(&signer.address)?.nonce;
        let before = inner.world.clone();

        let result = apply(&mut inner.world, nonce);
        if result.is_err() {
            inner.world = before;
        }
        inner.world.account_mut(&signer.address)?.nonce += 1;
        inner.world.block_number += 1;
        let block = inner.world.block_number;

        result.map(|value| (value, nonce, block))
    }
}

impl Chain for Devnet {
    async fn network_id(&self) -> Result<u64, BeaconError> {
        Ok(self.network_id)
    }

    async fn deploy(
        &self,
        signer: &Signer,
        bytecode: &str,
        args: Vec<AbiValue>,
    ) -> Result<Address, BeaconError> {
        let (kind, libraries) = artifacts::decode_bytecode(bytecode)?;
        let deployer = signer.address;
        let (address, _, block) = self
            .transact(signer, |world, nonce| {
                engine::deploy(world, deployer, nonce, kind, libraries, args)
            })
            .await
            .inspect_err(|e| warn!(contract = kind.name(), error = %e, "deployment failed"))?;
        let code = hex::encode(&code_hash(bytecode.as_bytes())[..8]);
        debug!(contract = kind.name(), %address, block, code = %code, from = %signer, "deployed");
        Ok(address)
    }

    async fn send(
        &self,
        signer: &Signer,
        to: &Address,
        call: MethodCall,
        value: Amount,
    ) -> Result<Receipt, BeaconError> {
        let from = signer.address;
        let target = *to;
        let method = call.method.clone();
        let (output, nonce, block) = self
            .transact(signer, |world, _| {
                world.pay_contract(&from, &target, value)?;
                let msg = Msg {
                    sender: from,
                    this: target,
                    value,
                };
                engine::execute(world, &msg, &call)
            })
            .await?;

        let receipt = Receipt {
            tx_hash: tx_hash(&from, nonce, method.as_bytes()),
            from,
            to: target,
            block_number: block,
            output,
        };
        debug!(%method, to = %target, tx = %receipt.tx_hash, "transaction mined");
        Ok(receipt)
    }

    async fn call(
        &self,
        signer: &Signer,
        to: &Address,
        call: MethodCall,
    ) -> Result<Vec<AbiValue>, BeaconError> {
        let mut scratch = self.inner.lock().await.world.clone();
        let msg = Msg {
            sender: signer.address,
            this: *to,
            value: 0,
        };
        engine::execute(&mut scratch, &msg, &call)
    }

    async fn balance(&self, address: &Address) -> Result<Amount, BeaconError> {
        Ok(self.inner.lock().await.world.balance_of(address))
    }

    async fn block_timestamp(&self) -> Result<Timestamp, BeaconError> {
        Ok(self.timestamp().await)
    }
}
