use std::collections::{BTreeMap, BTreeSet};

use beacon_core::chain::Chain;
use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, ContractHandle, Signer};
use beacon_crypto::encode_call;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::factory::ContractFactory;
use crate::params::{BootstrapArtifacts, ProvisionParams};
use crate::plan::{Plan, StepId};

const SERVICE_INITIALIZER: &str = "initialize(uint256,address)";

// ── Address book ─────────────────────────────────────────────────────────────

/// Addresses produced so far, keyed by the step that deployed them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook(BTreeMap<StepId, Address>);

impl AddressBook {
    pub fn insert(&mut self, id: StepId, address: Address) {
        self.0.insert(id, address);
    }

    pub fn get(&self, id: StepId) -> Option<Address> {
        self.0.get(&id).copied()
    }

    /// Address `step` needs from `input`, or `MissingInput`.
    pub fn require(&self, step: StepId, input: StepId) -> Result<Address, BeaconError> {
        self.get(input).ok_or_else(|| BeaconError::MissingInput {
            step: step.to_string(),
            input: input.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepId, Address)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Sequencer ────────────────────────────────────────────────────────────────

/// Executes a [`Plan`] against a chain, one confirmed transaction at a time.
///
/// A step runs only once every step it depends on has completed (or was
/// seeded by the caller). A failure stops the run; contracts already
/// deployed stay on chain and remain in the address book.
pub struct Sequencer<'a, C: Chain> {
    chain: &'a C,
    signer: &'a Signer,
    store: &'a ArtifactStore,
    artifacts: BootstrapArtifacts,
    params: ProvisionParams,
    book: AddressBook,
    factories: BTreeMap<StepId, ContractFactory>,
    completed: BTreeSet<StepId>,
}

impl<'a, C: Chain> Sequencer<'a, C> {
    pub fn new(
        chain: &'a C,
        signer: &'a Signer,
        store: &'a ArtifactStore,
        artifacts: BootstrapArtifacts,
        params: ProvisionParams,
    ) -> Self {
        Self {
            chain,
            signer,
            store,
            artifacts,
            params,
            book: AddressBook::default(),
            factories: BTreeMap::new(),
            completed: BTreeSet::new(),
        }
    }

    /// Use `factory` for the deployment performed by `id` instead of a fresh
    /// one from the store.
    pub fn with_factory(mut self, id: StepId, factory: ContractFactory) -> Self {
        self.factories.insert(id, factory);
        self
    }

    /// Record `address` as the already-available result of `id`.
    pub fn seed(&mut self, id: StepId, address: Address) {
        self.book.insert(id, address);
        self.completed.insert(id);
    }

    pub fn book(&self) -> &AddressBook {
        &self.book
    }

    pub fn into_book(self) -> AddressBook {
        self.book
    }

    pub fn is_completed(&self, id: StepId) -> bool {
        self.completed.contains(&id)
    }

    /// Run every step of `plan` in dependency order.
    pub async fn run(&mut self, plan: &Plan) -> Result<(), BeaconError> {
        let order = plan.topological_order()?;
        self.run_in_order(plan, &order).await
    }

    /// Run `plan` in a caller-chosen `order`. The order is validated before
    /// the first transaction is sent.
    pub async fn run_in_order(&mut self, plan: &Plan, order: &[StepId]) -> Result<(), BeaconError> {
        plan.validate_order(order)?;
        info!(steps = order.len(), signer = %self.signer, "provisioning started");
        for id in order {
            self.execute(plan, *id).await?;
        }
        info!(contracts = self.book.len(), "provisioning complete");
        Ok(())
    }

    /// Handle for the contract deployed by `id`, named after its artifact.
    pub fn handle(&self, id: StepId) -> Result<ContractHandle, BeaconError> {
        let address = self.book.get(id).ok_or_else(|| {
            BeaconError::Other(format!("step {id} has not produced an address"))
        })?;
        Ok(ContractHandle::new(self.artifact_name(id)?, address))
    }

    fn artifact_name(&self, id: StepId) -> Result<String, BeaconError> {
        if let Some(library) = id.library_name() {
            return Ok(library.to_string());
        }
        let a = &self.artifacts;
        let name = match id {
            StepId::Token => &a.token,
            StepId::TokenGrant => &a.token_grant,
            StepId::Registry => &a.registry,
            StepId::StakingEscrow => &a.escrow,
            StepId::TokenStaking => &a.staking,
            StepId::ServiceImpl => &a.service_impl,
            // Callers talk to the proxy through the implementation's ABI.
            StepId::ServiceProxy => &a.service_impl,
            StepId::Operator => &a.operator,
            _ => return Err(BeaconError::Other(format!("step {id} deploys no contract"))),
        };
        Ok(name.clone())
    }

    /// Artifact whose bytecode `id` deploys.
    fn deployed_artifact(&self, id: StepId) -> Result<String, BeaconError> {
        match id {
            StepId::ServiceProxy => Ok(self.artifacts.service.clone()),
            other => self.artifact_name(other),
        }
    }

    fn ensure_factory(&mut self, id: StepId) -> Result<(), BeaconError> {
        if !self.factories.contains_key(&id) {
            let factory = self.store.factory(&self.deployed_artifact(id)?)?;
            self.factories.insert(id, factory);
        }
        Ok(())
    }

    async fn execute(&mut self, plan: &Plan, id: StepId) -> Result<(), BeaconError> {
        self.run_step(plan, id).await.map_err(|e| e.in_step(id.name()))
    }

    async fn run_step(&mut self, plan: &Plan, id: StepId) -> Result<(), BeaconError> {
        let step = plan
            .steps()
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| BeaconError::Other(format!("step {id} is not part of the plan")))?;
        if let Some(missing) = step.depends_on.iter().find(|d| !self.completed.contains(d)) {
            return Err(BeaconError::MissingInput {
                step: id.to_string(),
                input: missing.to_string(),
            });
        }
        debug!(step = %id, "step started");

        if id.is_deployment() {
            let args = self.constructor_args(id)?;
            self.ensure_factory(id)?;
            let factory = &self.factories[&id];
            let handle = factory.deploy(self.chain, self.signer, args).await?;
            info!(step = %id, contract = factory.name(), address = %handle.address, "deployed");
            self.book.insert(id, handle.address);

            if let Some(library) = id.library_name() {
                self.link_into_dependents(plan, id, library, handle.address)
                    .await?;
            }
        } else {
            self.wire(id).await?;
            info!(step = %id, "transaction confirmed");
        }

        self.completed.insert(id);
        Ok(())
    }

    fn constructor_args(&self, id: StepId) -> Result<Vec<AbiValue>, BeaconError> {
        let addr = |input: StepId| self.book.require(id, input).map(AbiValue::Address);
        let args = match id {
            StepId::TokenGrant => vec![addr(StepId::Token)?],
            StepId::StakingEscrow => vec![addr(StepId::Token)?, addr(StepId::TokenGrant)?],
            StepId::TokenStaking => vec![
                addr(StepId::Token)?,
                addr(StepId::TokenGrant)?,
                addr(StepId::StakingEscrow)?,
                addr(StepId::Registry)?,
                AbiValue::Uint(self.params.stake_initialization_period as u128),
                AbiValue::Uint(self.params.stake_undelegation_period as u128),
            ],
            StepId::ServiceProxy => {
                let init = encode_call(
                    SERVICE_INITIALIZER,
                    &[
                        AbiValue::Uint(self.params.dkg_contribution_margin as u128),
                        addr(StepId::Registry)?,
                    ],
                )?;
                vec![addr(StepId::ServiceImpl)?, AbiValue::Bytes(init)]
            }
            StepId::Operator => vec![
                addr(StepId::ServiceProxy)?,
                addr(StepId::TokenStaking)?,
                addr(StepId::Registry)?,
            ],
            _ => vec![],
        };
        Ok(args)
    }

    /// Bind a freshly deployed library into every planned contract that
    /// depends on it.
    async fn link_into_dependents(
        &mut self,
        plan: &Plan,
        library_step: StepId,
        library: &str,
        address: Address,
    ) -> Result<(), BeaconError> {
        let dependents: Vec<StepId> = plan
            .steps()
            .iter()
            .filter(|s| s.id.is_deployment() && s.depends_on.contains(&library_step))
            .map(|s| s.id)
            .collect();
        for dependent in dependents {
            self.ensure_factory(dependent)?;
            let chain = self.chain;
            if let Some(factory) = self.factories.get_mut(&dependent) {
                factory.detect_network(chain).await?;
                factory.link(library, address)?;
                debug!(library, into = factory.name(), %address, "linked");
            }
        }
        Ok(())
    }

    async fn wire(&mut self, id: StepId) -> Result<(), BeaconError> {
        let (chain, signer) = (self.chain, self.signer);
        match id {
            StepId::EscrowOwnership => {
                let staking = self.book.require(id, StepId::TokenStaking)?;
                self.handle(StepId::StakingEscrow)?
                    .send(chain, signer, "transferOwnership", vec![staking.into()])
                    .await?;
            }
            StepId::ApproveOperator => {
                let operator = self.book.require(id, StepId::Operator)?;
                self.handle(StepId::Registry)?
                    .send(chain, signer, "approveOperatorContract", vec![operator.into()])
                    .await?;
            }
            StepId::OperatorUpgrader => {
                let service = self.handle(StepId::ServiceProxy)?;
                let admin = service.call_address(chain, signer, "admin", vec![]).await?;
                self.handle(StepId::Registry)?
                    .send(
                        chain,
                        signer,
                        "setOperatorContractUpgrader",
                        vec![service.address.into(), admin.into()],
                    )
                    .await?;
            }
            StepId::RegisterOperator => {
                let operator = self.book.require(id, StepId::Operator)?;
                self.handle(StepId::ServiceProxy)?
                    .send(chain, signer, "addOperatorContract", vec![operator.into()])
                    .await?;
            }
            StepId::Genesis => {
                let operator = self.handle(StepId::Operator)?;
                let estimate = operator.call_uint(chain, signer, "dkgGasEstimate", vec![]).await?;
                let ceiling = operator.call_uint(chain, signer, "gasPriceCeiling", vec![]).await?;
                let fee = estimate
                    .checked_mul(ceiling)
                    .ok_or_else(|| BeaconError::Other("genesis fee overflows".into()))?;
                info!(fee = %fee, "triggering genesis");
                operator
                    .send_value(chain, signer, "genesis", vec![], fee)
                    .await?;
            }
            other => {
                return Err(BeaconError::Other(format!("step {other} is not a wiring call")));
            }
        }
        Ok(())
    }
}

// ── Staking bootstrap ────────────────────────────────────────────────────────

/// Contracts the staking phase consumes.
#[derive(Clone, Debug)]
pub struct StakingInputs {
    pub token: Address,
    pub token_grant: Address,
    pub registry: Address,
    pub initialization_period: u64,
    pub undelegation_period: u64,
}

#[derive(Clone, Debug)]
pub struct StakingContracts {
    pub escrow: ContractHandle,
    pub staking: ContractHandle,
}

/// Deploy escrow, the staking libraries and the staking contract, then hand
/// escrow ownership to staking.
pub async fn bootstrap_staking<C: Chain>(
    chain: &C,
    signer: &Signer,
    store: &ArtifactStore,
    inputs: StakingInputs,
    escrow_factory: ContractFactory,
    staking_factory: ContractFactory,
) -> Result<StakingContracts, BeaconError> {
    let params = ProvisionParams {
        stake_initialization_period: inputs.initialization_period,
        stake_undelegation_period: inputs.undelegation_period,
        ..ProvisionParams::default()
    };
    let artifacts = BootstrapArtifacts {
        escrow: escrow_factory.name().to_string(),
        staking: staking_factory.name().to_string(),
        ..BootstrapArtifacts::default()
    };

    let mut sequencer = Sequencer::new(chain, signer, store, artifacts, params)
        .with_factory(StepId::StakingEscrow, escrow_factory)
        .with_factory(StepId::TokenStaking, staking_factory);
    sequencer.seed(StepId::Token, inputs.token);
    sequencer.seed(StepId::TokenGrant, inputs.token_grant);
    sequencer.seed(StepId::Registry, inputs.registry);
    sequencer.run(&Plan::staking()).await?;

    Ok(StakingContracts {
        escrow: sequencer.handle(StepId::StakingEscrow)?,
        staking: sequencer.handle(StepId::TokenStaking)?,
    })
}

// ── Full bootstrap ───────────────────────────────────────────────────────────

/// Every contract of a provisioned random beacon.
#[derive(Clone, Debug)]
pub struct ProvisionedSystem {
    pub token: ContractHandle,
    pub token_grant: ContractHandle,
    pub registry: ContractHandle,
    pub escrow: ContractHandle,
    pub staking: ContractHandle,
    /// The proxy, addressed through the implementation's interface.
    pub service: ContractHandle,
    pub service_impl: ContractHandle,
    pub operator: ContractHandle,
    pub addresses: AddressBook,
}

/// Provision the full system and trigger genesis.
pub async fn bootstrap_all<C: Chain>(
    chain: &C,
    signer: &Signer,
    store: &ArtifactStore,
    artifacts: &BootstrapArtifacts,
    params: &ProvisionParams,
) -> Result<ProvisionedSystem, BeaconError> {
    let mut sequencer = Sequencer::new(chain, signer, store, artifacts.clone(), params.clone());
    sequencer.run(&Plan::standard()).await?;

    Ok(ProvisionedSystem {
        token: sequencer.handle(StepId::Token)?,
        token_grant: sequencer.handle(StepId::TokenGrant)?,
        registry: sequencer.handle(StepId::Registry)?,
        escrow: sequencer.handle(StepId::StakingEscrow)?,
        staking: sequencer.handle(StepId::TokenStaking)?,
        service: sequencer.handle(StepId::ServiceProxy)?,
        service_impl: sequencer.handle(StepId::ServiceImpl)?,
        operator: sequencer.handle(StepId::Operator)?,
        addresses: sequencer.into_book(),
    })
}
