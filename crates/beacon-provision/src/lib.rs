//! beacon-provision
//!
//! Deploys and wires the random beacon contract set in dependency order:
//!
//!   1. Token, grant ledger and registry (no dependencies)
//!   2. Staking: escrow, three linked libraries, staking contract, escrow
//!      ownership handed to staking
//!   3. Service: implementation, ABI-encoded initializer, proxy
//!   4. Operator: six libraries linked by name, operator contract
//!   5. Wiring: registry approval, upgrader, service registration, genesis
//!
//! Each phase consumes addresses produced by the previous ones. The order
//! is computed from an explicit dependency [`Plan`] rather than hard-coded.

pub mod artifacts;
pub mod factory;
pub mod linker;
pub mod params;
pub mod plan;
pub mod sequencer;

pub use artifacts::ArtifactStore;
pub use factory::ContractFactory;
pub use linker::LinkTable;
pub use params::{BootstrapArtifacts, ProvisionParams};
pub use plan::{Plan, Step, StepId};
pub use sequencer::{
    bootstrap_all, bootstrap_staking, AddressBook, ProvisionedSystem, Sequencer, StakingContracts,
    StakingInputs,
};
