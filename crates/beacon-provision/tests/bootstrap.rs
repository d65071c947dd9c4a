//! End-to-end provisioning against the in-process development chain.
//!
//! Run with:
//!   cargo test -p beacon-provision --test bootstrap

use beacon_core::chain::Chain;
use beacon_core::error::BeaconError;
use beacon_core::types::Address;
use beacon_devnet::{builtin_artifacts, ContractKind, Devnet, DevnetConfig};
use beacon_provision::{
    bootstrap_all, bootstrap_staking, ArtifactStore, BootstrapArtifacts, Plan, ProvisionParams,
    Sequencer, StakingInputs, StepId,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn store() -> ArtifactStore {
    ArtifactStore::from_artifacts(builtin_artifacts().unwrap())
}

struct Foundations {
    token: Address,
    token_grant: Address,
    registry: Address,
}

async fn deploy_foundations(devnet: &Devnet, store: &ArtifactStore) -> Foundations {
    let signer = devnet.signer(0).unwrap();
    let token = store
        .factory("KeepToken")
        .unwrap()
        .deploy(devnet, &signer, vec![])
        .await
        .unwrap();
    let token_grant = store
        .factory("TokenGrant")
        .unwrap()
        .deploy(devnet, &signer, vec![token.address.into()])
        .await
        .unwrap();
    let registry = store
        .factory("KeepRegistry")
        .unwrap()
        .deploy(devnet, &signer, vec![])
        .await
        .unwrap();
    Foundations {
        token: token.address,
        token_grant: token_grant.address,
        registry: registry.address,
    }
}

// ── Full scenario ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_bootstrap_approves_operator_and_starts_genesis() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();

    let system = bootstrap_all(
        &devnet,
        &deployer,
        &store,
        &BootstrapArtifacts::default(),
        &ProvisionParams::default(),
    )
    .await
    .unwrap();

    assert!(!system.operator.address.is_zero());
    assert_eq!(
        devnet.contract_kind(&system.operator.address).await,
        Some(ContractKind::Operator)
    );
    assert!(system
        .registry
        .call_bool(&devnet, &deployer, "isApprovedOperatorContract", vec![system.operator.address.into()])
        .await
        .unwrap());
    assert!(system
        .service
        .call_bool(&devnet, &deployer, "isOperatorContract", vec![system.operator.address.into()])
        .await
        .unwrap());
    assert!(system
        .operator
        .call_bool(&devnet, &deployer, "isGroupSelectionInProgress", vec![])
        .await
        .unwrap());

    // Genesis paid exactly dkgGasEstimate * gasPriceCeiling.
    let estimate = system
        .operator
        .call_uint(&devnet, &deployer, "dkgGasEstimate", vec![])
        .await
        .unwrap();
    let ceiling = system
        .operator
        .call_uint(&devnet, &deployer, "gasPriceCeiling", vec![])
        .await
        .unwrap();
    assert_eq!(
        devnet.balance(&system.operator.address).await.unwrap(),
        estimate * ceiling
    );

    // Service is the proxy; its initializer ran with the configured margin.
    assert_eq!(
        devnet.contract_kind(&system.service.address).await,
        Some(ContractKind::ServiceProxy)
    );
    let margin = system
        .service
        .call_uint(&devnet, &deployer, "dkgContributionMargin", vec![])
        .await
        .unwrap();
    assert_eq!(margin, ProvisionParams::default().dkg_contribution_margin as u128);
    let registry = system
        .service
        .call_address(&devnet, &deployer, "registry", vec![])
        .await
        .unwrap();
    assert_eq!(registry, system.registry.address);

    // Every deployment is recorded.
    assert_eq!(system.addresses.len(), 17);
    assert_eq!(system.addresses.get(StepId::ServiceProxy), Some(system.service.address));
}

#[tokio::test]
async fn escrow_is_owned_by_staking_after_full_bootstrap() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let system = bootstrap_all(
        &devnet,
        &deployer,
        &store(),
        &BootstrapArtifacts::default(),
        &ProvisionParams::default(),
    )
    .await
    .unwrap();

    let owner = system
        .escrow
        .call_address(&devnet, &deployer, "owner", vec![])
        .await
        .unwrap();
    assert_eq!(owner, system.staking.address);
}

// ── Staking bootstrap ─────────────────────────────────────────────────────────

#[tokio::test]
async fn staking_bootstrap_hands_escrow_to_staking() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();
    let f = deploy_foundations(&devnet, &store).await;

    let contracts = bootstrap_staking(
        &devnet,
        &deployer,
        &store,
        StakingInputs {
            token: f.token,
            token_grant: f.token_grant,
            registry: f.registry,
            initialization_period: 30,
            undelegation_period: 300,
        },
        store.factory("TokenStakingEscrow").unwrap(),
        store.factory("TokenStaking").unwrap(),
    )
    .await
    .unwrap();

    let owner = contracts
        .escrow
        .call_address(&devnet, &deployer, "owner", vec![])
        .await
        .unwrap();
    assert_eq!(owner, contracts.staking.address);

    let err = contracts
        .escrow
        .send(&devnet, &deployer, "transferOwnership", vec![deployer.address.into()])
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Ownable: caller is not the owner"));

    let period = contracts
        .staking
        .call_uint(&devnet, &deployer, "undelegationPeriod", vec![])
        .await
        .unwrap();
    assert_eq!(period, 300);
    let escrow = contracts
        .staking
        .call_address(&devnet, &deployer, "escrow", vec![])
        .await
        .unwrap();
    assert_eq!(escrow, contracts.escrow.address);
}

#[tokio::test]
async fn staking_bootstrap_without_registry_names_the_failing_step() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();
    let f = deploy_foundations(&devnet, &store).await;

    let err = bootstrap_staking(
        &devnet,
        &deployer,
        &store,
        StakingInputs {
            token: f.token,
            token_grant: f.token_grant,
            // Not a registry: the staking constructor rejects it.
            registry: f.token,
            initialization_period: 30,
            undelegation_period: 300,
        },
        store.factory("TokenStakingEscrow").unwrap(),
        store.factory("TokenStaking").unwrap(),
    )
    .await
    .unwrap_err();

    match &err {
        BeaconError::Step { step, .. } => assert_eq!(step, "tokenStaking"),
        other => panic!("expected step error, got {other:?}"),
    }
    assert_eq!(err.revert_reason(), Some("Registry is not a deployed contract"));
}

// ── Ordering ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn out_of_order_plan_sends_nothing() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();

    let plan = Plan::standard();
    let mut order = plan.topological_order().unwrap();
    // Operator ahead of the service proxy it is constructed with.
    let operator = order.iter().position(|s| *s == StepId::Operator).unwrap();
    let proxy = order.iter().position(|s| *s == StepId::ServiceProxy).unwrap();
    order.swap(operator, proxy);

    let mut sequencer = Sequencer::new(
        &devnet,
        &deployer,
        &store,
        BootstrapArtifacts::default(),
        ProvisionParams::default(),
    );
    let err = sequencer.run_in_order(&plan, &order).await.unwrap_err();
    assert!(matches!(err, BeaconError::MissingInput { ref step, .. } if step == "operator"));
    assert_eq!(devnet.block_number().await, 0);
    assert!(sequencer.book().is_empty());
}

#[tokio::test]
async fn unseeded_external_input_fails_before_sending() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();

    let mut sequencer = Sequencer::new(
        &devnet,
        &deployer,
        &store,
        BootstrapArtifacts::default(),
        ProvisionParams::default(),
    );
    let err = sequencer.run(&Plan::staking()).await.unwrap_err();
    assert!(matches!(
        err.root(),
        BeaconError::MissingInput { step, input } if step == "stakingEscrow" && input == "token"
    ));
    assert_eq!(devnet.block_number().await, 0);
}

// ── Genesis fee ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn underpaid_genesis_reverts() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();

    // Everything but genesis.
    let plan = Plan::standard();
    let order: Vec<StepId> = plan
        .topological_order()
        .unwrap()
        .into_iter()
        .filter(|s| *s != StepId::Genesis)
        .collect();
    let mut sequencer = Sequencer::new(
        &devnet,
        &deployer,
        &store,
        BootstrapArtifacts::default(),
        ProvisionParams::default(),
    );
    sequencer.run_in_order(&plan, &order).await.unwrap();
    let operator = sequencer.handle(StepId::Operator).unwrap();

    let estimate = operator
        .call_uint(&devnet, &deployer, "dkgGasEstimate", vec![])
        .await
        .unwrap();
    let ceiling = operator
        .call_uint(&devnet, &deployer, "gasPriceCeiling", vec![])
        .await
        .unwrap();
    let err = operator
        .send_value(&devnet, &deployer, "genesis", vec![], estimate * ceiling - 1)
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Insufficient DKG fee"));
    assert!(!operator
        .call_bool(&devnet, &deployer, "isGroupSelectionInProgress", vec![])
        .await
        .unwrap());

    operator
        .send_value(&devnet, &deployer, "genesis", vec![], estimate * ceiling)
        .await
        .unwrap();
}

// ── Linking ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn relinking_library_to_another_address_is_rejected() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();

    let first = store.factory("Locks").unwrap().deploy(&devnet, &deployer, vec![]).await.unwrap();
    let second = store.factory("Locks").unwrap().deploy(&devnet, &deployer, vec![]).await.unwrap();

    let mut staking = store.factory("TokenStaking").unwrap();
    staking.detect_network(&devnet).await.unwrap();
    staking.link("Locks", first.address).unwrap();
    staking.link("Locks", first.address).unwrap();
    let err = staking.link("Locks", second.address).unwrap_err();
    assert!(matches!(err, BeaconError::DuplicateLink { ref library, .. } if library == "Locks"));
    assert_eq!(staking.links().get("Locks"), Some(first.address));
}

#[tokio::test]
async fn plan_without_library_step_cannot_deploy_dependent() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let store = store();

    // Groups declared without its BLS dependency: nothing links BLS in.
    let plan = Plan::new().custom_step(StepId::Groups, vec![]);
    let mut sequencer = Sequencer::new(
        &devnet,
        &deployer,
        &store,
        BootstrapArtifacts::default(),
        ProvisionParams::default(),
    );
    let err = sequencer.run(&plan).await.unwrap_err();
    assert!(matches!(
        err.root(),
        BeaconError::UnlinkedLibrary { library, .. } if library == "BLS"
    ));
    assert_eq!(devnet.block_number().await, 0);
}

#[tokio::test]
async fn service_proxy_upgrades_keep_proxy_storage() {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let stranger = devnet.signer(5).unwrap();
    let store = store();
    let roles = BootstrapArtifacts::default();
    let system = bootstrap_all(&devnet, &deployer, &store, &roles, &ProvisionParams::default())
        .await
        .unwrap();
    let next = store
        .factory(&roles.service_impl)
        .unwrap()
        .deploy(&devnet, &deployer, vec![])
        .await
        .unwrap();

    let err = system
        .service
        .send(&devnet, &stranger, "upgradeTo", vec![next.address.into()])
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Caller is not the admin"));

    let err = system
        .service
        .send(&devnet, &deployer, "upgradeTo", vec![system.registry.address.into()])
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Implementation is not a deployed contract"));

    system
        .service
        .send(&devnet, &deployer, "upgradeTo", vec![next.address.into()])
        .await
        .unwrap();
    let implementation = system
        .service
        .call_address(&devnet, &deployer, "implementation", vec![])
        .await
        .unwrap();
    assert_eq!(implementation, next.address);
    let margin = system
        .service
        .call_uint(&devnet, &deployer, "dkgContributionMargin", vec![])
        .await
        .unwrap();
    assert_eq!(margin, ProvisionParams::default().dkg_contribution_margin as u128);
}
