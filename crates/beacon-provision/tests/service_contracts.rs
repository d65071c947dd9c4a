//! Service contract management on a provisioned operator.
//!
//! Each case provisions a fresh system on its own devnet.
//!
//! Run with:
//!   cargo test -p beacon-provision --test service_contracts

use beacon_core::types::{AbiValue, Amount, ContractHandle, Signer};
use beacon_devnet::{builtin_artifacts, Devnet, DevnetConfig};
use beacon_provision::{bootstrap_all, ArtifactStore, BootstrapArtifacts, ProvisionParams};

const STUB_OPERATOR: &str = "KeepRandomBeaconOperatorStub";

struct Fixture {
    devnet: Devnet,
    deployer: Signer,
    upgrader: Signer,
    first_service: Signer,
    second_service: Signer,
    stranger: Signer,
    operator: ContractHandle,
    entry_fee: Amount,
}

async fn fixture() -> Fixture {
    let devnet = Devnet::new(DevnetConfig::default());
    let deployer = devnet.signer(0).unwrap();
    let upgrader = devnet.signer(1).unwrap();
    let first_service = devnet.signer(2).unwrap();
    let second_service = devnet.signer(3).unwrap();
    let stranger = devnet.signer(4).unwrap();

    let store = ArtifactStore::from_artifacts(builtin_artifacts().unwrap());
    let system = bootstrap_all(
        &devnet,
        &deployer,
        &store,
        &BootstrapArtifacts::default().with_operator(STUB_OPERATOR),
        &ProvisionParams::default(),
    )
    .await
    .unwrap();
    let operator = system.operator;

    system
        .registry
        .send(
            &devnet,
            &deployer,
            "setServiceContractUpgrader",
            vec![operator.address.into(), upgrader.address.into()],
        )
        .await
        .unwrap();
    for service in [&first_service, &second_service] {
        operator
            .send(&devnet, &upgrader, "addServiceContract", vec![service.address.into()])
            .await
            .unwrap();
    }

    let profit = operator
        .call_uint(&devnet, &deployer, "groupProfitFee", vec![])
        .await
        .unwrap();
    let verification = operator
        .call_uint(&devnet, &deployer, "entryVerificationFee", vec![])
        .await
        .unwrap();

    Fixture {
        devnet,
        deployer,
        upgrader,
        first_service,
        second_service,
        stranger,
        operator,
        entry_fee: profit + verification,
    }
}

async fn register_group(f: &Fixture) {
    f.operator
        .send(
            &f.devnet,
            &f.deployer,
            "registerNewGroup",
            vec![AbiValue::Bytes(vec![0x11; 32])],
        )
        .await
        .unwrap();
}

fn sign_args(request_id: u128) -> Vec<AbiValue> {
    vec![AbiValue::Uint(request_id), AbiValue::Bytes(vec![0x42; 32])]
}

#[tokio::test]
async fn only_upgrader_manages_service_contracts() {
    let f = fixture().await;

    for method in ["addServiceContract", "removeServiceContract"] {
        let err = f
            .operator
            .send(&f.devnet, &f.stranger, method, vec![f.stranger.address.into()])
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some("Not authorized"), "{method}");

        let err = f
            .operator
            .send(&f.devnet, &f.deployer, method, vec![f.stranger.address.into()])
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some("Not authorized"), "{method}");
    }

    assert!(!f
        .operator
        .call_bool(&f.devnet, &f.deployer, "isServiceContract", vec![f.stranger.address.into()])
        .await
        .unwrap());
}

#[tokio::test]
async fn removed_service_contract_can_no_longer_request_entries() {
    let f = fixture().await;
    register_group(&f).await;
    let snapshot = f.devnet.snapshot().await;

    f.operator
        .send(
            &f.devnet,
            &f.upgrader,
            "removeServiceContract",
            vec![f.first_service.address.into()],
        )
        .await
        .unwrap();

    let err = f
        .operator
        .send_value(&f.devnet, &f.first_service, "sign", sign_args(1), f.entry_fee)
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Caller is not a service contract"));

    f.operator
        .send_value(&f.devnet, &f.second_service, "sign", sign_args(2), f.entry_fee)
        .await
        .unwrap();

    // Back to both contracts registered.
    f.devnet.revert_to(snapshot).await.unwrap();
    f.operator
        .send_value(&f.devnet, &f.first_service, "sign", sign_args(3), f.entry_fee)
        .await
        .unwrap();
    let requests = f
        .operator
        .call_uint(&f.devnet, &f.deployer, "entryRequestsCount", vec![])
        .await
        .unwrap();
    assert_eq!(requests, 1);
}

#[tokio::test]
async fn added_service_contract_pays_entry_fee() {
    let f = fixture().await;
    register_group(&f).await;

    f.operator
        .send_value(&f.devnet, &f.second_service, "sign", sign_args(1), f.entry_fee)
        .await
        .unwrap();

    let err = f
        .operator
        .send_value(&f.devnet, &f.stranger, "sign", sign_args(2), f.entry_fee)
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Caller is not a service contract"));

    let err = f
        .operator
        .send_value(&f.devnet, &f.second_service, "sign", sign_args(3), f.entry_fee - 1)
        .await
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("Insufficient new entry fee"));
}

#[tokio::test]
async fn entries_need_a_registered_group() {
    let f = fixture().await;
    let snapshot = f.devnet.snapshot().await;

    let err = f
        .operator
        .send_value(&f.devnet, &f.first_service, "sign", sign_args(1), f.entry_fee)
        .await
        .unwrap_err();
    assert_eq!(
        err.revert_reason(),
        Some("At least one group needed to serve the request")
    );

    register_group(&f).await;
    let groups = f
        .operator
        .call_uint(&f.devnet, &f.deployer, "numberOfGroups", vec![])
        .await
        .unwrap();
    assert_eq!(groups, 1);

    f.devnet.revert_to(snapshot).await.unwrap();
    let groups = f
        .operator
        .call_uint(&f.devnet, &f.deployer, "numberOfGroups", vec![])
        .await
        .unwrap();
    assert_eq!(groups, 0);
}
