use beacon_core::error::BeaconError;
use beacon_core::types::{output, AbiValue, Address, MethodCall};
use beacon_crypto::abi::{decode_call, parse_signature, selector};

use crate::artifacts::ContractKind;
use crate::engine::{
    arg, arg_address, arg_u64, call_contract, execute, require, require_contract, unknown_method,
    Msg,
};
use crate::state::WorldState;

/// Implementation methods reachable through ABI-encoded proxy init data.
pub const SERVICE_INIT_SIGNATURES: &[&str] = &[
    "initialize(uint256,address)",
    "addOperatorContract(address)",
    "removeOperatorContract(address)",
];

/// Storage of the random beacon service, held by whichever contract the
/// implementation code runs in (the proxy, normally).
#[derive(Clone, Debug, Default)]
pub struct ServiceState {
    pub initialized: bool,
    pub dkg_contribution_margin: u64,
    pub registry: Address,
    pub operator_contracts: Vec<Address>,
}

fn only_operator_contract_upgrader(
    world: &mut WorldState,
    state: &ServiceState,
    msg: &Msg,
) -> Result<(), BeaconError> {
    let out = call_contract(
        world,
        msg.this,
        state.registry,
        "operatorContractUpgraderFor",
        vec![msg.this.into()],
    )?;
    let upgrader = output(&out, 0)?.as_address()?;
    require(
        msg.sender == upgrader,
        "Caller is not operator contract upgrader",
    )
}

pub fn dispatch(
    world: &mut WorldState,
    state: &mut ServiceState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "initialize" => {
            require(!state.initialized, "Contract is already initialized.")?;
            let margin = arg_u64(call, 0)?;
            let registry = arg_address(call, 1)?;
            require_contract(world, &registry, &[ContractKind::KeepRegistry], "Registry")?;
            state.initialized = true;
            state.dkg_contribution_margin = margin;
            state.registry = registry;
            Ok(vec![])
        }
        "initialized" => Ok(vec![AbiValue::Bool(state.initialized)]),
        "dkgContributionMargin" => Ok(vec![AbiValue::Uint(state.dkg_contribution_margin as u128)]),
        "registry" => Ok(vec![AbiValue::Address(state.registry)]),

        // ── Operator contracts ───────────────────────────────────────────────
        "addOperatorContract" => {
            require(state.initialized, "Contract is not initialized")?;
            only_operator_contract_upgrader(world, state, msg)?;
            let operator = arg_address(call, 0)?;
            let out = call_contract(
                world,
                msg.this,
                state.registry,
                "isApprovedOperatorContract",
                vec![operator.into()],
            )?;
            require(output(&out, 0)?.as_bool()?, "Operator contract is not approved")?;
            if !state.operator_contracts.contains(&operator) {
                state.operator_contracts.push(operator);
            }
            Ok(vec![])
        }
        "removeOperatorContract" => {
            require(state.initialized, "Contract is not initialized")?;
            only_operator_contract_upgrader(world, state, msg)?;
            let operator = arg_address(call, 0)?;
            state.operator_contracts.retain(|c| *c != operator);
            Ok(vec![])
        }
        "isOperatorContract" => {
            let operator = arg_address(call, 0)?;
            Ok(vec![AbiValue::Bool(state.operator_contracts.contains(&operator))])
        }
        "operatorContractsCount" => Ok(vec![AbiValue::Uint(state.operator_contracts.len() as u128)]),

        _ => unknown_method(ContractKind::ServiceImplV1, call),
    }
}

// ── Proxy ────────────────────────────────────────────────────────────────────

/// Upgradable proxy: admin bookkeeping plus the service storage the
/// implementation operates on.
#[derive(Clone, Debug)]
pub struct ServiceProxyState {
    pub implementation: Address,
    pub admin: Address,
    pub service: ServiceState,
}

pub fn construct_proxy(
    world: &WorldState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<ServiceProxyState, BeaconError> {
    let implementation = arg_address(call, 0)?;
    require_contract(
        world,
        &implementation,
        &[ContractKind::ServiceImplV1],
        "Implementation",
    )?;
    Ok(ServiceProxyState {
        implementation,
        admin: msg.sender,
        service: ServiceState::default(),
    })
}

/// Decode ABI-encoded calldata against the known implementation methods.
pub fn decode_service_call(data: &[u8]) -> Result<MethodCall, BeaconError> {
    for signature in SERVICE_INIT_SIGNATURES {
        if data.len() >= 4 && data[..4] == selector(signature) {
            let (name, _) = parse_signature(signature)?;
            let args = decode_call(signature, data)?;
            return Ok(MethodCall::new(name, args));
        }
    }
    Err(BeaconError::Abi("init data does not match any service method".into()))
}

/// Run the proxy constructor's init data against the freshly created proxy.
pub fn run_initializer(
    world: &mut WorldState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<(), BeaconError> {
    let data = arg(call, 1)?.as_bytes()?;
    if data.is_empty() {
        return Ok(());
    }
    let init = decode_service_call(data)?;
    execute(world, msg, &init)?;
    Ok(())
}

pub fn dispatch_proxy(
    world: &mut WorldState,
    state: &mut ServiceProxyState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "admin" => Ok(vec![AbiValue::Address(state.admin)]),
        "implementation" => Ok(vec![AbiValue::Address(state.implementation)]),
        "upgradeTo" => {
            require(msg.sender == state.admin, "Caller is not the admin")?;
            let implementation = arg_address(call, 0)?;
            require_contract(
                world,
                &implementation,
                &[ContractKind::ServiceImplV1],
                "Implementation",
            )?;
            state.implementation = implementation;
            Ok(vec![])
        }
        _ => {
            require_contract(
                world,
                &state.implementation,
                &[ContractKind::ServiceImplV1],
                "Implementation",
            )?;
            dispatch(world, &mut state.service, msg, call)
        }
    }
}
