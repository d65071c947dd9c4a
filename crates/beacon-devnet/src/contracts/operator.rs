use beacon_core::constants::{
    DKG_GAS_ESTIMATE, ENTRY_VERIFICATION_GAS_ESTIMATE, GAS_PRICE_CEILING, GROUP_MEMBER_BASE_REWARD,
    GROUP_SIZE,
};
use beacon_core::error::BeaconError;
use beacon_core::types::{output, AbiValue, Address, Amount, MethodCall};
use tracing::debug;

use crate::artifacts::ContractKind;
use crate::engine::{
    arg, arg_address, arg_uint, call_contract, require, require_contract, unknown_method, Msg,
};
use crate::state::WorldState;

/// A relay entry request accepted from a service contract.
#[derive(Clone, Debug)]
pub struct EntryRequest {
    pub request_id: u128,
    pub service_contract: Address,
    pub previous_entry: Vec<u8>,
    pub fee: Amount,
}

/// Random beacon operator contract. BLS signing, group selection and DKG
/// verification are not executed; the contract tracks the bookkeeping the
/// provisioning flow and service management depend on.
#[derive(Clone, Debug)]
pub struct OperatorState {
    pub stub: bool,
    pub service_contracts: Vec<Address>,
    pub staking: Address,
    pub registry: Address,
    pub groups: Vec<Vec<u8>>,
    pub genesis_triggered: bool,
    pub group_selection_in_progress: bool,
    pub dkg_fee_pool: Amount,
    pub entry_requests: Vec<EntryRequest>,
}

pub fn dkg_fee() -> Amount {
    DKG_GAS_ESTIMATE * GAS_PRICE_CEILING
}

pub fn group_profit_fee() -> Amount {
    GROUP_MEMBER_BASE_REWARD * GROUP_SIZE
}

pub fn entry_verification_fee() -> Amount {
    ENTRY_VERIFICATION_GAS_ESTIMATE * GAS_PRICE_CEILING
}

pub fn construct(
    world: &WorldState,
    kind: ContractKind,
    call: &MethodCall,
) -> Result<OperatorState, BeaconError> {
    let service = arg_address(call, 0)?;
    let staking = arg_address(call, 1)?;
    let registry = arg_address(call, 2)?;
    require_contract(
        world,
        &service,
        &[ContractKind::ServiceProxy, ContractKind::ServiceImplV1],
        "Service contract",
    )?;
    require_contract(world, &staking, &[ContractKind::TokenStaking], "Staking contract")?;
    require_contract(world, &registry, &[ContractKind::KeepRegistry], "Registry")?;

    Ok(OperatorState {
        stub: kind == ContractKind::OperatorStub,
        service_contracts: vec![service],
        staking,
        registry,
        groups: Vec::new(),
        genesis_triggered: false,
        group_selection_in_progress: false,
        dkg_fee_pool: 0,
        entry_requests: Vec::new(),
    })
}

fn only_service_contract_upgrader(
    world: &mut WorldState,
    state: &OperatorState,
    msg: &Msg,
) -> Result<(), BeaconError> {
    let out = call_contract(
        world,
        msg.this,
        state.registry,
        "serviceContractUpgraderFor",
        vec![msg.this.into()],
    )?;
    let upgrader = output(&out, 0)?.as_address()?;
    require(msg.sender == upgrader, "Not authorized")
}

pub fn dispatch(
    world: &mut WorldState,
    state: &mut OperatorState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    let kind = if state.stub {
        ContractKind::OperatorStub
    } else {
        ContractKind::Operator
    };

    match call.method.as_str() {
        // ── Fee parameters ───────────────────────────────────────────────────
        "dkgGasEstimate" => Ok(vec![AbiValue::Uint(DKG_GAS_ESTIMATE)]),
        "gasPriceCeiling" => Ok(vec![AbiValue::Uint(GAS_PRICE_CEILING)]),
        "groupProfitFee" => Ok(vec![AbiValue::Uint(group_profit_fee())]),
        "entryVerificationFee" => Ok(vec![AbiValue::Uint(entry_verification_fee())]),
        "dkgFeePool" => Ok(vec![AbiValue::Uint(state.dkg_fee_pool)]),

        // ── Genesis ──────────────────────────────────────────────────────────
        "genesis" => {
            require(
                !state.genesis_triggered && state.groups.is_empty(),
                "Not awaiting genesis",
            )?;
            require(msg.value >= dkg_fee(), "Insufficient DKG fee")?;
            state.genesis_triggered = true;
            state.group_selection_in_progress = true;
            state.dkg_fee_pool += msg.value;
            debug!(fee = %msg.value, "genesis triggered group selection");
            Ok(vec![])
        }
        "isGroupSelectionInProgress" => Ok(vec![AbiValue::Bool(state.group_selection_in_progress)]),
        "numberOfGroups" => Ok(vec![AbiValue::Uint(state.groups.len() as u128)]),

        // ── Service contracts ────────────────────────────────────────────────
        "addServiceContract" => {
            only_service_contract_upgrader(world, state, msg)?;
            let service = arg_address(call, 0)?;
            if !state.service_contracts.contains(&service) {
                state.service_contracts.push(service);
            }
            Ok(vec![])
        }
        "removeServiceContract" => {
            only_service_contract_upgrader(world, state, msg)?;
            let service = arg_address(call, 0)?;
            state.service_contracts.retain(|s| *s != service);
            Ok(vec![])
        }
        "isServiceContract" => {
            let service = arg_address(call, 0)?;
            Ok(vec![AbiValue::Bool(state.service_contracts.contains(&service))])
        }

        // ── Relay entries ────────────────────────────────────────────────────
        "sign" => {
            require(
                state.service_contracts.contains(&msg.sender),
                "Caller is not a service contract",
            )?;
            require(
                msg.value >= group_profit_fee() + entry_verification_fee(),
                "Insufficient new entry fee",
            )?;
            require(
                !state.groups.is_empty(),
                "At least one group needed to serve the request",
            )?;
            let request_id = arg_uint(call, 0)?;
            let previous_entry = arg(call, 1)?.as_bytes()?.to_vec();
            state.entry_requests.push(EntryRequest {
                request_id,
                service_contract: msg.sender,
                previous_entry,
                fee: msg.value,
            });
            Ok(vec![])
        }
        "entryRequestsCount" => Ok(vec![AbiValue::Uint(state.entry_requests.len() as u128)]),

        // ── Test hook ────────────────────────────────────────────────────────
        "registerNewGroup" if state.stub => {
            let public_key = arg(call, 0)?.as_bytes()?.to_vec();
            state.groups.push(public_key);
            state.group_selection_in_progress = false;
            Ok(vec![])
        }

        _ => unknown_method(kind, call),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fees_follow_gas_parameters() {
        assert_eq!(dkg_fee(), 52_200_000_000_000_000);
        assert_eq!(group_profit_fee(), 9_280_000_000_000_000);
        assert_eq!(entry_verification_fee(), 37_200_000_000_000_000);
    }
}
