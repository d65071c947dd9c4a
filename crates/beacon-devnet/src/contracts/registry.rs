use std::collections::HashMap;

use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, MethodCall};

use crate::artifacts::ContractKind;
use crate::engine::{arg_address, require, unknown_method, Msg};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorContractStatus {
    New,
    Approved,
    Disabled,
}

/// Governance registry: which operator contracts are approved and who may
/// upgrade service and operator contracts.
#[derive(Clone, Debug)]
pub struct RegistryState {
    pub governance: Address,
    pub registry_keeper: Address,
    pub panic_button: Address,
    pub operator_contracts: HashMap<Address, OperatorContractStatus>,
    /// service contract → address allowed to add/remove its operator contracts
    pub operator_contract_upgraders: HashMap<Address, Address>,
    /// operator contract → address allowed to add/remove its service contracts
    pub service_contract_upgraders: HashMap<Address, Address>,
}

impl RegistryState {
    fn status(&self, operator: &Address) -> OperatorContractStatus {
        self.operator_contracts
            .get(operator)
            .copied()
            .unwrap_or(OperatorContractStatus::New)
    }
}

pub fn construct(msg: &Msg) -> RegistryState {
    RegistryState {
        governance: msg.sender,
        registry_keeper: msg.sender,
        panic_button: msg.sender,
        operator_contracts: HashMap::new(),
        operator_contract_upgraders: HashMap::new(),
        service_contract_upgraders: HashMap::new(),
    }
}

pub fn dispatch(
    state: &mut RegistryState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "governance" => Ok(vec![AbiValue::Address(state.governance)]),
        "registryKeeper" => Ok(vec![AbiValue::Address(state.registry_keeper)]),
        "panicButton" => Ok(vec![AbiValue::Address(state.panic_button)]),

        // ── Operator contract status ─────────────────────────────────────────
        "approveOperatorContract" => {
            require(msg.sender == state.registry_keeper, "Not authorized")?;
            let operator = arg_address(call, 0)?;
            require(
                state.status(&operator) == OperatorContractStatus::New,
                "Operator contract must be new",
            )?;
            state
                .operator_contracts
                .insert(operator, OperatorContractStatus::Approved);
            Ok(vec![])
        }
        "disableOperatorContract" => {
            require(msg.sender == state.panic_button, "Not authorized")?;
            let operator = arg_address(call, 0)?;
            require(
                state.status(&operator) == OperatorContractStatus::Approved,
                "Operator contract must be approved",
            )?;
            state
                .operator_contracts
                .insert(operator, OperatorContractStatus::Disabled);
            Ok(vec![])
        }
        "isApprovedOperatorContract" => {
            let operator = arg_address(call, 0)?;
            Ok(vec![AbiValue::Bool(
                state.status(&operator) == OperatorContractStatus::Approved,
            )])
        }

        // ── Upgraders ────────────────────────────────────────────────────────
        "setOperatorContractUpgrader" => {
            require(msg.sender == state.governance, "Not authorized")?;
            state
                .operator_contract_upgraders
                .insert(arg_address(call, 0)?, arg_address(call, 1)?);
            Ok(vec![])
        }
        "operatorContractUpgraderFor" => {
            let service = arg_address(call, 0)?;
            let upgrader = state
                .operator_contract_upgraders
                .get(&service)
                .copied()
                .unwrap_or(Address::ZERO);
            Ok(vec![AbiValue::Address(upgrader)])
        }
        "setServiceContractUpgrader" => {
            require(msg.sender == state.governance, "Not authorized")?;
            state
                .service_contract_upgraders
                .insert(arg_address(call, 0)?, arg_address(call, 1)?);
            Ok(vec![])
        }
        "serviceContractUpgraderFor" => {
            let operator = arg_address(call, 0)?;
            let upgrader = state
                .service_contract_upgraders
                .get(&operator)
                .copied()
                .unwrap_or(Address::ZERO);
            Ok(vec![AbiValue::Address(upgrader)])
        }

        _ => unknown_method(ContractKind::KeepRegistry, call),
    }
}
