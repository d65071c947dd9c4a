use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, Amount, MethodCall};
use beacon_crypto::contract_address;
use tracing::debug;

use crate::artifacts::ContractKind;
use crate::contracts::{grant, operator, registry, service, staking, token};
use crate::state::{Instance, Storage, WorldState};

/// Execution context of one (possibly nested) contract call.
#[derive(Clone, Copy, Debug)]
pub struct Msg {
    pub sender: Address,
    /// The contract whose code and storage are executing.
    pub this: Address,
    pub value: Amount,
}

// ── Revert helpers ───────────────────────────────────────────────────────────

pub fn revert<T>(reason: impl Into<String>) -> Result<T, BeaconError> {
    Err(BeaconError::Reverted(reason.into()))
}

pub fn require(condition: bool, reason: &str) -> Result<(), BeaconError> {
    if condition {
        Ok(())
    } else {
        revert(reason)
    }
}

/// Revert unless `address` holds a contract of one of `kinds`.
pub fn require_contract(
    world: &WorldState,
    address: &Address,
    kinds: &[ContractKind],
    label: &str,
) -> Result<(), BeaconError> {
    match world.kind_of(address) {
        Some(kind) if kinds.contains(&kind) => Ok(()),
        _ => revert(format!("{label} is not a deployed contract")),
    }
}

// ── Argument helpers ─────────────────────────────────────────────────────────

pub fn arg<'a>(call: &'a MethodCall, index: usize) -> Result<&'a AbiValue, BeaconError> {
    call.args.get(index).ok_or_else(|| {
        BeaconError::Abi(format!("{} is missing argument #{index}", call.method))
    })
}

pub fn arg_uint(call: &MethodCall, index: usize) -> Result<u128, BeaconError> {
    arg(call, index)?.as_uint()
}

pub fn arg_address(call: &MethodCall, index: usize) -> Result<Address, BeaconError> {
    arg(call, index)?.as_address()
}

pub fn arg_u64(call: &MethodCall, index: usize) -> Result<u64, BeaconError> {
    let v = arg_uint(call, index)?;
    u64::try_from(v).map_err(|_| BeaconError::Abi(format!("{v} does not fit in 64 bits")))
}

pub fn unknown_method<T>(kind: ContractKind, call: &MethodCall) -> Result<T, BeaconError> {
    Err(BeaconError::UnknownMethod {
        contract: kind.name().to_string(),
        method: call.method.clone(),
    })
}

// ── Execution ────────────────────────────────────────────────────────────────

/// Run `call` against the contract at `msg.this`. Ether in `msg.value` must
/// already have been credited to the contract.
pub fn execute(
    world: &mut WorldState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    let mut instance = world.take_contract(&msg.this)?;
    let result = dispatch(world, &mut instance, msg, call);
    world.put_contract(instance);
    result
}

fn dispatch(
    world: &mut WorldState,
    instance: &mut Instance,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    let kind = instance.kind;
    if msg.value > 0 && !kind.is_payable(&call.method) {
        return revert("function is not payable");
    }

    match &mut instance.storage {
        Storage::Library => unknown_method(kind, call),
        Storage::Token(s) => token::dispatch(s, msg, call),
        Storage::TokenGrant(s) => grant::dispatch(world, s, msg, call),
        Storage::ManagedGrant(s) => grant::dispatch_managed(world, s, msg, call),
        Storage::Registry(s) => registry::dispatch(s, msg, call),
        Storage::Escrow(s) => staking::dispatch_escrow(s, msg, call),
        Storage::Staking(s) => staking::dispatch(world, s, call),
        Storage::Service(s) => service::dispatch(world, s, msg, call),
        Storage::ServiceProxy(s) => service::dispatch_proxy(world, s, msg, call),
        Storage::Operator(s) => operator::dispatch(world, s, msg, call),
    }
}

/// Call another contract from contract `caller` with no value attached.
pub fn call_contract(
    world: &mut WorldState,
    caller: Address,
    target: Address,
    method: &str,
    args: Vec<AbiValue>,
) -> Result<Vec<AbiValue>, BeaconError> {
    let msg = Msg {
        sender: caller,
        this: target,
        value: 0,
    };
    execute(world, &msg, &MethodCall::new(method, args))
}

// ── Deployment ───────────────────────────────────────────────────────────────

/// Create a contract of `kind` from `deployer` at account nonce `nonce`.
pub fn deploy(
    world: &mut WorldState,
    deployer: Address,
    nonce: u64,
    kind: ContractKind,
    libraries: Vec<Address>,
    args: Vec<AbiValue>,
) -> Result<Address, BeaconError> {
    for (expected, address) in kind.links().iter().zip(&libraries) {
        if world.kind_of(address) != Some(*expected) {
            return revert(format!(
                "linked {} library is not deployed at {address}",
                expected.name()
            ));
        }
    }

    let address = contract_address(&deployer, nonce);
    if world.contracts.contains_key(&address) {
        return revert("contract address collision");
    }
    let msg = Msg {
        sender: deployer,
        this: address,
        value: 0,
    };
    let call = MethodCall::new("constructor", args);

    let storage = match kind {
        k if k.is_library() => Storage::Library,
        ContractKind::KeepToken => Storage::Token(token::construct(&msg)),
        ContractKind::TokenGrant => Storage::TokenGrant(grant::construct(world, &call)?),
        ContractKind::ManagedGrant => {
            Storage::ManagedGrant(grant::construct_managed(world, &call)?)
        }
        ContractKind::KeepRegistry => Storage::Registry(registry::construct(&msg)),
        ContractKind::TokenStakingEscrow => {
            Storage::Escrow(staking::construct_escrow(world, &msg, &call)?)
        }
        ContractKind::TokenStaking => Storage::Staking(staking::construct(world, &call)?),
        ContractKind::ServiceImplV1 => Storage::Service(service::ServiceState::default()),
        ContractKind::ServiceProxy => {
            Storage::ServiceProxy(service::construct_proxy(world, &msg, &call)?)
        }
        ContractKind::Operator | ContractKind::OperatorStub => {
            Storage::Operator(operator::construct(world, kind, &call)?)
        }
        _ => return unknown_method(kind, &call),
    };

    world.put_contract(Instance {
        kind,
        address,
        balance: 0,
        libraries,
        storage,
    });

    if kind == ContractKind::ServiceProxy {
        service::run_initializer(world, &msg, &call)?;
    }

    debug!(contract = kind.name(), %address, "contract created");
    Ok(address)
}
