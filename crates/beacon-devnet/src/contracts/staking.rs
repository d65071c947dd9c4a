use beacon_core::constants::{
    MINIMUM_STAKE_BASE, MINIMUM_STAKE_FLOOR, MINIMUM_STAKE_SCHEDULE_SECS, MINIMUM_STAKE_STEPS,
};
use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, Amount, MethodCall, Timestamp};

use crate::artifacts::ContractKind;
use crate::engine::{
    arg_address, arg_u64, require, require_contract, unknown_method, Msg,
};
use crate::state::WorldState;

// ── TokenStakingEscrow ───────────────────────────────────────────────────────

/// Escrow for undelegated grant stakes; ownable.
#[derive(Clone, Debug)]
pub struct EscrowState {
    pub token: Address,
    pub token_grant: Address,
    pub owner: Address,
}

pub fn construct_escrow(
    world: &WorldState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<EscrowState, BeaconError> {
    let token = arg_address(call, 0)?;
    let token_grant = arg_address(call, 1)?;
    require_contract(world, &token, &[ContractKind::KeepToken], "Token")?;
    require_contract(world, &token_grant, &[ContractKind::TokenGrant], "Token grant")?;
    Ok(EscrowState {
        token,
        token_grant,
        owner: msg.sender,
    })
}

pub fn dispatch_escrow(
    state: &mut EscrowState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "owner" => Ok(vec![AbiValue::Address(state.owner)]),
        "token" => Ok(vec![AbiValue::Address(state.token)]),
        "tokenGrant" => Ok(vec![AbiValue::Address(state.token_grant)]),
        "transferOwnership" => {
            require(msg.sender == state.owner, "Ownable: caller is not the owner")?;
            let new_owner = arg_address(call, 0)?;
            require(!new_owner.is_zero(), "Ownable: new owner is the zero address")?;
            state.owner = new_owner;
            Ok(vec![])
        }
        _ => unknown_method(ContractKind::TokenStakingEscrow, call),
    }
}

// ── TokenStaking ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct StakingState {
    pub token: Address,
    pub token_grant: Address,
    pub escrow: Address,
    pub registry: Address,
    pub initialization_period: u64,
    pub undelegation_period: u64,
    pub deployed_at: Timestamp,
}

pub fn construct(world: &WorldState, call: &MethodCall) -> Result<StakingState, BeaconError> {
    let token = arg_address(call, 0)?;
    let token_grant = arg_address(call, 1)?;
    let escrow = arg_address(call, 2)?;
    let registry = arg_address(call, 3)?;
    require_contract(world, &token, &[ContractKind::KeepToken], "Token")?;
    require_contract(world, &token_grant, &[ContractKind::TokenGrant], "Token grant")?;
    require_contract(world, &escrow, &[ContractKind::TokenStakingEscrow], "Escrow")?;
    require_contract(world, &registry, &[ContractKind::KeepRegistry], "Registry")?;

    Ok(StakingState {
        token,
        token_grant,
        escrow,
        registry,
        initialization_period: arg_u64(call, 4)?,
        undelegation_period: arg_u64(call, 5)?,
        deployed_at: world.timestamp,
    })
}

/// Minimum stake `elapsed` seconds after deployment. Drops from the base to
/// the floor in equal steps across the schedule.
pub fn minimum_stake(elapsed: u64) -> Amount {
    if elapsed >= MINIMUM_STAKE_SCHEDULE_SECS {
        return MINIMUM_STAKE_FLOOR;
    }
    let step = elapsed * MINIMUM_STAKE_STEPS / MINIMUM_STAKE_SCHEDULE_SECS;
    let drop_per_step = (MINIMUM_STAKE_BASE - MINIMUM_STAKE_FLOOR) / (MINIMUM_STAKE_STEPS as u128 - 1);
    MINIMUM_STAKE_BASE - drop_per_step * step as u128
}

pub fn dispatch(
    world: &mut WorldState,
    state: &mut StakingState,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "initializationPeriod" => Ok(vec![AbiValue::Uint(state.initialization_period as u128)]),
        "undelegationPeriod" => Ok(vec![AbiValue::Uint(state.undelegation_period as u128)]),
        "minimumStake" => {
            let elapsed = world.timestamp.saturating_sub(state.deployed_at);
            Ok(vec![AbiValue::Uint(minimum_stake(elapsed))])
        }
        "token" => Ok(vec![AbiValue::Address(state.token)]),
        "tokenGrant" => Ok(vec![AbiValue::Address(state.token_grant)]),
        "escrow" => Ok(vec![AbiValue::Address(state.escrow)]),
        "registry" => Ok(vec![AbiValue::Address(state.registry)]),
        _ => unknown_method(ContractKind::TokenStaking, call),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_stake_schedule_bounds() {
        assert_eq!(minimum_stake(0), MINIMUM_STAKE_BASE);
        assert_eq!(minimum_stake(MINIMUM_STAKE_SCHEDULE_SECS), MINIMUM_STAKE_FLOOR);
        assert_eq!(minimum_stake(u64::MAX), MINIMUM_STAKE_FLOOR);
    }

    #[test]
    fn minimum_stake_never_increases() {
        let mut last = minimum_stake(0);
        for i in 1..=20 {
            let now = minimum_stake(MINIMUM_STAKE_SCHEDULE_SECS / 20 * i);
            assert!(now <= last);
            assert!(now >= MINIMUM_STAKE_FLOOR);
            last = now;
        }
    }

    #[test]
    fn only_owner_transfers_escrow() {
        let owner = Address::from_bytes([1; 20]);
        let mut state = EscrowState {
            token: Address::ZERO,
            token_grant: Address::ZERO,
            owner,
        };
        let call = MethodCall::new("transferOwnership", vec![Address::from_bytes([2; 20]).into()]);
        let stranger = Msg {
            sender: Address::from_bytes([3; 20]),
            this: Address::ZERO,
            value: 0,
        };
        let err = dispatch_escrow(&mut state, &stranger, &call).unwrap_err();
        assert_eq!(err.revert_reason(), Some("Ownable: caller is not the owner"));
        assert_eq!(state.owner, owner);
    }
}
