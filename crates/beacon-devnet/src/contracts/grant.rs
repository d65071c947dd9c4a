use beacon_core::error::BeaconError;
use beacon_core::types::{output, AbiValue, Address, Amount, MethodCall, Timestamp};
use beacon_core::unlock::unlocked_amount;

use crate::artifacts::ContractKind;
use crate::engine::{
    arg_address, arg_u64, arg_uint, call_contract, require, require_contract, unknown_method, Msg,
};
use crate::state::WorldState;

/// One token grant: `amount` unlocks linearly over `duration` seconds from
/// `start`, with nothing unlocked before `cliff`.
#[derive(Clone, Debug)]
pub struct GrantEntry {
    pub grantee: Address,
    pub amount: Amount,
    pub withdrawn: Amount,
    pub start: Timestamp,
    pub cliff: Timestamp,
    pub duration: u64,
}

impl GrantEntry {
    pub fn unlocked(&self, now: Timestamp) -> Amount {
        unlocked_amount(self.amount, self.start, self.cliff, self.duration, now)
    }

    pub fn withdrawable(&self, now: Timestamp) -> Amount {
        self.unlocked(now).saturating_sub(self.withdrawn)
    }
}

#[derive(Clone, Debug)]
pub struct GrantState {
    pub token: Address,
    pub grants: Vec<GrantEntry>,
}

impl GrantState {
    fn index(call: &MethodCall) -> Result<usize, BeaconError> {
        usize::try_from(arg_uint(call, 0)?)
            .map_err(|_| BeaconError::Reverted("Grant does not exist".into()))
    }

    fn entry(&self, call: &MethodCall) -> Result<&GrantEntry, BeaconError> {
        self.grants
            .get(Self::index(call)?)
            .ok_or_else(|| BeaconError::Reverted("Grant does not exist".into()))
    }

    fn entry_mut(&mut self, call: &MethodCall) -> Result<&mut GrantEntry, BeaconError> {
        self.grants
            .get_mut(Self::index(call)?)
            .ok_or_else(|| BeaconError::Reverted("Grant does not exist".into()))
    }
}

pub fn construct(world: &WorldState, call: &MethodCall) -> Result<GrantState, BeaconError> {
    let token = arg_address(call, 0)?;
    require_contract(world, &token, &[ContractKind::KeepToken], "Token")?;
    Ok(GrantState {
        token,
        grants: Vec::new(),
    })
}

pub fn dispatch(
    world: &mut WorldState,
    state: &mut GrantState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    let now = world.timestamp;
    match call.method.as_str() {
        // ── grant(amount, grantee, duration, start, cliffDuration) ──────────
        "grant" => {
            let amount = arg_uint(call, 0)?;
            let grantee = arg_address(call, 1)?;
            let duration = arg_u64(call, 2)?;
            let start = arg_u64(call, 3)?;
            let cliff_duration = arg_u64(call, 4)?;

            require(amount > 0, "Amount must be greater than zero")?;
            require(!grantee.is_zero(), "Grantee address can't be zero")?;
            require(duration > 0, "Unlocking duration must be greater than zero")?;
            require(
                duration >= cliff_duration,
                "Unlocking duration must be greater than cliff",
            )?;
            let cliff = start
                .checked_add(cliff_duration)
                .ok_or_else(|| BeaconError::Reverted("SafeMath: addition overflow".into()))?;

            call_contract(
                world,
                msg.this,
                state.token,
                "transferFrom",
                vec![msg.sender.into(), msg.this.into(), AbiValue::Uint(amount)],
            )?;

            let id = state.grants.len() as u128;
            state.grants.push(GrantEntry {
                grantee,
                amount,
                withdrawn: 0,
                start,
                cliff,
                duration,
            });
            Ok(vec![AbiValue::Uint(id)])
        }

        "numGrants" => Ok(vec![AbiValue::Uint(state.grants.len() as u128)]),

        "getGrant" => {
            let g = state.entry(call)?;
            Ok(vec![
                AbiValue::Uint(g.amount),
                AbiValue::Uint(g.withdrawn),
                AbiValue::Uint(g.start as u128),
                AbiValue::Uint(g.cliff as u128),
                AbiValue::Uint(g.duration as u128),
                AbiValue::Address(g.grantee),
            ])
        }

        "unlockedAmount" => Ok(vec![AbiValue::Uint(state.entry(call)?.unlocked(now))]),

        "withdrawable" => Ok(vec![AbiValue::Uint(state.entry(call)?.withdrawable(now))]),

        "withdraw" => {
            let entry = state.entry_mut(call)?;
            require(
                msg.sender == entry.grantee,
                "Only grantee of the grant can withdraw.",
            )?;
            let amount = entry.withdrawable(now);
            require(
                amount > 0,
                "Grant available to withdraw amount should be greater than zero.",
            )?;
            entry.withdrawn += amount;
            let grantee = entry.grantee;

            call_contract(
                world,
                msg.this,
                state.token,
                "transfer",
                vec![grantee.into(), AbiValue::Uint(amount)],
            )?;
            Ok(vec![AbiValue::Uint(amount)])
        }

        _ => unknown_method(ContractKind::TokenGrant, call),
    }
}

// ── ManagedGrant ─────────────────────────────────────────────────────────────

/// A grant held by an intermediary contract on behalf of `grantee`.
#[derive(Clone, Debug)]
pub struct ManagedGrantState {
    pub token: Address,
    pub token_grant: Address,
    pub manager: Address,
    pub grant_id: u128,
    pub grantee: Address,
}

pub fn construct_managed(
    world: &WorldState,
    call: &MethodCall,
) -> Result<ManagedGrantState, BeaconError> {
    let token = arg_address(call, 0)?;
    let token_grant = arg_address(call, 1)?;
    require_contract(world, &token, &[ContractKind::KeepToken], "Token")?;
    require_contract(world, &token_grant, &[ContractKind::TokenGrant], "Token grant")?;
    Ok(ManagedGrantState {
        token,
        token_grant,
        manager: arg_address(call, 2)?,
        grant_id: arg_uint(call, 3)?,
        grantee: arg_address(call, 4)?,
    })
}

pub fn dispatch_managed(
    world: &mut WorldState,
    state: &mut ManagedGrantState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "grantee" => Ok(vec![AbiValue::Address(state.grantee)]),
        "grantId" => Ok(vec![AbiValue::Uint(state.grant_id)]),
        "grantManager" => Ok(vec![AbiValue::Address(state.manager)]),
        "withdraw" => {
            require(msg.sender == state.grantee, "Only grantee may perform this action")?;
            call_contract(
                world,
                msg.this,
                state.token_grant,
                "withdraw",
                vec![AbiValue::Uint(state.grant_id)],
            )?;
            let held = call_contract(
                world,
                msg.this,
                state.token,
                "balanceOf",
                vec![msg.this.into()],
            )?;
            let amount = output(&held, 0)?.as_uint()?;
            call_contract(
                world,
                msg.this,
                state.token,
                "transfer",
                vec![state.grantee.into(), AbiValue::Uint(amount)],
            )?;
            Ok(vec![AbiValue::Uint(amount)])
        }
        _ => unknown_method(ContractKind::ManagedGrant, call),
    }
}
