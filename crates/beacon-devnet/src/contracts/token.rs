use std::collections::HashMap;

use beacon_core::constants::TOKEN_TOTAL_SUPPLY;
use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, Amount, MethodCall};

use crate::artifacts::ContractKind;
use crate::engine::{arg_address, arg_uint, require, unknown_method, Msg};

/// ERC-20 token with a fixed supply minted to the deployer.
#[derive(Clone, Debug, Default)]
pub struct TokenState {
    pub total_supply: Amount,
    pub balances: HashMap<Address, Amount>,
    pub allowances: HashMap<(Address, Address), Amount>,
}

impl TokenState {
    pub fn balance(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn move_tokens(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), BeaconError> {
        require(!to.is_zero(), "ERC20: transfer to the zero address")?;
        let have = self.balance(&from);
        require(have >= amount, "ERC20: transfer amount exceeds balance")?;
        self.balances.insert(from, have - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

pub fn construct(msg: &Msg) -> TokenState {
    let mut state = TokenState {
        total_supply: TOKEN_TOTAL_SUPPLY,
        ..Default::default()
    };
    state.balances.insert(msg.sender, TOKEN_TOTAL_SUPPLY);
    state
}

pub fn dispatch(
    state: &mut TokenState,
    msg: &Msg,
    call: &MethodCall,
) -> Result<Vec<AbiValue>, BeaconError> {
    match call.method.as_str() {
        "totalSupply" => Ok(vec![AbiValue::Uint(state.total_supply)]),
        "balanceOf" => Ok(vec![AbiValue::Uint(state.balance(&arg_address(call, 0)?))]),
        "allowance" => {
            let key = (arg_address(call, 0)?, arg_address(call, 1)?);
            Ok(vec![AbiValue::Uint(
                state.allowances.get(&key).copied().unwrap_or(0),
            )])
        }
        "transfer" => {
            state.move_tokens(msg.sender, arg_address(call, 0)?, arg_uint(call, 1)?)?;
            Ok(vec![AbiValue::Bool(true)])
        }
        "approve" => {
            let spender = arg_address(call, 0)?;
            require(!spender.is_zero(), "ERC20: approve to the zero address")?;
            state
                .allowances
                .insert((msg.sender, spender), arg_uint(call, 1)?);
            Ok(vec![AbiValue::Bool(true)])
        }
        "transferFrom" => {
            let from = arg_address(call, 0)?;
            let to = arg_address(call, 1)?;
            let amount = arg_uint(call, 2)?;
            let key = (from, msg.sender);
            let allowed = state.allowances.get(&key).copied().unwrap_or(0);
            require(allowed >= amount, "ERC20: transfer amount exceeds allowance")?;
            state.move_tokens(from, to, amount)?;
            state.allowances.insert(key, allowed - amount);
            Ok(vec![AbiValue::Bool(true)])
        }
        _ => unknown_method(ContractKind::KeepToken, call),
    }
}
