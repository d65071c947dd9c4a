//! The chain a provisioning run talks to.
//!
//! Every operation blocks until the network confirms it. Implementations
//! execute each transaction atomically: a revert leaves no state behind and
//! surfaces as [`BeaconError::Reverted`] carrying the revert reason.

use crate::error::BeaconError;
use crate::types::{
    AbiValue, Address, Amount, ContractHandle, MethodCall, Receipt, Signer, Timestamp,
};

#[allow(async_fn_in_trait)]
pub trait Chain {
    /// Identifier of the network, used to scope library links.
    async fn network_id(&self) -> Result<u64, BeaconError>;

    /// Deploy fully linked `bytecode` with constructor `args`, returning the
    /// new contract address.
    async fn deploy(
        &self,
        signer: &Signer,
        bytecode: &str,
        args: Vec<AbiValue>,
    ) -> Result<Address, BeaconError>;

    /// Send a state-changing transaction, optionally carrying `value` wei.
    async fn send(
        &self,
        signer: &Signer,
        to: &Address,
        call: MethodCall,
        value: Amount,
    ) -> Result<Receipt, BeaconError>;

    /// Execute a read-only call; state changes are discarded.
    async fn call(
        &self,
        signer: &Signer,
        to: &Address,
        call: MethodCall,
    ) -> Result<Vec<AbiValue>, BeaconError>;

    /// Ether balance of an account or contract.
    async fn balance(&self, address: &Address) -> Result<Amount, BeaconError>;

    /// Timestamp of the latest block.
    async fn block_timestamp(&self) -> Result<Timestamp, BeaconError>;
}

impl ContractHandle {
    /// Send `method(args)` to this contract without value.
    pub async fn send<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        method: &str,
        args: Vec<AbiValue>,
    ) -> Result<Receipt, BeaconError> {
        chain
            .send(signer, &self.address, MethodCall::new(method, args), 0)
            .await
    }

    /// Send `method(args)` to this contract carrying `value` wei.
    pub async fn send_value<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        method: &str,
        args: Vec<AbiValue>,
        value: Amount,
    ) -> Result<Receipt, BeaconError> {
        chain
            .send(signer, &self.address, MethodCall::new(method, args), value)
            .await
    }

    pub async fn call<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        method: &str,
        args: Vec<AbiValue>,
    ) -> Result<Vec<AbiValue>, BeaconError> {
        chain
            .call(signer, &self.address, MethodCall::new(method, args))
            .await
    }

    /// Call a view returning a single uint.
    pub async fn call_uint<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        method: &str,
        args: Vec<AbiValue>,
    ) -> Result<u128, BeaconError> {
        let out = self.call(chain, signer, method, args).await?;
        crate::types::output(&out, 0)?.as_uint()
    }

    /// Call a view returning a single address.
    pub async fn call_address<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        method: &str,
        args: Vec<AbiValue>,
    ) -> Result<Address, BeaconError> {
        let out = self.call(chain, signer, method, args).await?;
        crate::types::output(&out, 0)?.as_address()
    }

    /// Call a view returning a single bool.
    pub async fn call_bool<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        method: &str,
        args: Vec<AbiValue>,
    ) -> Result<bool, BeaconError> {
        let out = self.call(chain, signer, method, args).await?;
        crate::types::output(&out, 0)?.as_bool()
    }
}
