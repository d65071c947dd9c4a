use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::BeaconError;

/// Amount in wei (ether) or in the token's smallest unit. u128 covers the
/// full token supply and every fee the operator contract computes.
pub type Amount = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = u64;

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lower-case hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, BeaconError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| BeaconError::Abi(format!("bad address {s}: {e}")))?;
        if bytes.len() != 20 {
            return Err(BeaconError::Abi(format!(
                "address must be 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}…)", &self.to_hex()[..8])
    }
}

impl FromStr for Address {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ── TxHash ───────────────────────────────────────────────────────────────────

/// 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash(0x{}…)", &self.to_hex()[..16])
    }
}

// ── ABI values ───────────────────────────────────────────────────────────────

/// A single argument or return value crossing the contract boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbiValue {
    Uint(u128),
    Address(Address),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl AbiValue {
    pub fn as_uint(&self) -> Result<u128, BeaconError> {
        match self {
            AbiValue::Uint(v) => Ok(*v),
            other => Err(BeaconError::Abi(format!("expected uint, got {other:?}"))),
        }
    }

    pub fn as_address(&self) -> Result<Address, BeaconError> {
        match self {
            AbiValue::Address(a) => Ok(*a),
            other => Err(BeaconError::Abi(format!("expected address, got {other:?}"))),
        }
    }

    pub fn as_bool(&self) -> Result<bool, BeaconError> {
        match self {
            AbiValue::Bool(b) => Ok(*b),
            other => Err(BeaconError::Abi(format!("expected bool, got {other:?}"))),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], BeaconError> {
        match self {
            AbiValue::Bytes(b) => Ok(b),
            other => Err(BeaconError::Abi(format!("expected bytes, got {other:?}"))),
        }
    }
}

impl From<Address> for AbiValue {
    fn from(a: Address) -> Self {
        AbiValue::Address(a)
    }
}

impl From<u128> for AbiValue {
    fn from(v: u128) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        AbiValue::Uint(v as u128)
    }
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        AbiValue::Bool(b)
    }
}

impl From<Vec<u8>> for AbiValue {
    fn from(b: Vec<u8>) -> Self {
        AbiValue::Bytes(b)
    }
}

/// Return the `index`-th output of a call, or an ABI error if it is missing.
pub fn output(values: &[AbiValue], index: usize) -> Result<&AbiValue, BeaconError> {
    values
        .get(index)
        .ok_or_else(|| BeaconError::Abi(format!("call returned no output #{index}")))
}

/// A method invocation by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<AbiValue>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: Vec<AbiValue>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

// ── Signer ───────────────────────────────────────────────────────────────────

/// The identity every deployment and transaction is issued from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Human-readable label used in logs (`deployer`, `upgrader`, ...).
    pub label: String,
    pub address: Address,
}

impl Signer {
    pub fn new(label: impl Into<String>, address: Address) -> Self {
        Self {
            label: label.into(),
            address,
        }
    }
}

impl fmt::Display for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.address)
    }
}

// ── Receipt ──────────────────────────────────────────────────────────────────

/// Confirmation of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub block_number: u64,
    /// Values returned by the invoked method.
    pub output: Vec<AbiValue>,
}

// ── ContractHandle ───────────────────────────────────────────────────────────

/// A deployed contract: its address plus the name of the ABI it is used
/// through. A proxy resolved through its implementation's ABI keeps the
/// proxy address and the implementation name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractHandle {
    pub name: String,
    pub address: Address,
}

impl ContractHandle {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.address)
    }
}
