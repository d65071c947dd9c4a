//! Contract set understood by the development chain, and its bytecode format.
//!
//! Devnet bytecode is `60 80 <len> <name bytes>` followed by one 20-byte
//! address per library the contract links, in `ContractKind::links` order.
//! Unlinked artifacts carry `__Name___…` placeholders in those slots.

use beacon_core::artifact::{link_placeholder, ContractArtifact};
use beacon_core::error::BeaconError;
use beacon_core::types::Address;

const PREAMBLE: [u8; 2] = [0x60, 0x80];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractKind {
    KeepToken,
    TokenGrant,
    ManagedGrant,
    KeepRegistry,
    TokenStakingEscrow,
    TokenStaking,
    MinimumStakeSchedule,
    GrantStaking,
    Locks,
    ServiceImplV1,
    ServiceProxy,
    Operator,
    OperatorStub,
    Bls,
    GroupSelection,
    Groups,
    DelayFactor,
    DkgResultVerification,
    Reimbursements,
}

impl ContractKind {
    pub const ALL: [ContractKind; 19] = [
        ContractKind::KeepToken,
        ContractKind::TokenGrant,
        ContractKind::ManagedGrant,
        ContractKind::KeepRegistry,
        ContractKind::TokenStakingEscrow,
        ContractKind::TokenStaking,
        ContractKind::MinimumStakeSchedule,
        ContractKind::GrantStaking,
        ContractKind::Locks,
        ContractKind::ServiceImplV1,
        ContractKind::ServiceProxy,
        ContractKind::Operator,
        ContractKind::OperatorStub,
        ContractKind::Bls,
        ContractKind::GroupSelection,
        ContractKind::Groups,
        ContractKind::DelayFactor,
        ContractKind::DkgResultVerification,
        ContractKind::Reimbursements,
    ];

    /// Artifact name, as the build toolchain emits it.
    pub fn name(self) -> &'static str {
        match self {
            ContractKind::KeepToken => "KeepToken",
            ContractKind::TokenGrant => "TokenGrant",
            ContractKind::ManagedGrant => "ManagedGrant",
            ContractKind::KeepRegistry => "KeepRegistry",
            ContractKind::TokenStakingEscrow => "TokenStakingEscrow",
            ContractKind::TokenStaking => "TokenStaking",
            ContractKind::MinimumStakeSchedule => "MinimumStakeSchedule",
            ContractKind::GrantStaking => "GrantStaking",
            ContractKind::Locks => "Locks",
            ContractKind::ServiceImplV1 => "KeepRandomBeaconServiceImplV1",
            ContractKind::ServiceProxy => "KeepRandomBeaconService",
            ContractKind::Operator => "KeepRandomBeaconOperator",
            ContractKind::OperatorStub => "KeepRandomBeaconOperatorStub",
            ContractKind::Bls => "BLS",
            ContractKind::GroupSelection => "GroupSelection",
            ContractKind::Groups => "Groups",
            ContractKind::DelayFactor => "DelayFactor",
            ContractKind::DkgResultVerification => "DKGResultVerification",
            ContractKind::Reimbursements => "Reimbursements",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Libraries woven into this contract's bytecode, in slot order.
    pub fn links(self) -> &'static [ContractKind] {
        match self {
            ContractKind::TokenStaking => &[
                ContractKind::MinimumStakeSchedule,
                ContractKind::GrantStaking,
                ContractKind::Locks,
            ],
            ContractKind::Groups => &[ContractKind::Bls],
            ContractKind::Operator | ContractKind::OperatorStub => &[
                ContractKind::Bls,
                ContractKind::DelayFactor,
                ContractKind::GroupSelection,
                ContractKind::Groups,
                ContractKind::DkgResultVerification,
                ContractKind::Reimbursements,
            ],
            _ => &[],
        }
    }

    pub fn is_library(self) -> bool {
        matches!(
            self,
            ContractKind::MinimumStakeSchedule
                | ContractKind::GrantStaking
                | ContractKind::Locks
                | ContractKind::Bls
                | ContractKind::GroupSelection
                | ContractKind::Groups
                | ContractKind::DelayFactor
                | ContractKind::DkgResultVerification
                | ContractKind::Reimbursements
        )
    }

    /// Methods that accept ether.
    pub fn is_payable(self, method: &str) -> bool {
        matches!(
            (self, method),
            (ContractKind::Operator | ContractKind::OperatorStub, "genesis" | "sign")
        )
    }
}

/// Unlinked artifact for `kind`.
pub fn artifact(kind: ContractKind) -> Result<ContractArtifact, BeaconError> {
    let name = kind.name().as_bytes();
    let mut header = PREAMBLE.to_vec();
    header.push(name.len() as u8);
    header.extend_from_slice(name);

    let mut bytecode = hex::encode(header);
    for library in kind.links() {
        bytecode.push_str(&link_placeholder(library.name())?);
    }
    Ok(ContractArtifact::new(kind.name(), bytecode))
}

/// Every artifact the devnet can deploy.
pub fn builtin_artifacts() -> Result<Vec<ContractArtifact>, BeaconError> {
    ContractKind::ALL.iter().map(|k| artifact(*k)).collect()
}

/// Parse linked bytecode into the contract kind and its library addresses.
pub fn decode_bytecode(bytecode: &str) -> Result<(ContractKind, Vec<Address>), BeaconError> {
    let code = bytecode.strip_prefix("0x").unwrap_or(bytecode);
    if code.contains('_') {
        return Err(BeaconError::InvalidBytecode(
            "bytecode still contains library placeholders".into(),
        ));
    }
    let bytes = hex::decode(code).map_err(|e| BeaconError::InvalidBytecode(e.to_string()))?;
    if bytes.len() < 3 || bytes[..2] != PREAMBLE {
        return Err(BeaconError::InvalidBytecode("missing preamble".into()));
    }

    let name_len = bytes[2] as usize;
    let name_end = 3 + name_len;
    let name = bytes
        .get(3..name_end)
        .and_then(|b| std::str::from_utf8(b).ok())
        .ok_or_else(|| BeaconError::InvalidBytecode("truncated contract name".into()))?;
    let kind = ContractKind::from_name(name)
        .ok_or_else(|| BeaconError::InvalidBytecode(format!("unknown contract {name}")))?;

    let slots = &bytes[name_end..];
    if slots.len() != 20 * kind.links().len() {
        return Err(BeaconError::InvalidBytecode(format!(
            "{name} expects {} library slots",
            kind.links().len()
        )));
    }
    let libraries = slots
        .chunks_exact(20)
        .map(|chunk| {
            let mut arr = [0u8; 20];
            arr.copy_from_slice(chunk);
            Address::from_bytes(arr)
        })
        .collect();

    Ok((kind, libraries))
}
