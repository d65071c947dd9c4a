use std::collections::BTreeMap;

use beacon_core::artifact::{link_placeholder, ContractArtifact};
use beacon_core::error::BeaconError;
use beacon_core::types::Address;

/// Library bindings for one contract, keyed by library name.
///
/// A name binds once. Re-linking it to the same address is a no-op; linking
/// it to a different address is rejected rather than silently ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkTable {
    links: BTreeMap<String, Address>,
}

impl LinkTable {
    /// Bind `library` to `address`. Returns `false` if the identical binding
    /// already existed.
    pub fn link(
        &mut self,
        contract: &str,
        library: &str,
        address: Address,
    ) -> Result<bool, BeaconError> {
        match self.links.get(library) {
            Some(existing) if *existing == address => Ok(false),
            Some(existing) => Err(BeaconError::DuplicateLink {
                contract: contract.to_string(),
                library: library.to_string(),
                existing: existing.to_string(),
                attempted: address.to_string(),
            }),
            None => {
                self.links.insert(library.to_string(), address);
                Ok(true)
            }
        }
    }

    pub fn get(&self, library: &str) -> Option<Address> {
        self.links.get(library).copied()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Libraries `artifact` references that have no binding yet.
    pub fn unresolved<'a>(&self, artifact: &'a ContractArtifact) -> Vec<&'a str> {
        artifact
            .link_references
            .iter()
            .filter(|name| !self.links.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Substitute every bound library address into `artifact`'s bytecode.
    /// Fails on the first reference without a binding.
    pub fn apply(&self, artifact: &ContractArtifact) -> Result<String, BeaconError> {
        let mut bytecode = artifact.bytecode.clone();
        for library in &artifact.link_references {
            let address = self.get(library).ok_or_else(|| BeaconError::UnlinkedLibrary {
                contract: artifact.contract_name.clone(),
                library: library.clone(),
            })?;
            bytecode = bytecode.replace(&link_placeholder(library)?, &address.to_hex());
        }
        Ok(bytecode)
    }
}
