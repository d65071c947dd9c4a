use beacon_core::artifact::ContractArtifact;
use beacon_core::chain::Chain;
use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, ContractHandle, Signer};
use tracing::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::linker::LinkTable;

/// A deployable contract template: an artifact plus its library bindings
/// for the detected network.
#[derive(Clone, Debug)]
pub struct ContractFactory {
    artifact: ContractArtifact,
    network_id: Option<u64>,
    links: LinkTable,
}

impl ContractFactory {
    pub fn new(artifact: ContractArtifact) -> Self {
        Self {
            artifact,
            network_id: None,
            links: LinkTable::default(),
        }
    }

    /// Unlinked factory for the artifact `name` in `store`.
    pub fn from_store(store: &ArtifactStore, name: &str) -> Result<Self, BeaconError> {
        Ok(Self::new(store.get(name)?.clone()))
    }

    pub fn name(&self) -> &str {
        &self.artifact.contract_name
    }

    pub fn artifact(&self) -> &ContractArtifact {
        &self.artifact
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn network_id(&self) -> Option<u64> {
        self.network_id
    }

    /// Resolve the network this factory links and deploys against.
    pub async fn detect_network<C: Chain>(&mut self, chain: &C) -> Result<u64, BeaconError> {
        let id = chain.network_id().await?;
        if self.network_id != Some(id) {
            debug!(contract = self.name(), network_id = id, "network detected");
            // Links are scoped to a network; a different network starts clean.
            if self.network_id.is_some() {
                self.links = LinkTable::default();
            }
            self.network_id = Some(id);
        }
        Ok(id)
    }

    /// Bind library `library` to `address` in this factory's bytecode.
    pub fn link(&mut self, library: &str, address: Address) -> Result<(), BeaconError> {
        if self.network_id.is_none() {
            return Err(BeaconError::NetworkNotDetected(self.name().to_string()));
        }
        if !self.artifact.references(library) {
            return Err(BeaconError::UnknownLibrary {
                contract: self.name().to_string(),
                library: library.to_string(),
            });
        }
        let name = self.artifact.contract_name.clone();
        if self.links.link(&name, library, address)? {
            debug!(contract = %name, library, %address, "library linked");
        }
        Ok(())
    }

    /// Bytecode with every library substituted. Fails if any is unlinked.
    pub fn linked_bytecode(&self) -> Result<String, BeaconError> {
        self.links.apply(&self.artifact)
    }

    /// Deploy a new instance with constructor `args`. Nothing is sent if a
    /// library is still unlinked.
    pub async fn deploy<C: Chain>(
        &self,
        chain: &C,
        signer: &Signer,
        args: Vec<AbiValue>,
    ) -> Result<ContractHandle, BeaconError> {
        let bytecode = self.linked_bytecode()?;

        if let Some(detected) = self.network_id {
            let actual = chain.network_id().await?;
            if actual != detected {
                return Err(BeaconError::NetworkMismatch {
                    contract: self.name().to_string(),
                    detected,
                    actual,
                });
            }
        }

        let address = chain.deploy(signer, &bytecode, args).await?;
        info!(contract = self.name(), %address, from = %signer, "contract deployed");
        Ok(self.at(address))
    }

    /// Handle to an existing deployment, used through this factory's ABI.
    pub fn at(&self, address: Address) -> ContractHandle {
        ContractHandle::new(self.name(), address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_devnet::{artifacts::artifact, ContractKind, Devnet, DevnetConfig};

    fn factory(kind: ContractKind) -> ContractFactory {
        ContractFactory::new(artifact(kind).unwrap())
    }

    #[tokio::test]
    async fn link_requires_detected_network() {
        let mut groups = factory(ContractKind::Groups);
        let err = groups.link("BLS", Address::from_bytes([1; 20])).unwrap_err();
        assert!(matches!(err, BeaconError::NetworkNotDetected(_)));
    }

    #[tokio::test]
    async fn link_rejects_unreferenced_library() {
        let devnet = Devnet::new(DevnetConfig::default());
        let mut groups = factory(ContractKind::Groups);
        groups.detect_network(&devnet).await.unwrap();
        let err = groups.link("Locks", Address::from_bytes([1; 20])).unwrap_err();
        assert!(matches!(err, BeaconError::UnknownLibrary { .. }));
    }

    #[tokio::test]
    async fn unlinked_deploy_sends_nothing() {
        let devnet = Devnet::new(DevnetConfig::default());
        let signer = devnet.signer(0).unwrap();
        let groups = factory(ContractKind::Groups);

        let err = groups.deploy(&devnet, &signer, vec![]).await.unwrap_err();
        assert!(matches!(err, BeaconError::UnlinkedLibrary { ref library, .. } if library == "BLS"));
        assert_eq!(devnet.block_number().await, 0);
    }

    #[tokio::test]
    async fn linked_library_deploys() {
        let devnet = Devnet::new(DevnetConfig::default());
        let signer = devnet.signer(0).unwrap();
        let bls = factory(ContractKind::Bls).deploy(&devnet, &signer, vec![]).await.unwrap();

        let mut groups = factory(ContractKind::Groups);
        groups.detect_network(&devnet).await.unwrap();
        groups.link("BLS", bls.address).unwrap();
        let handle = groups.deploy(&devnet, &signer, vec![]).await.unwrap();
        assert_eq!(handle.name, "Groups");
        assert_eq!(devnet.contract_kind(&handle.address).await, Some(ContractKind::Groups));
    }

    #[tokio::test]
    async fn linking_a_non_library_reverts_on_chain() {
        let devnet = Devnet::new(DevnetConfig::default());
        let signer = devnet.signer(0).unwrap();
        let token = factory(ContractKind::KeepToken).deploy(&devnet, &signer, vec![]).await.unwrap();

        let mut groups = factory(ContractKind::Groups);
        groups.detect_network(&devnet).await.unwrap();
        groups.link("BLS", token.address).unwrap();
        let err = groups.deploy(&devnet, &signer, vec![]).await.unwrap_err();
        assert!(err.revert_reason().unwrap().contains("BLS library is not deployed"));
    }

    #[tokio::test]
    async fn deploy_refuses_a_different_network() {
        let home = Devnet::new(DevnetConfig::default());
        let other = Devnet::new(DevnetConfig {
            network_id: 99,
            ..DevnetConfig::default()
        });
        let signer = other.signer(0).unwrap();

        let mut groups = factory(ContractKind::Groups);
        groups.detect_network(&home).await.unwrap();
        groups.link("BLS", Address::from_bytes([1; 20])).unwrap();
        let err = groups.deploy(&other, &signer, vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            BeaconError::NetworkMismatch { actual: 99, .. }
        ));
        assert_eq!(other.block_number().await, 0);
    }

    #[tokio::test]
    async fn new_network_drops_links() {
        let home = Devnet::new(DevnetConfig::default());
        let other = Devnet::new(DevnetConfig {
            network_id: 99,
            ..DevnetConfig::default()
        });

        let mut groups = factory(ContractKind::Groups);
        groups.detect_network(&home).await.unwrap();
        groups.link("BLS", Address::from_bytes([1; 20])).unwrap();
        assert!(groups.linked_bytecode().is_ok());

        groups.detect_network(&home).await.unwrap();
        assert!(groups.linked_bytecode().is_ok());

        assert_eq!(groups.detect_network(&other).await.unwrap(), 99);
        assert_eq!(groups.network_id(), Some(99));
        assert!(matches!(
            groups.linked_bytecode(),
            Err(BeaconError::UnlinkedLibrary { .. })
        ));
    }
}
