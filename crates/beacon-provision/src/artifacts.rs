use std::collections::BTreeMap;
use std::path::Path;

use beacon_core::artifact::ContractArtifact;
use beacon_core::error::BeaconError;
use tracing::{debug, info};

use crate::factory::ContractFactory;

/// Compiled artifacts available to a provisioning run, keyed by contract name.
#[derive(Clone, Debug, Default)]
pub struct ArtifactStore {
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl ArtifactStore {
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = ContractArtifact>) -> Self {
        let mut store = Self::default();
        for artifact in artifacts {
            store.insert(artifact);
        }
        store
    }

    /// Add or replace an artifact.
    pub fn insert(&mut self, artifact: ContractArtifact) {
        let artifact = artifact.normalized();
        self.artifacts
            .insert(artifact.contract_name.clone(), artifact);
    }

    pub fn get(&self, name: &str) -> Result<&ContractArtifact, BeaconError> {
        self.artifacts
            .get(name)
            .ok_or_else(|| BeaconError::ArtifactNotFound(name.to_string()))
    }

    /// A fresh, unlinked factory for `name`.
    pub fn factory(&self, name: &str) -> Result<ContractFactory, BeaconError> {
        ContractFactory::from_store(self, name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Load every `*.json` build artifact in `dir`.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, BeaconError> {
        let dir = dir.as_ref();
        let mut store = Self::default();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = std::fs::read_to_string(&path)?;
            let artifact: ContractArtifact = serde_json::from_str(&json).map_err(|e| {
                BeaconError::Serialization(format!("{}: {e}", path.display()))
            })?;
            artifact.validate()?;
            debug!(contract = %artifact.contract_name, path = %path.display(), "loaded artifact");
            store.insert(artifact);
        }
        info!(count = store.len(), dir = %dir.display(), "artifacts loaded");
        Ok(store)
    }
}
