use std::path::Path;

use beacon_core::constants::{
    DEFAULT_DKG_CONTRIBUTION_MARGIN, DEFAULT_STAKE_INITIALIZATION_PERIOD,
    DEFAULT_STAKE_UNDELEGATION_PERIOD,
};
use beacon_core::error::BeaconError;
use serde::{Deserialize, Serialize};

/// Tunables passed to constructors and initializers during provisioning.
///
/// Missing fields in a parameter file fall back to the development values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvisionParams {
    /// Percentage of the DKG fee a service request contributes.
    pub dkg_contribution_margin: u64,
    /// Seconds before a delegated stake becomes active.
    pub stake_initialization_period: u64,
    /// Seconds an undelegated stake stays locked.
    pub stake_undelegation_period: u64,
}

impl Default for ProvisionParams {
    fn default() -> Self {
        Self {
            dkg_contribution_margin: DEFAULT_DKG_CONTRIBUTION_MARGIN,
            stake_initialization_period: DEFAULT_STAKE_INITIALIZATION_PERIOD,
            stake_undelegation_period: DEFAULT_STAKE_UNDELEGATION_PERIOD,
        }
    }
}

impl ProvisionParams {
    /// Read parameters from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BeaconError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| BeaconError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| BeaconError::Serialization(format!("{}: {e}", path.display())))
    }
}

/// Artifact names used for each role in a full provisioning run.
///
/// Tests swap `operator` for the stub build that exposes group registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapArtifacts {
    pub token: String,
    pub token_grant: String,
    pub registry: String,
    pub escrow: String,
    pub staking: String,
    pub service: String,
    pub service_impl: String,
    pub operator: String,
}

impl Default for BootstrapArtifacts {
    fn default() -> Self {
        Self {
            token: "KeepToken".into(),
            token_grant: "TokenGrant".into(),
            registry: "KeepRegistry".into(),
            escrow: "TokenStakingEscrow".into(),
            staking: "TokenStaking".into(),
            service: "KeepRandomBeaconService".into(),
            service_impl: "KeepRandomBeaconServiceImplV1".into(),
            operator: "KeepRandomBeaconOperator".into(),
        }
    }
}

impl BootstrapArtifacts {
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = std::env::temp_dir().join("beacon_provision_params_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("params.json");
        std::fs::write(&path, r#"{"stakeUndelegationPeriod": 600}"#).unwrap();

        let params = ProvisionParams::load(&path).unwrap();
        assert_eq!(params.stake_undelegation_period, 600);
        assert_eq!(params.dkg_contribution_margin, DEFAULT_DKG_CONTRIBUTION_MARGIN);
        assert_eq!(params.stake_initialization_period, DEFAULT_STAKE_INITIALIZATION_PERIOD);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ProvisionParams::load("/nonexistent/beacon/params.json").unwrap_err();
        assert!(matches!(err, BeaconError::Io(_)));
    }

    #[test]
    fn operator_override() {
        let artifacts = BootstrapArtifacts::default().with_operator("KeepRandomBeaconOperatorStub");
        assert_eq!(artifacts.operator, "KeepRandomBeaconOperatorStub");
        assert_eq!(artifacts.service, "KeepRandomBeaconService");
    }
}
