use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeaconError {
    // ── Chain errors ─────────────────────────────────────────────────────────
    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("insufficient funds: need {need} wei, have {have}")]
    InsufficientFunds { need: u128, have: u128 },

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("no contract deployed at {0}")]
    UnknownContract(String),

    #[error("contract {contract} has no method {method}")]
    UnknownMethod { contract: String, method: String },

    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),

    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(u64),

    // ── ABI errors ───────────────────────────────────────────────────────────
    #[error("abi error: {0}")]
    Abi(String),

    // ── Artifact / linking errors ────────────────────────────────────────────
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("network not detected for {0}; call detect_network before linking")]
    NetworkNotDetected(String),

    #[error("network mismatch for {contract}: detected {detected}, chain reports {actual}")]
    NetworkMismatch {
        contract: String,
        detected: u64,
        actual: u64,
    },

    #[error("{contract} does not reference library {library}")]
    UnknownLibrary { contract: String, library: String },

    #[error("library {library} already linked into {contract} at {existing}; refusing {attempted}")]
    DuplicateLink {
        contract: String,
        library: String,
        existing: String,
        attempted: String,
    },

    #[error("{contract} cannot be deployed: library {library} is not linked")]
    UnlinkedLibrary { contract: String, library: String },

    // ── Plan errors ──────────────────────────────────────────────────────────
    #[error("step {step} requires {input}, which has not been produced")]
    MissingInput { step: String, input: String },

    #[error("plan contains a dependency cycle through: {0}")]
    CyclicPlan(String),

    #[error("step declared twice: {0}")]
    DuplicateStep(String),

    #[error("step {step} failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<BeaconError>,
    },

    // ── Serialization / configuration ────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl BeaconError {
    /// Wrap an error with the name of the plan step that produced it.
    pub fn in_step(self, step: impl Into<String>) -> Self {
        BeaconError::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// The on-chain revert reason, looking through step wrappers.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            BeaconError::Reverted(reason) => Some(reason),
            BeaconError::Step { source, .. } => source.revert_reason(),
            _ => None,
        }
    }

    /// The innermost error, looking through step wrappers.
    pub fn root(&self) -> &BeaconError {
        match self {
            BeaconError::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(e: serde_json::Error) -> Self {
        BeaconError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for BeaconError {
    fn from(e: std::io::Error) -> Self {
        BeaconError::Io(e.to_string())
    }
}
