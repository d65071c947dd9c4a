pub mod artifact;
pub mod chain;
pub mod constants;
pub mod error;
pub mod types;
pub mod unlock;

pub use artifact::ContractArtifact;
pub use chain::Chain;
pub use constants::*;
pub use error::BeaconError;
pub use types::*;
