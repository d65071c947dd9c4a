use serde::{Deserialize, Serialize};

use crate::constants::LINK_PLACEHOLDER_LEN;
use crate::error::BeaconError;

/// Compiled contract as produced by the build toolchain.
///
/// The bytecode is hex. Every library the contract calls appears in it as a
/// 40-character placeholder (`__Name____…`) that must be replaced by the
/// library's deployed address before the contract can be deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub bytecode: String,
    /// Library names referenced by `bytecode`, in order of first appearance.
    #[serde(default)]
    pub link_references: Vec<String>,
}

impl ContractArtifact {
    /// Build an artifact, deriving its link references from the bytecode.
    pub fn new(contract_name: impl Into<String>, bytecode: impl Into<String>) -> Self {
        let bytecode = bytecode.into();
        let link_references = placeholders(&bytecode);
        Self {
            contract_name: contract_name.into(),
            bytecode,
            link_references,
        }
    }

    /// Fill `link_references` from the bytecode when the source file omitted them.
    pub fn normalized(mut self) -> Self {
        if self.link_references.is_empty() {
            self.link_references = placeholders(&self.bytecode);
        }
        self
    }

    pub fn references(&self, library: &str) -> bool {
        self.link_references.iter().any(|l| l == library)
    }

    /// Bytecode may only hold hex digits and link placeholders.
    pub fn validate(&self) -> Result<(), BeaconError> {
        let code = self.bytecode.strip_prefix("0x").unwrap_or(&self.bytecode);
        match code
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
        {
            Some((at, c)) => Err(BeaconError::InvalidBytecode(format!(
                "{}: unexpected {c:?} at offset {at}",
                self.contract_name
            ))),
            None => Ok(()),
        }
    }
}

/// The placeholder a library `name` occupies in unlinked bytecode.
pub fn link_placeholder(name: &str) -> Result<String, BeaconError> {
    if name.is_empty() || name.len() > LINK_PLACEHOLDER_LEN - 2 || name.contains('_') {
        return Err(BeaconError::InvalidBytecode(format!(
            "library name {name:?} cannot be encoded in a link placeholder"
        )));
    }
    let mut out = String::with_capacity(LINK_PLACEHOLDER_LEN);
    out.push_str("__");
    out.push_str(name);
    while out.len() < LINK_PLACEHOLDER_LEN {
        out.push('_');
    }
    Ok(out)
}

/// Library names whose placeholders remain in `bytecode`, deduplicated, in
/// order of first appearance.
pub fn placeholders(bytecode: &str) -> Vec<String> {
    let bytes = bytecode.as_bytes();
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] != b'_' || bytes[i + 1] != b'_' {
            i += 1;
            continue;
        }
        let end = (i + LINK_PLACEHOLDER_LEN).min(bytes.len());
        if let Some(slot) = bytecode.get(i..end) {
            let name = slot.trim_matches('_');
            if !name.is_empty() && !found.iter().any(|f| f == name) {
                found.push(name.to_string());
            }
        }
        i = end;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_fixed_width() {
        let p = link_placeholder("BLS").unwrap();
        assert_eq!(p.len(), LINK_PLACEHOLDER_LEN);
        assert!(p.starts_with("__BLS_"));
    }

    #[test]
    fn overlong_library_name_rejected() {
        assert!(link_placeholder(&"X".repeat(39)).is_err());
        assert!(link_placeholder("Has_Underscore").is_err());
    }

    #[test]
    fn artifact_discovers_references_in_order() {
        let code = format!(
            "6080{}00{}ff{}",
            link_placeholder("Locks").unwrap(),
            link_placeholder("GrantStaking").unwrap(),
            link_placeholder("Locks").unwrap()
        );
        let artifact = ContractArtifact::new("TokenStaking", code);
        assert_eq!(artifact.link_references, vec!["Locks", "GrantStaking"]);
        assert!(artifact.references("Locks"));
        assert!(!artifact.references("BLS"));
    }

    #[test]
    fn deserializes_build_output_without_references() {
        let json = format!(
            r#"{{"contractName":"Groups","bytecode":"60{}"}}"#,
            link_placeholder("BLS").unwrap()
        );
        let artifact: ContractArtifact = serde_json::from_str(&json).unwrap();
        assert!(artifact.link_references.is_empty());
        assert_eq!(artifact.normalized().link_references, vec!["BLS"]);
    }

    #[test]
    fn non_ascii_bytecode_is_rejected_without_panicking() {
        let code = format!("6080__{}é", "A".repeat(37));
        assert_eq!(placeholders(&code), Vec::<String>::new());

        let artifact = ContractArtifact::new("Broken", code);
        assert!(matches!(
            artifact.validate(),
            Err(BeaconError::InvalidBytecode(msg)) if msg.starts_with("Broken:")
        ));
    }

    #[test]
    fn hex_and_placeholders_validate() {
        let code = format!("0x6080{}", link_placeholder("BLS").unwrap());
        assert!(ContractArtifact::new("Groups", code).validate().is_ok());
    }
}
