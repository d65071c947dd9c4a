//! Static ABI call encoding.
//!
//! Only the fixed-size types the provisioning flow passes through encoded
//! calls are supported (`uintN`, `address`, `bool`). Each argument occupies
//! one 32-byte big-endian word after the 4-byte selector.

use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address};

use crate::hash::keccak256;

const WORD: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Uint,
    Address,
    Bool,
}

/// First four bytes of Keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Split `name(type,type)` into the method name and its parameter kinds.
pub fn parse_signature(signature: &str) -> Result<(&str, Vec<ParamKind>), BeaconError> {
    let open = signature
        .find('(')
        .ok_or_else(|| BeaconError::Abi(format!("malformed signature: {signature}")))?;
    if !signature.ends_with(')') {
        return Err(BeaconError::Abi(format!("malformed signature: {signature}")));
    }
    let name = &signature[..open];
    let inner = &signature[open + 1..signature.len() - 1];
    let mut kinds = Vec::new();
    if !inner.is_empty() {
        for ty in inner.split(',') {
            let kind = match ty {
                "address" => ParamKind::Address,
                "bool" => ParamKind::Bool,
                t if t.starts_with("uint") => ParamKind::Uint,
                other => {
                    return Err(BeaconError::Abi(format!("unsupported type {other} in {signature}")))
                }
            };
            kinds.push(kind);
        }
    }
    Ok((name, kinds))
}

/// Encode a call to `signature` with `args` (selector followed by one word per arg).
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Result<Vec<u8>, BeaconError> {
    let (_, kinds) = parse_signature(signature)?;
    if kinds.len() != args.len() {
        return Err(BeaconError::Abi(format!(
            "{signature} takes {} arguments, got {}",
            kinds.len(),
            args.len()
        )));
    }

    let mut out = Vec::with_capacity(4 + WORD * args.len());
    out.extend_from_slice(&selector(signature));
    for (kind, arg) in kinds.iter().zip(args) {
        let mut word = [0u8; WORD];
        match (kind, arg) {
            (ParamKind::Uint, AbiValue::Uint(v)) => word[16..].copy_from_slice(&v.to_be_bytes()),
            (ParamKind::Address, AbiValue::Address(a)) => word[12..].copy_from_slice(a.as_bytes()),
            (ParamKind::Bool, AbiValue::Bool(b)) => word[31] = u8::from(*b),
            (kind, arg) => {
                return Err(BeaconError::Abi(format!("cannot encode {arg:?} as {kind:?}")))
            }
        }
        out.extend_from_slice(&word);
    }
    Ok(out)
}

/// Decode `data` as a call to `signature`. Fails if the selector differs.
pub fn decode_call(signature: &str, data: &[u8]) -> Result<Vec<AbiValue>, BeaconError> {
    let (_, kinds) = parse_signature(signature)?;
    if data.len() < 4 || data[..4] != selector(signature) {
        return Err(BeaconError::Abi(format!("calldata does not target {signature}")));
    }
    let body = &data[4..];
    if body.len() != WORD * kinds.len() {
        return Err(BeaconError::Abi(format!(
            "{signature} expects {} bytes of arguments, got {}",
            WORD * kinds.len(),
            body.len()
        )));
    }

    kinds
        .iter()
        .zip(body.chunks_exact(WORD))
        .map(|(kind, word)| decode_word(*kind, word))
        .collect()
}

fn decode_word(kind: ParamKind, word: &[u8]) -> Result<AbiValue, BeaconError> {
    match kind {
        ParamKind::Uint => {
            if word[..16].iter().any(|b| *b != 0) {
                return Err(BeaconError::Abi("uint exceeds 128 bits".into()));
            }
            let mut buf = [0u8; 16];
            buf.copy_from_slice(&word[16..]);
            Ok(AbiValue::Uint(u128::from_be_bytes(buf)))
        }
        ParamKind::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(BeaconError::Abi("address word has dirty high bytes".into()));
            }
            let mut buf = [0u8; 20];
            buf.copy_from_slice(&word[12..]);
            Ok(AbiValue::Address(Address::from_bytes(buf)))
        }
        ParamKind::Bool => match word[31] {
            0 if word[..31].iter().all(|b| *b == 0) => Ok(AbiValue::Bool(false)),
            1 if word[..31].iter().all(|b| *b == 0) => Ok(AbiValue::Bool(true)),
            _ => Err(BeaconError::Abi("bool word is not 0 or 1".into())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erc20_transfer_selector() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn initializer_layout() {
        let registry = Address::from_bytes([0x11; 20]);
        let data = encode_call(
            "initialize(uint256,address)",
            &[AbiValue::Uint(5), AbiValue::Address(registry)],
        )
        .unwrap();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 31], 5);
        assert_eq!(&data[4 + 44..], registry.as_bytes());

        let decoded = decode_call("initialize(uint256,address)", &data).unwrap();
        assert_eq!(decoded, vec![AbiValue::Uint(5), AbiValue::Address(registry)]);
    }

    #[test]
    fn arity_and_type_mismatches_rejected() {
        assert!(encode_call("initialize(uint256,address)", &[AbiValue::Uint(5)]).is_err());
        assert!(encode_call("setFlag(bool)", &[AbiValue::Uint(1)]).is_err());
        assert!(parse_signature("initialize(bytes)").is_err());
    }

    #[test]
    fn wrong_selector_rejected() {
        let data = encode_call("approve(address)", &[AbiValue::Address(Address::ZERO)]).unwrap();
        assert!(decode_call("disable(address)", &data).is_err());
    }
}
