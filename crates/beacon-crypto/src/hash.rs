use beacon_core::types::{Address, TxHash};
use sha3::{Digest, Keccak256};

/// Keccak-256 of arbitrary bytes → 32-byte array.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Address of a contract created by `deployer` at account nonce `nonce`:
/// the low 20 bytes of Keccak-256(deployer || nonce_be).
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut input = deployer.as_bytes().to_vec();
    input.extend_from_slice(&nonce.to_be_bytes());
    let digest = keccak256(&input);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::from_bytes(out)
}

/// Hash identifying a transaction sent by `from` at `nonce` with `payload`.
pub fn tx_hash(from: &Address, nonce: u64, payload: &[u8]) -> TxHash {
    let mut input = from.as_bytes().to_vec();
    input.extend_from_slice(&nonce.to_be_bytes());
    input.extend_from_slice(payload);
    TxHash(keccak256(&input))
}

/// BLAKE3 of deployed code, used to tell linked variants of one artifact apart.
pub fn code_hash(code: &[u8]) -> [u8; 32] {
    *blake3::hash(code).as_bytes()
}
