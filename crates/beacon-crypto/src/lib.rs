pub mod abi;
pub mod hash;

pub use abi::{decode_call, encode_call, selector, ParamKind};
pub use hash::{code_hash, contract_address, keccak256, tx_hash};
