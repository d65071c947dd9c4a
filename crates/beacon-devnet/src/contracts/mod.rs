//! Contract logic executed by the development chain.
//!
//! Each module owns one contract family: its storage, its constructor, and a
//! `dispatch` function mapping method names onto behavior. Revert strings
//! match the deployed contracts.

pub mod grant;
pub mod operator;
pub mod registry;
pub mod service;
pub mod staking;
pub mod token;
