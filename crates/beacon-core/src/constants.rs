/// ─── Beacon Provisioning Constants ──────────────────────────────────────────
///
/// Values mirror the deployed contract set: token supply, operator fee
/// parameters and the default staking periods used when provisioning a
/// development network.

// ── Token ────────────────────────────────────────────────────────────────────

/// 1 KEEP expressed in its smallest unit (18 decimals).
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

/// Fixed KEEP supply minted to the token deployer.
pub const TOKEN_TOTAL_SUPPLY: u128 = 1_000_000_000 * TOKEN_UNIT;

// ── Provisioning defaults ────────────────────────────────────────────────────

/// DKG contribution margin in percent. 5% means group selection is triggered
/// roughly once every 20 relay entries.
pub const DEFAULT_DKG_CONTRIBUTION_MARGIN: u64 = 5;

/// Stake initialization period (seconds).
pub const DEFAULT_STAKE_INITIALIZATION_PERIOD: u64 = 30;

/// Stake undelegation period (seconds).
pub const DEFAULT_STAKE_UNDELEGATION_PERIOD: u64 = 300;

// ── Operator contract fees ───────────────────────────────────────────────────

/// Gas needed to run one full DKG and submit its result.
pub const DKG_GAS_ESTIMATE: u128 = 1_740_000;

/// Upper bound on the gas price the operator contract reimburses (30 gwei).
pub const GAS_PRICE_CEILING: u128 = 30_000_000_000;

/// Gas needed to verify and submit a relay entry.
pub const ENTRY_VERIFICATION_GAS_ESTIMATE: u128 = 1_240_000;

/// Number of members in a signing group.
pub const GROUP_SIZE: u128 = 64;

/// Base reward paid to each group member for a relay entry (wei).
pub const GROUP_MEMBER_BASE_REWARD: u128 = 145_000_000_000_000;

// ── Minimum stake schedule ───────────────────────────────────────────────────

/// Minimum stake right after the staking contract is deployed.
pub const MINIMUM_STAKE_BASE: u128 = 100_000 * TOKEN_UNIT;

/// Minimum stake once the schedule has fully elapsed.
pub const MINIMUM_STAKE_FLOOR: u128 = 10_000 * TOKEN_UNIT;

/// Length of the decreasing minimum stake schedule (two years).
pub const MINIMUM_STAKE_SCHEDULE_SECS: u64 = 63_072_000;

/// Number of equal steps the minimum stake drops in.
pub const MINIMUM_STAKE_STEPS: u64 = 10;

// ── Development network ──────────────────────────────────────────────────────

/// Network id reported by the in-process development chain.
pub const DEVNET_NETWORK_ID: u64 = 1337;

/// Ether balance of every pre-funded development account (100 ETH).
pub const DEVNET_ACCOUNT_BALANCE: u128 = 100 * TOKEN_UNIT;

/// Number of pre-funded development accounts.
pub const DEVNET_ACCOUNT_COUNT: usize = 10;

// ── Linking ──────────────────────────────────────────────────────────────────

/// Width in hex characters of a library placeholder (one 20-byte address).
pub const LINK_PLACEHOLDER_LEN: usize = 40;
