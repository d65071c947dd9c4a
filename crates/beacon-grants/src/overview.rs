use beacon_core::chain::Chain;
use beacon_core::error::BeaconError;
use beacon_core::types::{output, AbiValue, Address, Amount, ContractHandle, Signer, Timestamp};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::schedule::GrantSchedule;

/// A grant as read from the grant contract at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    pub id: u128,
    pub grantee: Address,
    pub start: Timestamp,
    pub cliff: Timestamp,
    pub duration: u64,
    pub amount: Amount,
    pub unlocked: Amount,
    /// Already withdrawn.
    pub released: Amount,
    pub ready_to_release: Amount,
    /// Managed-grant contract holding this grant, if any.
    #[serde(default)]
    pub managed_grant: Option<Address>,
}

impl GrantRecord {
    pub fn schedule(&self) -> GrantSchedule {
        GrantSchedule {
            amount: self.amount,
            start: self.start,
            cliff: self.cliff,
            duration: self.duration,
        }
    }

    pub fn is_managed(&self) -> bool {
        self.managed_grant.is_some()
    }
}

/// Read grant `id` from the `token_grant` contract.
pub async fn fetch_grant<C: Chain>(
    chain: &C,
    signer: &Signer,
    token_grant: &ContractHandle,
    id: u128,
) -> Result<GrantRecord, BeaconError> {
    let fields = token_grant
        .call(chain, signer, "getGrant", vec![AbiValue::Uint(id)])
        .await?;
    let uint = |i: usize| output(&fields, i).and_then(AbiValue::as_uint);
    let to_u64 = |v: u128| {
        u64::try_from(v).map_err(|_| BeaconError::Abi(format!("{v} does not fit in 64 bits")))
    };

    let amount = uint(0)?;
    let released = uint(1)?;
    let start = to_u64(uint(2)?)?;
    let cliff = to_u64(uint(3)?)?;
    let duration = to_u64(uint(4)?)?;
    let grantee = output(&fields, 5)?.as_address()?;

    let unlocked = token_grant
        .call_uint(chain, signer, "unlockedAmount", vec![AbiValue::Uint(id)])
        .await?;
    let ready_to_release = token_grant
        .call_uint(chain, signer, "withdrawable", vec![AbiValue::Uint(id)])
        .await?;
    debug!(grant = %id, %grantee, amount = %amount, unlocked = %unlocked, "grant fetched");

    let record = GrantRecord {
        id,
        grantee,
        start,
        cliff,
        duration,
        amount,
        unlocked,
        released,
        ready_to_release,
        managed_grant: None,
    };
    let now = chain.block_timestamp().await?;
    let expected = record.schedule().unlocked_at(now);
    if expected != unlocked {
        warn!(grant = %id, expected = %expected, reported = %unlocked, "unlocked amount differs from schedule");
    }
    Ok(record)
}

/// Read the grant held by the `managed_grant` contract.
pub async fn fetch_managed_grant<C: Chain>(
    chain: &C,
    signer: &Signer,
    token_grant: &ContractHandle,
    managed_grant: &ContractHandle,
) -> Result<GrantRecord, BeaconError> {
    let id = managed_grant.call_uint(chain, signer, "grantId", vec![]).await?;
    let mut record = fetch_grant(chain, signer, token_grant, id).await?;
    record.managed_grant = Some(managed_grant.address);
    Ok(record)
}

// ── Overview ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantDetails {
    pub id: u128,
    pub amount: Amount,
    pub issued_at: DateTime<Utc>,
    pub fully_unlocked_at: DateTime<Utc>,
    pub cliff_period: Duration,
}

/// One measured share of a grant's total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub label: &'static str,
    pub value: Amount,
    pub total: Amount,
}

impl Progress {
    /// Share of the total in thousandths, capped at 1000.
    pub fn permille(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let share = self.value.min(self.total) * 1_000 / self.total;
        share as u32
    }
}

/// The three read-only views of a grant plus the release gate.
#[derive(Clone, Debug)]
pub struct GrantOverview {
    record: GrantRecord,
}

impl GrantOverview {
    pub fn new(record: GrantRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &GrantRecord {
        &self.record
    }

    pub fn details(&self) -> Result<GrantDetails, BeaconError> {
        let schedule = self.record.schedule();
        Ok(GrantDetails {
            id: self.record.id,
            amount: self.record.amount,
            issued_at: schedule.issued_date()?,
            fully_unlocked_at: schedule.fully_unlocked_date()?,
            cliff_period: schedule.cliff_period(),
        })
    }

    /// Unlocked and released, each against the grant total.
    pub fn unlock_progress(&self) -> [Progress; 2] {
        [
            Progress {
                label: "Unlocked",
                value: self.record.unlocked,
                total: self.record.amount,
            },
            Progress {
                label: "Released",
                value: self.record.released,
                total: self.record.amount,
            },
        ]
    }

    /// `staked` comes from the staking contract, not the grant.
    pub fn stake_progress(&self, staked: Amount) -> Progress {
        Progress {
            label: "Staked",
            value: staked,
            total: self.record.amount,
        }
    }

    pub fn can_release(&self) -> bool {
        self.record.ready_to_release > 0
    }
}
