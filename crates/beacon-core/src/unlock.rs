//! Linear unlocking with a cliff, shared by the grant contract and the
//! grant overview.

use crate::types::{Amount, Timestamp};

/// Share of `amount` unlocked at `now`.
///
/// Nothing before `cliff`; from the cliff on, the share of `duration`
/// elapsed since `start`; everything once `duration` has passed. Never
/// overflows: the product is split around `amount / duration`.
pub fn unlocked_amount(
    amount: Amount,
    start: Timestamp,
    cliff: Timestamp,
    duration: u64,
    now: Timestamp,
) -> Amount {
    if now < cliff {
        return 0;
    }
    let elapsed = now.saturating_sub(start);
    if elapsed >= duration {
        return amount;
    }
    let (elapsed, duration) = (elapsed as u128, duration as u128);
    amount / duration * elapsed + amount % duration * elapsed / duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TOKEN_TOTAL_SUPPLY;

    #[test]
    fn zero_before_cliff_then_linear() {
        assert_eq!(unlocked_amount(1_000, 100, 150, 1_000, 149), 0);
        assert_eq!(unlocked_amount(1_000, 100, 150, 1_000, 150), 50);
        assert_eq!(unlocked_amount(1_000, 100, 150, 1_000, 600), 500);
        assert_eq!(unlocked_amount(1_000, 100, 150, 1_000, u64::MAX), 1_000);
    }

    #[test]
    fn rounds_down_like_a_single_division() {
        assert_eq!(unlocked_amount(10, 0, 0, 3, 1), 3);
        assert_eq!(unlocked_amount(10, 0, 0, 3, 2), 6);
        assert_eq!(unlocked_amount(7, 0, 0, 1_000, 999), 6);
    }

    #[test]
    fn whole_supply_over_long_duration() {
        let duration = 1_000_000_000_000;
        let half = unlocked_amount(TOKEN_TOTAL_SUPPLY, 0, 0, duration, duration / 2);
        assert_eq!(half, TOKEN_TOTAL_SUPPLY / 2);

        let almost = unlocked_amount(u128::MAX, 0, 0, u64::MAX, u64::MAX - 1);
        assert!(almost < u128::MAX);
    }
}
