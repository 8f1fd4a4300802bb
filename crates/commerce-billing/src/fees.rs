//! Platform fee arithmetic
//!
//! Connected-payments split: the platform keeps a percentage of the gross
//! charge and the remainder transfers to the store's payout account. All
//! arithmetic is exact-integer on minor currency units; the two parts
//! always sum back to the gross amount.

use commerce_common::Cents;
use serde::{Deserialize, Serialize};

/// Platform cut applied when a store does not override it.
pub const DEFAULT_PLATFORM_FEE_PERCENT: u32 = 5;

/// Result of splitting a gross payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// The platform's cut.
    pub platform_fee: Cents,
    /// What transfers to the merchant.
    pub merchant_amount: Cents,
}

/// Split a gross amount by a whole-percent platform fee.
///
/// The fee rounds half-up; the merchant amount is the exact remainder.
pub fn split(gross: Cents, fee_percent: u32) -> FeeSplit {
    let platform_fee = (gross * fee_percent as i64 + 50) / 100;
    FeeSplit {
        platform_fee,
        merchant_amount: gross - platform_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_percent_of_even_amount() {
        let s = split(10_000, 5);
        assert_eq!(s.platform_fee, 500);
        assert_eq!(s.merchant_amount, 9_500);
    }

    #[test]
    fn rounds_half_up() {
        // 5% of 10050 = 502.5 -> 503
        let s = split(10_050, 5);
        assert_eq!(s.platform_fee, 503);
        assert_eq!(s.merchant_amount, 9_547);
    }

    #[test]
    fn parts_always_sum_to_gross() {
        for gross in [1, 7, 99, 101, 12_345, 999_999] {
            for pct in [0, 1, 5, 10, 33, 100] {
                let s = split(gross, pct);
                assert_eq!(s.platform_fee + s.merchant_amount, gross);
                assert!(s.platform_fee >= 0);
            }
        }
    }

    #[test]
    fn zero_percent_means_no_fee() {
        let s = split(5_000, 0);
        assert_eq!(s.platform_fee, 0);
        assert_eq!(s.merchant_amount, 5_000);
    }
}
