use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Splits `total` into `n` cent-exact amounts that sum back to `total`.
///
/// Every entry is the rounded per-head amount; the leftover cent (or cents),
/// positive or negative, is folded into index 0. The policy is arbitrary but
/// must stay fixed so recomputing over the same debtor ordering reproduces
/// the same amounts. Callers guarantee `n > 0`.
pub fn split_exact(total: Decimal, n: usize) -> Vec<Decimal> {
    assert!(n > 0, "split_exact requires at least one share");
    let count = Decimal::from(n as u64);
    let base = round_cents(total / count);
    let remainder = round_cents(total - base * count);
    let mut amounts = vec![base; n];
    amounts[0] += remainder;
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn uneven_total_gives_first_share_the_extra_cent() {
        assert_eq!(
            split_exact(dec!(10.00), 3),
            vec![dec!(3.34), dec!(3.33), dec!(3.33)]
        );
        assert_eq!(
            split_exact(dec!(100.00), 3),
            vec![dec!(33.34), dec!(33.33), dec!(33.33)]
        );
    }

    #[test]
    fn round_up_base_pushes_negative_remainder_to_first_share() {
        // 2.00 / 3 rounds to 0.67 per head, so the first share gives a cent back
        assert_eq!(
            split_exact(dec!(2.00), 3),
            vec![dec!(0.66), dec!(0.67), dec!(0.67)]
        );
    }

    #[test]
    fn even_split_has_no_remainder() {
        assert_eq!(split_exact(dec!(45.00), 2), vec![dec!(22.50), dec!(22.50)]);
        assert_eq!(split_exact(dec!(0.03), 3), vec![dec!(0.01), dec!(0.01), dec!(0.01)]);
    }

    #[test]
    fn single_share_takes_everything() {
        assert_eq!(split_exact(dec!(19.99), 1), vec![dec!(19.99)]);
    }

    proptest! {
        #[test]
        fn shares_always_sum_to_the_total(cents in 1u64..=10_000_000, n in 1usize..=60) {
            let total = Decimal::new(cents as i64, 2);
            let amounts = split_exact(total, n);
            prop_assert_eq!(amounts.len(), n);
            let sum: Decimal = amounts.iter().copied().sum();
            prop_assert_eq!(sum, total);
        }

        #[test]
        fn shares_never_drift_more_than_the_remainder(cents in 1u64..=10_000_000, n in 2usize..=60) {
            let total = Decimal::new(cents as i64, 2);
            let amounts = split_exact(total, n);
            // everyone past index 0 pays exactly the rounded per-head amount
            let base = amounts[1];
            prop_assert!(amounts[2..].iter().all(|a| *a == base));
        }
    }
}
