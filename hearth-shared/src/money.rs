use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
        assert_eq!(round_money(Decimal::new(32, 0)), Decimal::new(32, 0));
    }
}
