//! Line-item arithmetic shared by the server and the client draft.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of prices, sums and totals.
pub const MONEY_SCALE: u32 = 2;
/// Decimal places of quantities.
pub const QUANTITY_SCALE: u32 = 3;
/// Largest value a `numeric(14,2)` money column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);
/// Largest value a `numeric(14,3)` quantity column holds.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 3);

/// Money is kept with two decimal places, halves rounded away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `None` when the product overflows or does not fit a money column.
pub fn line_sum(quantity: Decimal, price: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(price)
        .map(round_money)
        .filter(|sum| sum.abs() <= MAX_AMOUNT)
}

/// Total of already rounded line sums, `None` once it leaves the money range.
pub fn invoice_total<I>(sums: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    sums.into_iter()
        .try_fold(Decimal::ZERO, |acc, sum| acc.checked_add(sum))
        .filter(|total| total.abs() <= MAX_AMOUNT)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn limits_match_column_precision() {
        assert_eq!(MAX_AMOUNT, d("999999999999.99"));
        assert_eq!(MAX_QUANTITY, d("99999999999.999"));
    }

    #[test]
    fn line_sum_rounds_half_up() {
        assert_eq!(line_sum(d("3"), d("19.99")), Some(d("59.97")));
        assert_eq!(line_sum(d("0.5"), d("0.05")), Some(d("0.03")));
        assert_eq!(line_sum(d("1.5"), d("2.25")), Some(d("3.38")));
    }

    #[test]
    fn line_sum_out_of_range_is_none() {
        assert_eq!(line_sum(Decimal::MAX, d("2")), None);
        assert_eq!(line_sum(d("1000000"), d("1000000")), None);
        assert_eq!(line_sum(d("1"), MAX_AMOUNT), Some(MAX_AMOUNT));
    }

    #[test]
    fn total_is_sum_of_line_sums() {
        let sums = [
            line_sum(d("2"), d("10.10")).unwrap(),
            line_sum(d("0.333"), d("3")).unwrap(),
        ];
        assert_eq!(invoice_total(sums), Some(d("21.20")));
        assert_eq!(invoice_total(Vec::new()), Some(Decimal::ZERO));
        assert_eq!(invoice_total([MAX_AMOUNT, d("0.01")]), None);
        assert_eq!(invoice_total([Decimal::MAX, Decimal::MAX]), None);
    }
}
