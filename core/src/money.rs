//! Fixed-point money helpers.
//!
//! All monetary amounts are two-digit decimals; rates are exact decimals
//! (21.00 means 21%). Rounding is half-up and happens only at the declared
//! boundaries: VAT calculation and period-end presentation.

use rust_decimal::{Decimal, RoundingStrategy};

/// Half-up rounding to two fractional digits.
pub fn round_half_up(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// VAT on a net base at a percent rate, rounded half-up.
pub fn vat_from_base(base: Decimal, rate: Decimal) -> Decimal {
    round_half_up(base * rate / Decimal::ONE_HUNDRED)
}

/// Split a gross amount into (base, vat) for a percent rate.
///
/// The base is extracted by dividing out the rate and rounding half-up; the
/// VAT is the remainder, so `base + vat == gross` holds exactly.
pub fn split_gross(gross: Decimal, rate: Decimal) -> (Decimal, Decimal) {
    if rate.is_zero() {
        return (gross, Decimal::ZERO);
    }
    let divisor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
    let base = round_half_up(gross / divisor);
    (base, gross - base)
}

/// Whether a posted VAT amount reconciles with base × rate within tolerance.
pub fn reconciles(base: Decimal, vat: Decimal, rate: Decimal, tolerance: Decimal) -> bool {
    (vat - vat_from_base(base, rate)).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up_at_midpoint() {
        assert_eq!(round_half_up(dec!(1.005)), dec!(1.01));
        assert_eq!(round_half_up(dec!(1.004)), dec!(1.00));
        assert_eq!(round_half_up(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn splits_standard_dutch_rate() {
        let (base, vat) = split_gross(dec!(121.00), dec!(21.00));
        assert_eq!(base, dec!(100.00));
        assert_eq!(vat, dec!(21.00));
    }

    #[test]
    fn split_is_exact_for_awkward_amounts() {
        for gross in [dec!(0.01), dec!(99.99), dec!(1234.56), dec!(0.03)] {
            let (base, vat) = split_gross(gross, dec!(21.00));
            assert_eq!(base + vat, gross);
            assert!((vat - base * dec!(0.21)).abs() <= dec!(0.01));
        }
    }

    #[test]
    fn split_at_zero_rate_keeps_gross() {
        let (base, vat) = split_gross(dec!(500.00), Decimal::ZERO);
        assert_eq!(base, dec!(500.00));
        assert_eq!(vat, Decimal::ZERO);
    }

    #[test]
    fn reduced_rate_split() {
        let (base, vat) = split_gross(dec!(109.00), dec!(9.00));
        assert_eq!(base, dec!(100.00));
        assert_eq!(vat, dec!(9.00));
    }

    #[test]
    fn vat_from_base_rounds_half_up() {
        assert_eq!(vat_from_base(dec!(1000.00), dec!(21.00)), dec!(210.00));
        // 33.33 * 21% = 6.9993 -> 7.00
        assert_eq!(vat_from_base(dec!(33.33), dec!(21.00)), dec!(7.00));
    }

    #[test]
    fn reconciliation_tolerance() {
        assert!(reconciles(dec!(100.00), dec!(21.00), dec!(21.00), dec!(0.05)));
        assert!(reconciles(dec!(100.00), dec!(21.04), dec!(21.00), dec!(0.05)));
        assert!(!reconciles(dec!(100.00), dec!(21.06), dec!(21.00), dec!(0.05)));
    }
}
