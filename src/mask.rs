//! Balance masking policy.

use crate::Amount;

/// Fixed-width redaction marker prepended to the visible suffix.
const MARKER: &str = "****";

/// Number of trailing major-unit digits left visible.
const VISIBLE_DIGITS: usize = 2;

/// Produce a non-reversible display string for a balance.
///
/// The balance is truncated to major units and only the last two digits stay
/// visible: `1_500_050` minor units is major `15000`, displayed as `****00`.
/// Short balances are zero-padded first so the output width never leaks the
/// magnitude.
///
/// This is a display transform only. It carries no security guarantee of its
/// own, which is why the unmasking path is gated by step-up instead.
pub fn mask(balance: Amount) -> String {
    let major = format!("{:02}", balance.major().abs());
    let visible = &major[major.len() - VISIBLE_DIGITS..];
    format!("{MARKER}{visible}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_two_major_digits() {
        assert_eq!(mask(Amount::from_minor(1_500_050)), "****00");
        assert_eq!(mask(Amount::from_minor(1_234_567)), "****45");
    }

    #[test]
    fn zero_pads_short_balances() {
        assert_eq!(mask(Amount::ZERO), "****00");
        assert_eq!(mask(Amount::from_minor(500)), "****05");
        assert_eq!(mask(Amount::from_minor(99)), "****00");
    }

    #[test]
    fn output_width_is_constant() {
        for minor in [0, 1, 12_345, 9_999_999_999] {
            assert_eq!(mask(Amount::from_minor(minor)).len(), 6);
        }
    }
}
