use std::fmt;

/// A monetary value in minor units (e.g. cents), stored as a scaled integer.
///
/// All balance arithmetic happens on minor units to avoid floating-point
/// rounding; major-unit formatting is a display concern only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(i64);

impl Amount {
    /// Minor units per major unit (two decimal places).
    pub const MINOR_PER_MAJOR: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    pub fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    pub fn as_minor(&self) -> i64 {
        self.0
    }

    /// Whole major units, truncated toward zero.
    pub fn major(&self) -> i64 {
        self.0 / Self::MINOR_PER_MAJOR
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Apply a signed delta, failing on overflow.
    pub fn checked_add(self, delta: Amount) -> Option<Amount> {
        self.0.checked_add(delta.0).map(Amount)
    }

    /// Negate, for deriving debit deltas from positive amounts.
    pub fn negate(self) -> Amount {
        Amount(-self.0)
    }
}

impl serde::Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::MINOR_PER_MAJOR;
        let frac = abs % Self::MINOR_PER_MAJOR;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_minor_preserves_value() {
        let amount = Amount::from_minor(123_456);
        assert_eq!(amount.as_minor(), 123_456);
    }

    #[test]
    fn major_truncates() {
        assert_eq!(Amount::from_minor(1_500_050).major(), 15_000);
        assert_eq!(Amount::from_minor(99).major(), 0);
        assert_eq!(Amount::from_minor(-150).major(), -1);
    }

    #[test]
    fn display_formats_positive() {
        assert_eq!(Amount::from_minor(1_000_000).to_string(), "10000.00");
        assert_eq!(Amount::from_minor(1_550).to_string(), "15.50");
        assert_eq!(Amount::from_minor(1).to_string(), "0.01");
        assert_eq!(Amount::from_minor(0).to_string(), "0.00");
    }

    #[test]
    fn display_formats_negative() {
        assert_eq!(Amount::from_minor(-502_550).to_string(), "-5025.50");
        assert_eq!(Amount::from_minor(-1).to_string(), "-0.01");
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Amount::default(), Amount::ZERO);
    }

    #[test]
    fn checked_add_applies_signed_delta() {
        let balance = Amount::from_minor(100);
        assert_eq!(
            balance.checked_add(Amount::from_minor(50)),
            Some(Amount::from_minor(150))
        );
        assert_eq!(
            balance.checked_add(Amount::from_minor(-150)),
            Some(Amount::from_minor(-50))
        );
    }

    #[test]
    fn checked_add_detects_overflow() {
        let balance = Amount::from_minor(i64::MAX);
        assert_eq!(balance.checked_add(Amount::from_minor(1)), None);
    }

    #[test]
    fn negate_flips_sign() {
        assert_eq!(Amount::from_minor(100).negate(), Amount::from_minor(-100));
    }

    #[test]
    fn ordering() {
        let small = Amount::from_minor(100);
        let large = Amount::from_minor(200);
        assert!(small < large);
        assert!(Amount::from_minor(-100) < Amount::ZERO);
    }
}
