use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A monetary amount in the currency's minor units.
///
/// Serialized as a decimal string on the wire so large values survive
/// JSON number handling in other stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Amount(u64::from(value))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = s.parse::<u64>().map_err(serde::de::Error::custom)?;
        Ok(Amount(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_value(Amount(2_500)).unwrap();
        assert_eq!(json, serde_json::json!("2500"));

        let back: Amount = serde_json::from_value(json).unwrap();
        assert_eq!(back, Amount(2_500));
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(serde_json::from_value::<Amount>(serde_json::json!("25.00")).is_err());
        assert!(serde_json::from_value::<Amount>(serde_json::json!("abc")).is_err());
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Amount(10).checked_sub(Amount(4)), Some(Amount(6)));
        assert_eq!(Amount(4).checked_sub(Amount(10)), None);
        assert_eq!(Amount(u64::MAX).checked_add(Amount(1)), None);
    }
}
