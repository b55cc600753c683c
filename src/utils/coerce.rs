//! Lenient numeric coercion for untrusted bill input

use bigdecimal::BigDecimal;
use serde::de::{self, Deserializer, Visitor};
use std::fmt;
use tracing::warn;

/// Clamp a negative amount to zero
pub fn non_negative(value: &BigDecimal) -> BigDecimal {
    if *value < BigDecimal::from(0) {
        warn!(%value, "Clamping negative amount to zero");
        BigDecimal::from(0)
    } else {
        value.clone()
    }
}

/// Deserialize a decimal from sloppy input
///
/// Accepts numbers, numeric strings, and null. Anything unparseable
/// becomes zero instead of failing the whole bill, matching how hand-keyed
/// POS data behaves in practice.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientDecimal)
}

struct LenientDecimal;

impl<'de> Visitor<'de> for LenientDecimal {
    type Value = BigDecimal;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a number, a numeric string, or null")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BigDecimal::from(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BigDecimal::from(value))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BigDecimal::try_from(value).unwrap_or_else(|_| {
            warn!(%value, "Coercing non-finite number to zero");
            BigDecimal::from(0)
        }))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(value.trim().parse().unwrap_or_else(|_| {
            warn!(value, "Coercing unparseable amount to zero");
            BigDecimal::from(0)
        }))
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        warn!(value, "Coercing boolean amount to zero");
        Ok(BigDecimal::from(0))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BigDecimal::from(0))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BigDecimal::from(0))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientDecimal)
    }
}
