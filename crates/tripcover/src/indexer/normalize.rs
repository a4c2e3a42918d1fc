//! Normalization of addresses and numeric wire values for deterministic
//! queries and tolerant decoding.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Lowercase a 0x-prefixed, 40-hex-digit address. The indexer stores addresses
/// lowercased, so every query embeds the normalized form.
pub fn normalize_address(s: &str) -> Result<String, NormalizeError> {
    let t = s.trim();
    let hex_part = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .ok_or_else(|| NormalizeError::InvalidAddress(s.to_string()))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NormalizeError::InvalidAddress(s.to_string()));
    }
    Ok(format!("0x{}", hex_part.to_lowercase()))
}

fn parse_decimal_u128<E: serde::de::Error>(s: &str) -> Result<u128, E> {
    s.trim()
        .parse::<u128>()
        .map_err(|_| E::custom(format!("invalid unsigned integer: {s:?}")))
}

struct UintVisitor;

impl serde::de::Visitor<'_> for UintVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(u128::from(v))
    }

    fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom("negative integer"))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u128, E> {
        parse_decimal_u128(v)
    }
}

/// `u64` fields that the indexer may emit as either number or string.
pub mod uint {
    use super::UintVisitor;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(*v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let wide = d.deserialize_any(UintVisitor)?;
        u64::try_from(wide).map_err(|_| serde::de::Error::custom("integer out of u64 range"))
    }
}

/// `u128` amount fields (wei). Serialized back as decimal strings, matching
/// the indexer's big-integer encoding.
pub mod uint128 {
    use super::UintVisitor;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        d.deserialize_any(UintVisitor)
    }
}

pub mod opt_uint {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_some(v),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrap(#[serde(with = "super::uint")] u64);
        Ok(Option::<Wrap>::deserialize(d)?.map(|w| w.0))
    }
}

pub mod opt_uint128 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<u128>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_some(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u128>, D::Error> {
        #[derive(Deserialize)]
        struct Wrap(#[serde(with = "super::uint128")] u128);
        Ok(Option::<Wrap>::deserialize(d)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn address_lowercased() {
        let a = normalize_address("0x607cCF60493A51c61D86f4616E93014DB9e32b77").unwrap();
        assert_eq!(a, "0x607ccf60493a51c61d86f4616e93014db9e32b77");
    }

    #[test]
    fn address_rejects_garbage() {
        assert!(normalize_address("not-an-address").is_err());
        assert!(normalize_address("0x1234").is_err());
        assert!(normalize_address("0xzz7ccf60493a51c61d86f4616e93014db9e32b77").is_err());
    }

    #[derive(Deserialize)]
    struct Probe {
        #[serde(with = "uint")]
        n: u64,
        #[serde(with = "uint128")]
        amount: u128,
        #[serde(default, with = "opt_uint128")]
        maybe: Option<u128>,
    }

    #[test]
    fn uint_accepts_string_and_number() {
        let a: Probe = serde_json::from_str(r#"{"n":"42","amount":"1000"}"#).unwrap();
        assert_eq!(a.n, 42);
        assert_eq!(a.amount, 1000);
        assert!(a.maybe.is_none());
        let b: Probe = serde_json::from_str(r#"{"n":42,"amount":1000,"maybe":"7"}"#).unwrap();
        assert_eq!(b.n, 42);
        assert_eq!(b.maybe, Some(7));
    }

    #[test]
    fn uint_rejects_negative_and_junk() {
        assert!(serde_json::from_str::<Probe>(r#"{"n":-1,"amount":"1"}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"n":"x","amount":"1"}"#).is_err());
    }
}
