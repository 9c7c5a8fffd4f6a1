//! The decoded scalar and compound value model.
//!
//! `INT`/`NEG` (fits in 31 bits) and `LONGINT`/`LONGNEG` (arbitrary
//! precision) both decode to the same [`Value::Integer`] — the
//! integer/long unification the wire format's laws explicitly permit.
//! `Value::List` is the one built-in compound type; anything richer is a
//! caller-registered [`crate::slicer::Slicer`]/[`crate::unslicer::Unslicer`]
//! pair, not part of this enum.

use num_bigint::BigInt;

/// A fully-decoded Banana value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An arbitrary-precision signed integer, whether it arrived as a small
    /// `INT`/`NEG` token or a `LONGINT`/`LONGNEG` token.
    Integer(BigInt),
    /// An IEEE-754 double.
    Float(f64),
    /// An opaque byte string (not necessarily valid UTF-8).
    Bytes(Vec<u8>),
    /// An ordered sequence of values, the one built-in compound type.
    List(Vec<Value>),
}

impl Value {
    /// Convenience constructor from any type convertible to `BigInt`.
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Value::Integer(value.into())
    }

    /// Convenience constructor for a UTF-8 string value.
    pub fn string(value: impl Into<String>) -> Self {
        Value::Bytes(value.into().into_bytes())
    }

    /// Returns this value's bytes if it is [`Value::Bytes`] and valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Returns the elements of this value if it is [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(BigInt::from(value))
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Bytes(value.into_bytes())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_long_integer_are_the_same_variant() {
        let small = Value::integer(42i64);
        let big = Value::Integer(BigInt::parse_bytes(b"123456789012345678901234567890", 10).unwrap());
        assert!(matches!(small, Value::Integer(_)));
        assert!(matches!(big, Value::Integer(_)));
    }

    #[test]
    fn as_str_round_trips_utf8_bytes() {
        let v = Value::string("hello");
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn as_str_rejects_non_utf8_bytes() {
        let v = Value::Bytes(vec![0xff, 0xfe]);
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn as_list_exposes_elements() {
        let v = Value::List(vec![Value::from(1i64), Value::from(2i64)]);
        assert_eq!(v.as_list().unwrap().len(), 2);
    }
}
