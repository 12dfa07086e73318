use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive, Zero};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, hash::Hash, str::FromStr};

/// A single column value as carried by a row event. Deliberately mirrors the
/// shape the replication log exposes rather than any destination schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    SmallInt(i16),
    Int32(i32),
    Int(i64),
    Uint(u64),
    Float(f64),
    Decimal(BigDecimal),
    String(String),
    Boolean(bool),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    TimestampNaive(NaiveDateTime),
    Enum(String, String),
    Null,
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            SmallInt(v) => v.hash(state),
            Int32(v) => v.hash(state),
            Decimal(v) => v.to_string().hash(state),
            Int(v) => v.hash(state),
            Uint(v) => v.hash(state),
            Float(v) => {
                // Hash the bits directly so NaN and -0.0 hash consistently.
                v.to_bits().hash(state);
            }
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Json(v) => serde_json::to_string(v).unwrap_or_default().hash(state),
            Bytes(v) => v.hash(state),
            Date(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            TimestampNaive(v) => v.hash(state),
            Enum(name, value) => {
                name.hash(state);
                value.hash(state);
            }
            Null => {}
        }
    }
}

impl Value {
    pub fn as_big_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Decimal(v) => Some(v.clone()),
            Value::SmallInt(v) => Some(BigDecimal::from(*v)),
            Value::Int32(v) => Some(BigDecimal::from(*v)),
            Value::Int(v) => Some(BigDecimal::from(*v)),
            Value::Uint(v) => BigDecimal::from_f64(*v as f64),
            Value::Float(v) => BigDecimal::from_f64(*v),
            Value::String(s) => BigDecimal::from_str(s).ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::SmallInt(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            Value::String(v) => v.parse::<f64>().ok(),
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Deep equality used by the update translator to decide whether a
    /// column actually changed between the before- and after-images.
    pub fn deep_eq(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }

        if let (Some(a), Some(b)) = (self.as_big_decimal(), other.as_big_decimal()) {
            return a == b;
        }

        matches!((self, other), (Value::Null, Value::Null))
    }

    /// A canonical byte representation used when hashing values into an
    /// event id. Chosen to be stable across process restarts.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Value::Null => b"\x00null".to_vec(),
            Value::Boolean(v) => format!("bool:{v}").into_bytes(),
            Value::SmallInt(v) => format!("i16:{v}").into_bytes(),
            Value::Int32(v) => format!("i32:{v}").into_bytes(),
            Value::Int(v) => format!("i64:{v}").into_bytes(),
            Value::Uint(v) => format!("u64:{v}").into_bytes(),
            Value::Float(v) => format!("f64:{v:?}").into_bytes(),
            Value::Decimal(v) => format!("dec:{v}").into_bytes(),
            Value::String(v) => format!("str:{v}").into_bytes(),
            Value::Bytes(v) => {
                let mut out = b"bytes:".to_vec();
                out.extend_from_slice(v);
                out
            }
            Value::Json(v) => format!("json:{v}").into_bytes(),
            Value::Date(v) => format!("date:{v}").into_bytes(),
            Value::Timestamp(v) => format!("ts:{}", v.to_rfc3339()).into_bytes(),
            Value::TimestampNaive(v) => format!("tsn:{v}").into_bytes(),
            Value::Enum(name, v) => format!("enum:{name}:{v}").into_bytes(),
        }
    }

    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_big_decimal(), other.as_big_decimal()) {
            return Some(a.cmp(&b));
        }

        use Value::*;
        match (self, other) {
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Float(a), _) => other.as_f64().and_then(|b| a.partial_cmp(&b)),
            (_, Float(b)) => self.as_f64().and_then(|a| a.partial_cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "0x{}", v.iter().map(|b| format!("{b:02x}")).collect::<String>()),
            Value::Date(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampNaive(v) => write!(f, "{v}"),
            Value::Enum(_, v) => write!(f, "{v}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_eq_treats_numeric_variants_as_equal_by_value() {
        let a = Value::Int(42);
        let b = Value::Decimal(BigDecimal::from(42));
        assert!(a.deep_eq(&b));
    }

    #[test]
    fn deep_eq_distinguishes_different_values() {
        assert!(!Value::String("a".into()).deep_eq(&Value::String("b".into())));
    }

    #[test]
    fn canonical_bytes_differ_by_type_tag() {
        let int_bytes = Value::Int(1).canonical_bytes();
        let str_bytes = Value::String("1".into()).canonical_bytes();
        assert_ne!(int_bytes, str_bytes);
    }
}
