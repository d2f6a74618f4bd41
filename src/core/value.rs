use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// A single payload value: a scalar, a nested payload (to-one projection)
/// or an ordered list (to-many projection).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Payload(Payload),
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Payload(_) => "PAYLOAD",
            Self::List(_) => "LIST",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Emptiness as the projection engine defines it: null, the empty
    /// string, a zero-member list or a payload with no entries. Falsy
    /// scalars (`0`, `false`) are NOT empty; for lists only cardinality
    /// counts, never the members' contents.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Payload(p) => p.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_payload(&self) -> Option<&Payload> {
        match self {
            Self::Payload(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Converts to a `serde_json::Value`. With `numeric_check` enabled,
    /// numeric-looking strings are coerced to JSON numbers; the write path
    /// and the checksum path must both use the coerced form or sync
    /// detection false-positives on every check.
    pub fn to_json_value(&self, numeric_check: bool) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => {
                if numeric_check {
                    if let Ok(i) = s.parse::<i64>() {
                        return serde_json::Value::from(i);
                    }
                    if let Ok(f) = s.parse::<f64>() {
                        if f.is_finite() && !s.is_empty() {
                            return serde_json::Number::from_f64(f)
                                .map(serde_json::Value::Number)
                                .unwrap_or_else(|| serde_json::Value::String(s.clone()));
                        }
                    }
                }
                serde_json::Value::String(s.clone())
            }
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Payload(p) => p.to_json_value(numeric_check),
            Self::List(items) => serde_json::Value::Array(
                items.iter().map(|v| v.to_json_value(numeric_check)).collect(),
            ),
        }
    }

    /// Total conversion from a parsed JSON document.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Self::List(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut payload = Payload::new();
                for (key, value) in map {
                    payload.insert(key.clone(), Self::from_json(value));
                }
                Self::Payload(payload)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, ""),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Payload(p) => write!(f, "{}", p.to_json_value(false)),
            Self::List(_) => write!(f, "{}", self.to_json_value(false)),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Payload> for Value {
    fn from(p: Payload) -> Self {
        Self::Payload(p)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// An ordered key/value document: the unit the projection engine produces
/// and the payload stores persist. Pure value type, no identity.
///
/// Insertion order is preserved; inserting an existing key replaces the
/// value but keeps the original position. Entry order only matters for
/// human-readable diffing, checksums canonicalize it away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: Vec<(String, Value)>,
}

impl Payload {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a `serde_json::Value` object. Keys come out sorted
    /// (`serde_json`'s map is ordered by key), which is exactly the
    /// canonical form the checksum needs.
    pub fn to_json_value(&self, numeric_check: bool) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.entries {
            map.insert(key.clone(), value.to_json_value(numeric_check));
        }
        serde_json::Value::Object(map)
    }

    /// Rebuilds a payload from a parsed JSON document in document order.
    /// Returns `None` when the document is not an object.
    pub fn from_json_value(json: &serde_json::Value) -> Option<Self> {
        match Value::from_json(json) {
            Value::Payload(p) => Some(p),
            _ => None,
        }
    }

    /// Content checksum: SHA-256 over the canonical JSON rendering
    /// (sorted keys, numeric coercion). Equal checksums mean semantically
    /// equal payloads regardless of entry order.
    pub fn checksum(&self) -> String {
        use std::fmt::Write;

        let canonical = self.to_json_value(true).to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }
}

impl FromIterator<(String, Value)> for Payload {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut payload = Self::new();
        for (key, value) in iter {
            payload.insert(key, value);
        }
        payload
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Payload(p) => p.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Boolean(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> std::result::Result<Value, E> {
        Ok(Value::Integer(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> std::result::Result<Value, E> {
        Ok(i64::try_from(u)
            .map(Value::Integer)
            .unwrap_or(Value::Float(u as f64)))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::Text(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::Text(s))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut payload = Payload::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            payload.insert(key, value);
        }
        Ok(Value::Payload(payload))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Payload(payload) => Ok(payload),
            other => Err(de::Error::custom(format!(
                "expected a JSON object, found {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_position_on_overwrite() {
        let mut payload = Payload::new();
        payload.insert("a", 1i64);
        payload.insert("b", 2i64);
        payload.insert("a", 3i64);

        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(payload.get("a"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_checksum_is_order_insensitive() {
        let mut first = Payload::new();
        first.insert("title", "Hello");
        first.insert("id", 7i64);

        let mut second = Payload::new();
        second.insert("id", 7i64);
        second.insert("title", "Hello");

        assert_eq!(first.checksum(), second.checksum());
    }

    #[test]
    fn test_checksum_reflects_content_changes() {
        let mut first = Payload::new();
        first.insert("title", "Hello");

        let mut second = Payload::new();
        second.insert("title", "World");

        assert_ne!(first.checksum(), second.checksum());
    }

    #[test]
    fn test_numeric_strings_checksum_like_numbers() {
        let mut as_text = Payload::new();
        as_text.insert("count", "42");

        let mut as_number = Payload::new();
        as_number.insert("count", 42i64);

        assert_eq!(as_text.checksum(), as_number.checksum());
    }

    #[test]
    fn test_serde_round_trip_preserves_entry_order() {
        let mut payload = Payload::new();
        payload.insert("zebra", 1i64);
        payload.insert("apple", Value::Null);
        payload.insert("nested", {
            let mut inner = Payload::new();
            inner.insert("x", true);
            inner
        });

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.starts_with("{\"zebra\""));

        let back: Payload = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = back.keys().collect();
        assert_eq!(keys, vec!["zebra", "apple", "nested"]);
        assert_eq!(back, payload);
    }

    #[test]
    fn test_emptiness_rules() {
        assert!(Value::Null.is_empty());
        assert!(Value::Text(String::new()).is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::Integer(0).is_empty());
        assert!(!Value::Boolean(false).is_empty());
        assert!(!Value::List(vec![Value::Null]).is_empty());
    }
}
