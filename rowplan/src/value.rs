//! The stage-output value model.
//!
//! Stage backends produce arbitrarily nested results whose internal
//! schema the core never interprets. [`StageValue`] closes that domain
//! over a small set of kinds so that normalization is a total,
//! statically checkable function rather than an open dynamic-type
//! walk.

use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use std::fmt;

/// A value produced by a stage backend.
///
/// The `Mapping` variant preserves insertion order, so exported
/// documents keep the key order the backend produced. `NumericArray`
/// models array-like numeric buffers (raster bands, height profiles);
/// `Geometry` wraps a GeoJSON-shaped object handle. Both are flattened
/// to plain sequences/mappings by [`crate::normalize::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum StageValue {
    /// Absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer scalar.
    Int(i64),
    /// A floating-point scalar.
    Number(f64),
    /// A text value.
    Text(String),
    /// An ordered sequence of values.
    Sequence(Vec<StageValue>),
    /// An insertion-ordered mapping from string keys to values.
    Mapping(Vec<(String, StageValue)>),
    /// An array-like buffer of plain numbers.
    NumericArray(Vec<f64>),
    /// A geometry handle carrying its GeoJSON representation.
    Geometry(serde_json::Value),
}

impl StageValue {
    /// Builds a mapping from an ordered list of entries.
    #[must_use]
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, StageValue)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a sequence from an ordered list of values.
    #[must_use]
    pub fn sequence<I: IntoIterator<Item = StageValue>>(items: I) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    /// Builds a geometry handle from a GeoJSON value.
    #[must_use]
    pub const fn geometry(geojson: serde_json::Value) -> Self {
        Self::Geometry(geojson)
    }

    /// Looks up a key in a mapping; `None` for other kinds.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StageValue> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the kind name, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::NumericArray(_) => "numeric-array",
            Self::Geometry(_) => "geometry",
        }
    }

    /// Converts the value to its plain JSON representation.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Number(n) => serde_json::Value::from(*n),
            Self::Text(t) => serde_json::Value::String(t.clone()),
            Self::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(StageValue::to_json).collect())
            }
            Self::Mapping(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::NumericArray(xs) => {
                serde_json::Value::Array(xs.iter().map(|x| serde_json::Value::from(*x)).collect())
            }
            Self::Geometry(g) => g.clone(),
        }
    }

    /// Converts a plain JSON value into a stage value.
    ///
    /// Numbers that fit `i64` become `Int`; objects become
    /// insertion-ordered mappings. Buffer and geometry kinds cannot be
    /// recovered from plain JSON and come back as `Sequence`/`Mapping`.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || Self::Number(n.as_f64().unwrap_or(f64::NAN)),
                Self::Int,
            ),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(entries) => Self::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for StageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(t) => serializer.serialize_str(t),
            Self::Sequence(items) => serializer.collect_seq(items),
            Self::Mapping(entries) => serializer.collect_map(entries.iter().map(|(k, v)| (k, v))),
            Self::NumericArray(xs) => serializer.collect_seq(xs),
            Self::Geometry(g) => g.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for StageValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl fmt::Display for StageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for StageValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StageValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for StageValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for StageValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StageValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<f64>> for StageValue {
    fn from(value: Vec<f64>) -> Self {
        Self::NumericArray(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn mapping_preserves_insertion_order() {
        let value = StageValue::mapping([
            ("zulu", StageValue::Int(1)),
            ("alpha", StageValue::Int(2)),
            ("mike", StageValue::Int(3)),
        ]);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"zulu":1,"alpha":2,"mike":3}"#);
    }

    #[test]
    fn mapping_get() {
        let value = StageValue::mapping([("score", StageValue::Number(0.7))]);
        assert_eq!(value.get("score"), Some(&StageValue::Number(0.7)));
        assert_eq!(value.get("missing"), None);
        assert_eq!(StageValue::Int(1).get("score"), None);
    }

    #[test]
    fn numeric_array_serializes_as_plain_sequence() {
        let value = StageValue::NumericArray(vec![1.0, 2.5, 3.0]);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!([1.0, 2.5, 3.0]));
    }

    #[test]
    fn geometry_serializes_as_its_geojson() {
        let geom = json!({"type": "Point", "coordinates": [-122.4, 37.7]});
        let value = StageValue::geometry(geom.clone());
        assert_eq!(serde_json::to_value(&value).unwrap(), geom);
    }

    #[test]
    fn from_json_round_trip() {
        let original = json!({
            "name": "segment",
            "score": 0.75,
            "count": 3,
            "flags": [true, false],
            "nested": {"ok": null}
        });

        let value = StageValue::from_json(original.clone());
        assert_eq!(value.to_json(), original);
        assert_eq!(value.get("count"), Some(&StageValue::Int(3)));
    }

    #[test]
    fn deserialize_reads_plain_json() {
        let value: StageValue = serde_json::from_str(r#"{"a": [1, 2.5]}"#).unwrap();
        assert_eq!(
            value,
            StageValue::mapping([(
                "a",
                StageValue::sequence([StageValue::Int(1), StageValue::Number(2.5)])
            )])
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(StageValue::Null.kind(), "null");
        assert_eq!(StageValue::NumericArray(vec![]).kind(), "numeric-array");
        assert_eq!(StageValue::geometry(json!({})).kind(), "geometry");
    }
}
